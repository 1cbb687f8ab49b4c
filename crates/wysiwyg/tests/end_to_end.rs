use std::rc::Rc;

use raytha_editor_core::{Point, Selection};
use raytha_wysiwyg::view::UpdateableComponent;
use raytha_wysiwyg::{EditorController, HiddenField, ManualClock, MediaUploadConfig, Notice, WysiwygConfig};

fn connect(initial: &str) -> (EditorController, Rc<ManualClock>) {
    let clock = Rc::new(ManualClock::new());
    let controller = EditorController::connect_with_clock(
        &WysiwygConfig::default(),
        HiddenField::new("content", initial),
        MediaUploadConfig::default(),
        clock.clone(),
    );
    (controller, clock)
}

fn settle(controller: &mut EditorController, clock: &ManualClock) {
    for _ in 0..2 {
        clock.advance_ms(600);
        controller.tick();
    }
}

fn text_of(controller: &EditorController, id: &str) -> String {
    let view = controller.view();
    let dom = view.dom();
    dom.text(dom.get_by_id(id).unwrap()).to_string()
}

fn has_class(controller: &EditorController, id: &str, class: &str) -> bool {
    let view = controller.view();
    let dom = view.dom();
    dom.has_class(dom.get_by_id(id).unwrap(), class)
}

#[test]
fn typing_bold_text_reaches_view_and_form_field() {
    let (mut controller, clock) = connect("");

    assert!(controller.execute_command("toggleBold"));
    assert!(controller.model().state_manager().get_state().marks.bold);
    assert!(has_class(&controller, "boldButton", "active"));

    assert!(controller.model_mut().type_text("hi"));
    settle(&mut controller, &clock);

    let state = controller.model().state_manager().get_state();
    assert!(state.marks.bold);
    assert_eq!(state.words, "1 word");
    assert_eq!(text_of(&controller, "wordsCount"), "1 word");
    assert_eq!(controller.field().value(), "<p><strong>hi</strong></p>");
    assert_eq!(controller.model().get_html(), "<p><strong>hi</strong></p>");
}

#[test]
fn keystrokes_in_one_burst_write_the_final_html() {
    let (mut controller, clock) = connect("");

    for ch in ["a", "b", "c", " ", "d"] {
        assert!(controller.model_mut().type_text(ch));
        clock.advance_ms(50);
        controller.tick();
    }
    settle(&mut controller, &clock);

    assert_eq!(controller.field().value(), "<p>abc d</p>");
    assert!(controller.field().writes() <= 2);
    assert_eq!(text_of(&controller, "wordsCount"), "2 words");
    assert_eq!(controller.next_deadline(), None);
}

#[test]
fn initial_field_value_is_loaded_without_writing_back() {
    let (controller, _clock) = connect("<h2>Title</h2><p>body text here</p>");

    assert_eq!(controller.model().get_html(), "<h2>Title</h2><p>body text here</p>");
    assert_eq!(controller.field().writes(), 0);
    assert_eq!(text_of(&controller, "wordsCount"), "4 words");
    assert_eq!(text_of(&controller, "formatSpan"), "Heading 2");
}

#[test]
fn alignment_from_the_toolbar_updates_immediately() {
    let (mut controller, _clock) = connect("<p>a</p>");

    assert!(controller.set_text_align("right"));

    assert_eq!(controller.model().state_manager().get_state().text_align, "right");
    assert!(has_class(&controller, "textAlignButton", "icon-text-align-right"));
    assert!(!has_class(&controller, "textAlignButton", "icon-text-align-left"));
}

#[test]
fn source_code_dialog_round_trips_and_rejects_malformed_markup() {
    let (mut controller, _clock) = connect("<p>kept</p>");
    assert_eq!(controller.source_code(), "<p>kept</p>");

    let notice = controller.update_source_code("<p>x</p><div").unwrap_err();
    assert_eq!(notice.title, "Invalid content");
    assert_eq!(controller.source_code(), "<p>kept</p>");

    controller.update_source_code("<p>one two</p>").unwrap();
    assert_eq!(controller.source_code(), "<p>one two</p>");
    assert_eq!(text_of(&controller, "wordsCount"), "2 words");
}

#[test]
fn edited_source_code_reaches_the_form_field_at_once() {
    let (mut controller, clock) = connect("<p>kept</p>");
    assert_eq!(controller.model().state_manager().last_content(), "<p>kept</p>");

    controller.update_source_code("<p>replaced</p>").unwrap();

    assert_eq!(controller.field().value(), "<p>replaced</p>");
    assert_eq!(controller.field().writes(), 1);
    settle(&mut controller, &clock);
    assert_eq!(controller.field().writes(), 1);
    assert_eq!(controller.source_code(), "<p>replaced</p>");
}

#[test]
fn unchanged_initial_content_is_not_written_back_after_a_selection_move() {
    let (mut controller, clock) = connect("<p>kept</p>");

    controller
        .model_mut()
        .set_selection(Selection::collapsed(Point::new(vec![0, 0], 2)));
    assert!(controller.update_source_code("<p>kept</p>").is_ok());
    settle(&mut controller, &clock);

    assert_eq!(controller.field().writes(), 0);
    assert_eq!(controller.field().value(), "<p>kept</p>");
}

#[test]
fn dialogs_validate_their_input() {
    let (mut controller, _clock) = connect("<p></p>");

    assert_eq!(
        controller.insert_video("https://example.com/clip", 640, 480),
        Err(Notice::new("Invalid URL", "Please enter a valid YouTube URL"))
    );
    assert!(!controller.insert_link("https://raytha.com", "", "", true));
    assert!(!controller.insert_link("", "Raytha", "", true));
    assert!(controller.insert_link("https://raytha.com", "Raytha", "", true));
    assert!(controller.source_code().contains("href=\"https://raytha.com\""));
    assert!(controller.source_code().contains("Raytha"));
}

#[test]
fn table_menu_follows_the_selection() {
    let (mut controller, _clock) = connect("<p></p>");
    assert!(!controller.model().table_menu_visible());

    assert!(controller.insert_table(2, 2));

    assert!(controller.model().table_menu_visible());
}

#[test]
fn search_dialog_reports_matches() {
    let (mut controller, _clock) = connect("<p>foo bar Foo</p>");
    assert!(controller.toggle_search_and_replace_dialog());

    assert!(controller.set_search_term("foo"));

    let view = controller.view();
    assert_eq!(view.search_dialog().results_label(view.dom()), "1 of 2");
}

#[test]
fn disconnect_stops_all_writes() {
    let (mut controller, clock) = connect("");
    assert!(controller.model_mut().type_text("a"));
    controller.model_mut().type_text("b");

    controller.disconnect();
    controller.disconnect();
    let writes = controller.field().writes();
    settle(&mut controller, &clock);

    assert_eq!(controller.field().writes(), writes);
    assert!(controller.model().is_destroyed());
    assert!(controller.view().is_destroyed());
    assert!(!controller.model_mut().type_text("c"));
    assert!(!controller.view().dom().is_attached(controller.view().toolbar().root()));
}
