use std::cell::RefCell;
use std::rc::Rc;

use raytha_editor_core::{Editor, EventKind, Point, Selection};
use raytha_wysiwyg::{
    ClipboardItem, CommandError, EditorCommand, EditorCommands, EditorModel, ManualClock,
    MemoryClipboard, WysiwygConfig,
};

fn model_with(html: &str) -> EditorModel {
    let model = EditorModel::with_clock(&WysiwygConfig::default(), Rc::new(ManualClock::new()));
    assert!(model.commands().set_content(html).unwrap());
    model
}

fn select(model: &mut EditorModel, path: Vec<usize>, from: usize, to: usize) {
    model.set_selection(Selection::new(Point::new(path.clone(), from), Point::new(path, to)));
}

fn caret(model: &mut EditorModel, path: Vec<usize>, offset: usize) {
    model.set_selection(Selection::collapsed(Point::new(path, offset)));
}

#[test]
fn mark_commands_toggle_the_selection() {
    let mut model = model_with("<p>hello world</p>");
    select(&mut model, vec![0, 0], 0, 5);

    assert!(model.run(|c| c.toggle_bold()));
    assert_eq!(model.get_html(), "<p><strong>hello</strong> world</p>");
    assert!(model.state_manager().get_state().marks.bold);

    assert!(model.run(|c| c.toggle_bold()));
    assert_eq!(model.get_html(), "<p>hello world</p>");
}

#[test]
fn heading_clears_font_size() {
    let mut model = model_with("<p><span style=\"font-size: 24px\">Big</span></p>");

    assert!(model.run(|c| c.insert_heading(2)));

    assert_eq!(model.get_html(), "<h2>Big</h2>");
}

#[test]
fn text_align_and_line_height_patch_the_block() {
    let mut model = model_with("<p>a</p>");

    assert!(model.run(|c| c.set_text_align("center")));
    assert_eq!(model.get_html(), "<p style=\"text-align: center;\">a</p>");

    assert!(model.run(|c| c.set_text_align("left")));
    assert!(model.run(|c| c.set_line_height("2")));
    assert_eq!(model.get_html(), "<p style=\"line-height: 2;\">a</p>");
    assert!(!model.run(|c| c.set_line_height("3")));
}

#[test]
fn invalid_content_is_an_error_and_leaves_the_document() {
    let model = model_with("<p>kept</p>");

    let err = model.commands().set_content("<p>x</p><div").unwrap_err();

    assert!(matches!(err, CommandError::InvalidContent(_)));
    assert_eq!(model.get_html(), "<p>kept</p>");
}

#[test]
fn new_document_leaves_one_empty_paragraph() {
    let mut model = model_with("<h1>a</h1><p>b</p>");

    assert_eq!(model.execute_named("newDocument"), Ok(true));

    assert_eq!(model.get_html(), "<p></p>");
    assert_eq!(model.state_manager().get_state().words, "0 words");
}

#[test]
fn unsupported_and_unknown_commands_are_errors() {
    let mut model = model_with("<p>a</p>");

    for (name, command) in [
        ("pasteAsText", EditorCommand::PasteAsText),
        ("toggleTextBlocks", EditorCommand::ToggleTextBlocks),
        ("toggleSpellcheck", EditorCommand::ToggleSpellcheck),
        ("insertPageBreak", EditorCommand::InsertPageBreak),
    ] {
        assert!(!EditorCommands::is_supported(command));
        assert_eq!(model.execute_named(name), Err(CommandError::NotImplemented(name)));
    }
    assert_eq!(
        model.execute_named("launchRockets"),
        Err(CommandError::UnknownCommand("launchRockets".into()))
    );
    assert_eq!(model.get_html(), "<p>a</p>");
}

#[test]
fn rejected_commands_report_false() {
    let mut model = model_with("<p>a</p>");

    assert_eq!(model.execute_named("deleteRow"), Ok(false));
    assert_eq!(model.execute_named("redo"), Ok(false));
}

#[test]
fn youtube_insert_rejects_other_links() {
    let mut model = model_with("<p></p>");

    assert!(!model.run(|c| c.insert_youtube_video("https://example.com/watch", 640, 480)));

    assert_eq!(model.get_html(), "<p></p>");
}

#[test]
fn search_navigation_returns_the_current_index() {
    let mut model = model_with("<p>foo bar Foo</p><p>food</p>");
    assert!(model.run(|c| c.set_search_term("foo")));

    assert_eq!(model.run(|c| c.next_search_result()), 1);
    assert_eq!(model.run(|c| c.previous_search_result()), 0);
    assert_eq!(model.execute_named("nextSearchResult"), Ok(true));
    assert_eq!(model.state_manager().get_state().search_result.index, 2);
    assert_eq!(model.state_manager().get_state().search_result.total, 3);
}

#[test]
fn search_navigation_without_matches_is_not_applied() {
    let mut model = model_with("<p>foo</p>");
    assert!(model.run(|c| c.set_search_term("zzz")));

    assert_eq!(model.execute_named("nextSearchResult"), Ok(false));
    assert_eq!(model.execute_named("previousSearchResult"), Ok(false));
    assert_eq!(model.state_manager().get_state().search_result.total, 0);
}

#[test]
fn copy_needs_a_selection() {
    let mut model = model_with("<p>hello</p>");
    let clipboard = Rc::new(RefCell::new(MemoryClipboard::new()));
    model.commands().set_clipboard(Rc::clone(&clipboard));

    caret(&mut model, vec![0, 0], 2);
    assert!(!model.run(|c| c.copy()));
    assert!(clipboard.borrow().contents().is_none());

    select(&mut model, vec![0, 0], 0, 5);
    assert!(model.run(|c| c.copy()));
    assert_eq!(
        clipboard.borrow().contents(),
        Some(&ClipboardItem::new("hello", "<p>hello</p>"))
    );
    assert_eq!(model.get_html(), "<p>hello</p>");
}

#[test]
fn cut_removes_the_selection_after_writing() {
    let mut model = model_with("<p>hello world</p>");
    let clipboard = Rc::new(RefCell::new(MemoryClipboard::new()));
    model.commands().set_clipboard(Rc::clone(&clipboard));
    select(&mut model, vec![0, 0], 0, 5);

    assert!(model.run(|c| c.cut()));

    assert_eq!(clipboard.borrow().contents().map(|item| item.text.as_str()), Some("hello"));
    assert!(!model.get_html().contains("hello"));
    assert!(model.get_html().contains("world"));
}

#[test]
fn cut_without_clipboard_keeps_the_text() {
    let mut model = model_with("<p>hello world</p>");
    select(&mut model, vec![0, 0], 0, 5);

    assert!(!model.run(|c| c.cut()));

    assert_eq!(model.get_html(), "<p>hello world</p>");
}

#[test]
fn paste_prefers_html_over_text() {
    let mut model = model_with("<p>ab</p>");
    model
        .commands()
        .set_clipboard(MemoryClipboard::with_item(ClipboardItem::new("x", "<strong>x</strong>")));
    caret(&mut model, vec![0, 0], 1);

    assert_eq!(model.execute_named("paste"), Ok(true));

    assert_eq!(model.get_html(), "<p>a<strong>x</strong>b</p>");
}

#[test]
fn paste_falls_back_to_plain_text() {
    let mut model = model_with("<p>ab</p>");
    model
        .commands()
        .set_clipboard(MemoryClipboard::with_item(ClipboardItem::text("x")));

    assert!(model.run(|c| c.paste()));

    assert_eq!(model.get_html(), "<p>xab</p>");
}

#[test]
fn paste_from_an_empty_clipboard_does_nothing() {
    let mut model = model_with("<p>ab</p>");
    assert!(!model.run(|c| c.paste()));

    model.commands().set_clipboard(MemoryClipboard::new());
    assert!(!model.run(|c| c.paste()));
    assert_eq!(model.get_html(), "<p>ab</p>");
}

#[test]
fn inserted_text_helpers_go_through_text_insert() {
    let mut model = model_with("<p></p>");

    assert!(model.run(|c| c.insert_special_character("©")));
    assert!(model.run(|c| c.insert_nonbreaking_space()));
    assert!(model.run(|c| c.insert_date_time("2026-10-14")));

    assert_eq!(model.editor().get_text(), "©\u{a0}2026-10-14");
}

#[test]
fn inserted_text_lands_at_the_caret_as_one_undoable_step() {
    let engine = Rc::new(RefCell::new(Editor::with_wysiwyg_extensions()));
    let commands = EditorCommands::new(Rc::clone(&engine));
    assert!(commands.set_content("<p>hello world</p>").unwrap());
    engine
        .borrow_mut()
        .set_selection(Selection::collapsed(Point::new(vec![0, 0], 5)));

    let transactions = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&transactions);
    engine
        .borrow_mut()
        .on(EventKind::Transaction, Box::new(move |_| *counter.borrow_mut() += 1));

    assert!(commands.insert_date_time(" 2026-10-14 09:30"));
    assert_eq!(*transactions.borrow(), 1);
    assert_eq!(engine.borrow().get_html(), "<p>hello 2026-10-14 09:30 world</p>");

    assert!(commands.insert_special_character("©"));
    assert_eq!(*transactions.borrow(), 2);
    assert_eq!(engine.borrow().get_html(), "<p>hello 2026-10-14 09:30© world</p>");

    assert!(commands.undo());
    assert_eq!(engine.borrow().get_html(), "<p>hello 2026-10-14 09:30 world</p>");
    assert!(commands.undo());
    assert_eq!(engine.borrow().get_html(), "<p>hello world</p>");
}
