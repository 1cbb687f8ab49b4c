use raytha_editor_core::{Editor, Point, Selection};
use serde_json::json;

fn editor_with(html: &str) -> Editor {
    let mut editor = Editor::with_wysiwyg_extensions();
    editor
        .run_command("document.set_content", Some(json!({ "html": html })))
        .unwrap();
    editor
}

fn select(editor: &mut Editor, path: Vec<usize>, from: usize, to: usize) {
    editor.set_selection(Selection::new(
        Point::new(path.clone(), from),
        Point::new(path, to),
    ));
}

#[test]
fn bold_at_caret_applies_to_typed_text() {
    let mut editor = Editor::with_wysiwyg_extensions();

    editor.run_command("marks.toggle_bold", None).unwrap();
    assert!(editor.is_active("bold", None));

    editor
        .run_command("text.insert", Some(json!({ "text": "hi" })))
        .unwrap();

    assert_eq!(editor.get_html(), "<p><strong>hi</strong></p>");
    assert!(editor.is_active("bold", None));
    assert_eq!(editor.word_count(), 1);
}

#[test]
fn toggling_bold_twice_restores_plain_text() {
    let mut editor = editor_with("<p>hello world</p>");
    select(&mut editor, vec![0, 0], 0, 5);

    editor.run_command("marks.toggle_bold", None).unwrap();
    assert_eq!(editor.get_html(), "<p><strong>hello</strong> world</p>");
    assert!(editor.is_active("bold", None));

    editor.run_command("marks.toggle_bold", None).unwrap();
    assert_eq!(editor.get_html(), "<p>hello world</p>");
}

#[test]
fn clear_formatting_removes_every_mark() {
    let mut editor = editor_with("<p><strong><em>ab</em></strong> <u>c</u></p>");
    editor.run_command("selection.select_all", None).unwrap();

    editor.run_command("marks.unset_all", None).unwrap();

    assert_eq!(editor.get_html(), "<p>ab c</p>");
}

#[test]
fn superscript_replaces_subscript() {
    let mut editor = editor_with("<p><sub>x</sub></p>");
    editor.run_command("selection.select_all", None).unwrap();

    editor.run_command("marks.toggle_superscript", None).unwrap();

    assert_eq!(editor.get_html(), "<p><sup>x</sup></p>");
    assert!(!editor.is_active("subscript", None));
}

#[test]
fn text_style_and_highlight_serialize_as_inline_styles() {
    let mut editor = editor_with("<p>ab</p>");
    editor.run_command("selection.select_all", None).unwrap();

    editor
        .run_command("marks.set_font_size", Some(json!({ "font_size": "18px" })))
        .unwrap();
    assert_eq!(
        editor.get_html(),
        "<p><span style=\"font-size: 18px\">ab</span></p>"
    );
    assert_eq!(
        editor.get_attributes("textStyle")["fontSize"],
        json!("18px")
    );

    editor.run_command("marks.unset_font_size", None).unwrap();
    editor
        .run_command("marks.set_highlight", Some(json!({ "color": "#fbeeb8" })))
        .unwrap();
    assert_eq!(
        editor.get_html(),
        "<p><mark data-color=\"#fbeeb8\" style=\"background-color: #fbeeb8; color: inherit\">ab</mark></p>"
    );
}

#[test]
fn link_insert_marks_selection_and_unset_clears_whole_link() {
    let mut editor = editor_with("<p>see docs</p>");
    select(&mut editor, vec![0, 0], 4, 8);

    editor
        .run_command(
            "link.insert",
            Some(json!({ "href": "https://raytha.com", "text": "" })),
        )
        .unwrap();
    assert_eq!(
        editor.get_html(),
        "<p>see <a href=\"https://raytha.com\" rel=\"noopener noreferrer nofollow\">docs</a></p>"
    );

    editor.set_selection(Selection::collapsed(Point::new(vec![0, 1], 2)));
    editor.run_command("link.unset", None).unwrap();

    assert_eq!(editor.get_html(), "<p>see docs</p>");
}

#[test]
fn link_insert_at_caret_types_the_link_text() {
    let mut editor = Editor::with_wysiwyg_extensions();

    editor
        .run_command(
            "link.insert",
            Some(json!({ "href": "https://a.example", "text": "A", "target": "_blank" })),
        )
        .unwrap();

    assert_eq!(
        editor.get_html(),
        "<p><a href=\"https://a.example\" target=\"_blank\" rel=\"noopener noreferrer nofollow\">A</a></p>"
    );
}
