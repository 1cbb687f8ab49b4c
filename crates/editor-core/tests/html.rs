use raytha_editor_core::{CommandError, Editor, HtmlError, Point, Selection, parse_html, serialize_document};
use serde_json::json;

fn editor_with(html: &str) -> Editor {
    let mut editor = Editor::with_wysiwyg_extensions();
    editor
        .run_command("document.set_content", Some(json!({ "html": html })))
        .unwrap();
    editor
}

fn assert_round_trip(html: &str) {
    let editor = editor_with(html);
    assert_eq!(editor.get_html(), html);
}

#[test]
fn inline_media_and_embeds_round_trip() {
    assert_round_trip("<p>see <img src=\"a.png\" alt=\"diagram\"> here</p>");
    assert_round_trip(
        "<div data-youtube-video=\"\"><iframe src=\"https://www.youtube.com/embed/dQw4w9WgXcQ\" width=\"320\" height=\"240\" allowfullscreen=\"true\"></iframe></div>",
    );
}

#[test]
fn tables_keep_spans_and_header_cells() {
    assert_round_trip(
        "<table><tbody><tr><th colspan=\"2\"><p>h</p></th></tr><tr><td><p>b</p></td><td><p>c</p></td></tr></tbody></table>",
    );
}

#[test]
fn nested_lists_and_block_styles_round_trip() {
    assert_round_trip("<ol><li><p>a</p><ul><li><p>b</p></li></ul></li><li><p>c</p></li></ol>");
    assert_round_trip("<h3 style=\"text-align: right;\">t</h3><blockquote><p>q</p></blockquote><hr>");
    assert_round_trip("<pre><code>fn main() {\n    x\n}</code></pre>");
}

#[test]
fn loose_text_is_wrapped_in_paragraphs() {
    let doc = parse_html("hello <b>world</b>").unwrap();
    assert_eq!(serialize_document(&doc), "<p>hello <strong>world</strong></p>");
}

#[test]
fn malformed_content_is_rejected_without_touching_the_document() {
    let mut editor = editor_with("<p>kept</p>");

    let err = editor
        .run_command("document.set_content", Some(json!({ "html": "<p>x</p><div" })))
        .unwrap_err();

    assert!(matches!(
        err,
        CommandError::InvalidContent(HtmlError::UnterminatedTag { .. })
    ));
    assert_eq!(editor.get_html(), "<p>kept</p>");
}

#[test]
fn pasted_inline_fragment_lands_at_the_caret() {
    let mut editor = editor_with("<p>ab</p>");
    editor.set_selection(Selection::collapsed(Point::new(vec![0, 0], 1)));

    editor
        .run_command("content.insert_html", Some(json!({ "html": "<strong>x</strong>" })))
        .unwrap();

    assert_eq!(editor.get_html(), "<p>a<strong>x</strong>b</p>");
}

#[test]
fn clear_leaves_one_empty_paragraph() {
    let mut editor = editor_with("<h1>a</h1><p>b</p>");

    editor.run_command("document.clear", None).unwrap();

    assert_eq!(editor.get_html(), "<p></p>");
    assert_eq!(editor.get_text(), "");
    assert_eq!(editor.character_count(), 0);
}
