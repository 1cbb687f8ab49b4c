use raytha_editor_core::Editor;
use serde_json::{Value, json};

fn editor_with(html: &str) -> Editor {
    let mut editor = Editor::with_wysiwyg_extensions();
    editor
        .run_command("document.set_content", Some(json!({ "html": html })))
        .unwrap();
    editor
}

fn status(editor: &Editor) -> Value {
    editor.run_query_json("search.status", None).unwrap()
}

fn find(editor: &mut Editor, term: &str) {
    editor
        .run_command("search.set_term", Some(json!({ "term": term })))
        .unwrap();
}

#[test]
fn results_wrap_in_both_directions() {
    let mut editor = editor_with("<p>foo bar Foo</p><p>food</p>");
    find(&mut editor, "foo");
    assert_eq!(status(&editor), json!({ "total": 3, "index": 1 }));

    editor.run_command("search.previous", None).unwrap();
    assert_eq!(status(&editor)["index"], json!(3));

    editor.run_command("search.next", None).unwrap();
    editor.run_command("search.next", None).unwrap();
    assert_eq!(status(&editor)["index"], json!(2));
}

#[test]
fn case_sensitivity_narrows_results() {
    let mut editor = editor_with("<p>foo bar Foo</p>");
    find(&mut editor, "foo");

    editor
        .run_command("search.set_case_sensitive", Some(json!({ "case_sensitive": true })))
        .unwrap();

    assert_eq!(status(&editor), json!({ "total": 1, "index": 1 }));
    assert!(editor.search().case_sensitive);
}

#[test]
fn replace_changes_only_the_current_result() {
    let mut editor = editor_with("<p>foo bar Foo</p>");
    find(&mut editor, "foo");
    editor
        .run_command("search.set_replace_term", Some(json!({ "term": "qux" })))
        .unwrap();

    editor.run_command("search.replace", None).unwrap();

    assert_eq!(editor.get_html(), "<p>qux bar Foo</p>");
    assert_eq!(status(&editor), json!({ "total": 1, "index": 1 }));
}

#[test]
fn replace_all_keeps_marks_of_each_match() {
    let mut editor = editor_with("<p><strong>cat</strong> and cat</p>");
    find(&mut editor, "cat");
    editor
        .run_command("search.set_replace_term", Some(json!({ "term": "dog" })))
        .unwrap();

    editor.run_command("search.replace_all", None).unwrap();

    assert_eq!(editor.get_html(), "<p><strong>dog</strong> and dog</p>");
    assert_eq!(status(&editor), json!({ "total": 0, "index": 0 }));
    assert!(editor.run_command("search.next", None).is_err());
    assert!(editor.run_command("search.replace_all", None).is_err());
}

#[test]
fn results_follow_document_edits() {
    let mut editor = editor_with("<p>ab</p>");
    find(&mut editor, "b");
    assert_eq!(status(&editor)["total"], json!(1));

    editor.run_command("selection.select_all", None).unwrap();
    editor
        .run_command("text.insert", Some(json!({ "text": "bbb" })))
        .unwrap();

    assert_eq!(status(&editor)["total"], json!(3));
}

#[test]
fn empty_replacement_deletes_matches() {
    let mut editor = editor_with("<p>a-b-c</p>");
    find(&mut editor, "-");

    editor.run_command("search.replace_all", None).unwrap();

    assert_eq!(editor.get_html(), "<p>abc</p>");
}
