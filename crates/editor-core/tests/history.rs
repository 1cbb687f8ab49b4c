use raytha_editor_core::Editor;
use serde_json::json;

fn type_text(editor: &mut Editor, text: &str) {
    editor
        .run_command("text.insert", Some(json!({ "text": text })))
        .unwrap();
}

#[test]
fn undo_and_redo_walk_the_history() {
    let mut editor = Editor::with_wysiwyg_extensions();
    assert!(!editor.run_query::<bool>("history.can_undo", None).unwrap());

    type_text(&mut editor, "a");
    type_text(&mut editor, "b");
    assert_eq!(editor.get_html(), "<p>ab</p>");

    editor.run_command("history.undo", None).unwrap();
    assert_eq!(editor.get_html(), "<p>a</p>");
    assert!(editor.run_query::<bool>("history.can_redo", None).unwrap());

    editor.run_command("history.redo", None).unwrap();
    assert_eq!(editor.get_html(), "<p>ab</p>");
    assert!(!editor.can_redo());
}

#[test]
fn new_edit_clears_the_redo_stack() {
    let mut editor = Editor::with_wysiwyg_extensions();
    type_text(&mut editor, "a");
    editor.run_command("history.undo", None).unwrap();

    type_text(&mut editor, "z");

    assert!(!editor.can_redo());
    assert_eq!(
        editor.run_command("history.redo", None).unwrap_err().to_string(),
        "Nothing to redo"
    );
}

#[test]
fn undo_restores_the_selection() {
    let mut editor = Editor::with_wysiwyg_extensions();
    type_text(&mut editor, "abc");
    let before = editor.selection().clone();
    editor.run_command("block.split", None).unwrap();
    assert_ne!(editor.selection(), &before);

    editor.run_command("history.undo", None).unwrap();

    assert_eq!(editor.get_html(), "<p>abc</p>");
    assert_eq!(editor.selection(), &before);
}

#[test]
fn undo_on_fresh_editor_fails() {
    let mut editor = Editor::with_wysiwyg_extensions();
    assert!(editor.run_command("history.undo", None).is_err());
}
