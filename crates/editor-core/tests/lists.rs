use raytha_editor_core::{Editor, Node, Point, Selection};
use serde_json::json;

fn editor_with(html: &str) -> Editor {
    let mut editor = Editor::with_wysiwyg_extensions();
    editor
        .run_command("document.set_content", Some(json!({ "html": html })))
        .unwrap();
    editor
}

fn caret(editor: &mut Editor, path: Vec<usize>, offset: usize) {
    editor.set_selection(Selection::collapsed(Point::new(path, offset)));
}

const TWO_ITEMS: &str = "<ul><li><p>a</p></li><li><p>b</p></li></ul>";

#[test]
fn bullet_toggle_converts_paragraphs_and_back() {
    let mut editor = editor_with("<p>a</p><p>b</p>");
    editor.run_command("selection.select_all", None).unwrap();

    editor
        .run_command("list.toggle", Some(json!({ "type": "bullet" })))
        .unwrap();
    assert_eq!(editor.get_html(), TWO_ITEMS);
    assert!(editor.is_active("bulletList", None));
    assert!(!editor.is_active("orderedList", None));

    editor
        .run_command("list.toggle", Some(json!({ "type": "bullet" })))
        .unwrap();
    assert_eq!(editor.get_html(), "<p>a</p><p>b</p>");
}

#[test]
fn ordered_toggle_inside_bullet_list_retypes_the_whole_list() {
    let mut editor = editor_with(TWO_ITEMS);

    editor
        .run_command("list.toggle", Some(json!({ "type": "ordered" })))
        .unwrap();

    assert_eq!(
        editor.get_html(),
        "<ol><li><p>a</p></li><li><p>b</p></li></ol>"
    );
}

#[test]
fn unknown_list_type_is_rejected() {
    let mut editor = editor_with("<p>a</p>");
    assert!(
        editor
            .run_command("list.toggle", Some(json!({ "type": "todo" })))
            .is_err()
    );
}

#[test]
fn sink_nests_under_previous_item_and_lift_undoes_it() {
    let mut editor = editor_with(TWO_ITEMS);

    assert!(editor.run_command("list.sink_item", None).is_err());

    caret(&mut editor, vec![1, 0], 0);
    editor.run_command("list.sink_item", None).unwrap();
    assert_eq!(
        editor.get_html(),
        "<ul><li><p>a</p><ul><li><p>b</p></li></ul></li></ul>"
    );

    editor.run_command("list.lift_item", None).unwrap();
    assert_eq!(editor.get_html(), TWO_ITEMS);

    editor.run_command("list.lift_item", None).unwrap();
    assert_eq!(editor.get_html(), "<ul><li><p>a</p></li></ul><p>b</p>");
}

#[test]
fn enter_in_empty_item_leaves_the_list() {
    let mut editor = editor_with("<ul><li><p>ab</p></li></ul>");
    caret(&mut editor, vec![0, 0], 2);

    editor.run_command("block.split", None).unwrap();
    assert_eq!(
        editor.get_html(),
        "<ul><li><p>ab</p></li><li><p></p></li></ul>"
    );
    assert_eq!(editor.selection().focus.path, vec![1, 0]);

    editor.run_command("block.split", None).unwrap();
    assert_eq!(editor.get_html(), "<ul><li><p>ab</p></li></ul><p></p>");
    let Node::Element(el) = &editor.doc().children[1] else {
        panic!("expected paragraph");
    };
    assert_eq!(el.kind, "paragraph");
}

#[test]
fn backspace_at_start_of_nested_item_lifts_it() {
    let mut editor = editor_with("<ul><li><p>a</p><ul><li><p>b</p></li></ul></li></ul>");
    caret(&mut editor, vec![1, 0], 0);

    editor.run_command("text.delete_backward", None).unwrap();

    assert_eq!(editor.get_html(), TWO_ITEMS);
}

#[test]
fn nesting_deeper_than_one_step_is_normalized() {
    let mut editor = editor_with(TWO_ITEMS);
    let mut item = editor.doc().children[1].clone();
    if let Node::Element(el) = &mut item {
        el.attrs.insert("list_level".into(), json!(4));
    }
    editor
        .apply(raytha_editor_core::Transaction::new(vec![
            raytha_editor_core::Op::RemoveNode { path: vec![1] },
            raytha_editor_core::Op::InsertNode {
                path: vec![1],
                node: item,
            },
        ]))
        .unwrap();

    let Node::Element(el) = &editor.doc().children[1] else {
        panic!("expected list item");
    };
    assert_eq!(el.attrs.get("list_level"), Some(&json!(1)));
}
