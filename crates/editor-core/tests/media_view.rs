use std::cell::RefCell;
use std::rc::Rc;

use raytha_editor_core::{EditorEvent, Editor, EventKind};
use serde_json::json;

#[test]
fn image_insert_places_inline_image_with_default_alt() {
    let mut editor = Editor::with_wysiwyg_extensions();
    editor
        .run_command("text.insert", Some(json!({ "text": "ab" })))
        .unwrap();

    editor
        .run_command("image.insert", Some(json!({ "src": "/media/a.png" })))
        .unwrap();

    assert_eq!(editor.get_html(), "<p>ab<img src=\"/media/a.png\" alt=\"altText\"></p>");
    assert!(editor.run_command("image.insert", Some(json!({ "src": " " }))).is_err());
}

#[test]
fn youtube_insert_stores_embed_url() {
    let mut editor = Editor::with_wysiwyg_extensions();

    editor
        .run_command(
            "youtube.insert",
            Some(json!({ "src": "https://youtu.be/dQw4w9WgXcQ", "width": 320 })),
        )
        .unwrap();

    assert_eq!(
        editor.get_html(),
        "<div data-youtube-video=\"\"><iframe src=\"https://www.youtube.com/embed/dQw4w9WgXcQ\" width=\"320\" height=\"480\" allowfullscreen=\"true\"></iframe></div><p></p>"
    );
}

#[test]
fn youtube_insert_rejects_non_video_links() {
    let mut editor = Editor::with_wysiwyg_extensions();

    let err = editor
        .run_command("youtube.insert", Some(json!({ "src": "https://vimeo.com/1" })))
        .unwrap_err();

    assert!(err.to_string().contains("Not a YouTube video URL"));
    assert_eq!(editor.get_html(), "<p></p>");
}

#[test]
fn invisible_characters_toggle_is_an_option() {
    let mut editor = Editor::with_wysiwyg_extensions();
    let seen = Rc::new(RefCell::new(Vec::<EditorEvent>::new()));
    let sink = seen.clone();
    editor.on(
        EventKind::Transaction,
        Box::new(move |event| sink.borrow_mut().push(event.clone())),
    );
    assert!(!editor.extension_enabled("invisible_characters"));

    editor.run_command("invisible_characters.toggle", None).unwrap();

    assert!(editor.extension_enabled("invisible_characters"));
    assert_eq!(editor.get_html(), "<p></p>");
    assert_eq!(
        seen.borrow().last().and_then(|e| e.source.clone()),
        Some("configure:invisible_characters".to_string())
    );
}

#[test]
fn character_count_queries_track_content() {
    let mut editor = Editor::with_wysiwyg_extensions();
    editor
        .run_command(
            "document.set_content",
            Some(json!({ "html": "<p>one two</p><p>three</p>" })),
        )
        .unwrap();

    assert_eq!(editor.run_query::<usize>("character_count.words", None).unwrap(), 3);
    assert_eq!(
        editor.run_query::<usize>("character_count.characters", None).unwrap(),
        editor.character_count()
    );
}

#[test]
fn update_fires_only_for_document_changes_that_ask_for_it() {
    let mut editor = Editor::with_wysiwyg_extensions();
    let updates = Rc::new(RefCell::new(0));
    let counter = updates.clone();
    editor.on(
        EventKind::Update,
        Box::new(move |_| *counter.borrow_mut() += 1),
    );

    editor
        .run_command("document.set_content", Some(json!({ "html": "<p>a</p>" })))
        .unwrap();
    assert_eq!(*updates.borrow(), 0);

    editor
        .run_command("document.set_content", Some(json!({ "html": "<p>b</p>", "emit_update": true })))
        .unwrap();
    editor
        .run_command("text.insert", Some(json!({ "text": "c" })))
        .unwrap();
    assert_eq!(*updates.borrow(), 2);
}
