use std::{fs, thread, time::Instant};

use anyhow::{Context, Result, bail};
use raytha_editor_core::{Point, Selection};
use raytha_wysiwyg::{
    EditorController, HiddenField, MediaUploadConfig, UploadFile, UploadResponse, WysiwygConfig,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("raytha_wysiwyg=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            let json = fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            WysiwygConfig::from_json_str(&json).with_context(|| format!("loading {path}"))?
        }
        None => WysiwygConfig::default(),
    };
    let upload = MediaUploadConfig::from_host_values("https://cms.example", false, "image/*", 5 * 1024 * 1024);
    let field = HiddenField::new("content", "<p>Draft</p>");

    let mut editor = EditorController::connect(&config, field, upload);
    print_snapshot(&editor, "connected")?;

    editor.model_mut().set_selection(Selection::new(
        Point::new(vec![0, 0], 0),
        Point::new(vec![0, 0], 5),
    ));
    editor.insert_heading(1);
    editor.model_mut().set_selection(Selection::collapsed(Point::new(vec![0, 0], 5)));
    editor.model_mut().press_enter();
    editor.execute_command("toggleBold");
    editor.model_mut().type_text("Hello");
    editor.execute_command("toggleBold");
    editor.model_mut().type_text(" world, typed in one burst.");
    settle(&mut editor);
    print_snapshot(&editor, "typed")?;

    editor.set_text_align("center");
    editor.set_line_height("2");
    editor.insert_link("https://raytha.com", " Raytha", "", true);
    settle(&mut editor);
    print_snapshot(&editor, "styled")?;

    let file = UploadFile::new("logo.png", 2048).with_alt_text("Raytha logo");
    if let Err(notice) = editor.validate_upload(&file) {
        bail!("{notice}");
    }
    let response: UploadResponse =
        serde_json::from_str(r#"{ "fields": { "id": "m1", "objectKey": "media/logo.png" } }"#)?;
    editor.upload_succeeded(&file, &response)?;

    if let Err(notice) = editor.insert_video("https://example.com/clip", 640, 480) {
        tracing::info!(%notice, "video rejected");
    }
    editor.insert_video("https://www.youtube.com/watch?v=dQw4w9WgXcQ", 640, 480)?;
    editor.insert_table(2, 3);
    settle(&mut editor);
    print_snapshot(&editor, "media")?;

    editor.toggle_search_and_replace_dialog();
    editor.set_search_term("o");
    editor.execute_command("nextSearchResult");
    {
        let view = editor.view();
        println!("search: {}", view.search_dialog().results_label(view.dom()));
    }

    println!("submitted: {}", editor.field().value());
    editor.disconnect();
    Ok(())
}

/// Sleeps through pending throttle and debounce windows until nothing is scheduled.
fn settle(editor: &mut EditorController) {
    while let Some(deadline) = editor.next_deadline() {
        let now = Instant::now();
        if deadline > now {
            thread::sleep(deadline - now);
        }
        editor.tick();
    }
}

fn print_snapshot(editor: &EditorController, label: &str) -> Result<()> {
    let state = editor.model().state_manager().get_state();
    println!("== {label}");
    println!("{}", serde_json::to_string_pretty(&state)?);
    println!("html: {}", editor.source_code());
    Ok(())
}
