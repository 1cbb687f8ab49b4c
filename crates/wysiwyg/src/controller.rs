//! Host glue: wires a model to its view and to the form field the page submits.

use std::cell::{Ref, RefCell};
use std::rc::Rc;
use std::time::Instant;

use crate::clock::{Clock, SystemClock};
use crate::commands::EditorCommands;
use crate::config::WysiwygConfig;
use crate::form::{ContentSink, HiddenField};
use crate::model::EditorModel;
use crate::state_manager::Subscription;
use crate::upload::{CreateAfterUpload, MediaUploadConfig, PresignResponse, UploadFile, UploadResponse};
use crate::view::EditorView;

/// A message the host shows in an error dialog.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{title}: {text}")]
pub struct Notice {
    pub title: String,
    pub text: String,
}

impl Notice {
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
        }
    }
}

pub struct EditorController {
    model: EditorModel,
    view: Rc<RefCell<EditorView>>,
    field: Rc<RefCell<HiddenField>>,
    upload: MediaUploadConfig,
    subscription: Option<Subscription>,
}

impl EditorController {
    pub fn connect(config: &WysiwygConfig, field: HiddenField, upload: MediaUploadConfig) -> Self {
        Self::connect_with_clock(config, field, upload, Rc::new(SystemClock))
    }

    pub fn connect_with_clock(
        config: &WysiwygConfig,
        field: HiddenField,
        upload: MediaUploadConfig,
        clock: Rc<dyn Clock>,
    ) -> Self {
        let view = Rc::new(RefCell::new(EditorView::new(config)));
        let mut model = EditorModel::with_clock(config, clock);

        let subscriber = Rc::clone(&view);
        let subscription = model.state_manager_mut().subscribe(move |state, previous| {
            match subscriber.try_borrow_mut() {
                Ok(mut view) => view.update_view(state, previous),
                Err(_) => tracing::warn!("view busy; snapshot dropped"),
            }
        });

        let initial = field.value().to_string();
        if !initial.is_empty() {
            if let Err(err) = model.commands().set_content(&initial) {
                tracing::warn!(field = field.name(), error = %err, "initial content rejected");
            }
            model.state_manager_mut().reset_content_baseline();
            model.state_manager_mut().force_update();
        }

        let field = Rc::new(RefCell::new(field));
        let sink = Rc::clone(&field);
        model
            .state_manager_mut()
            .set_content_change_callback(move |html| sink.borrow_mut().write_content(html));
        tracing::info!(field = field.borrow().name(), "editor connected");

        Self {
            model,
            view,
            field,
            upload,
            subscription: Some(subscription),
        }
    }

    pub fn model(&self) -> &EditorModel {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut EditorModel {
        &mut self.model
    }

    pub fn view(&self) -> Ref<'_, EditorView> {
        self.view.borrow()
    }

    pub fn field(&self) -> Ref<'_, HiddenField> {
        self.field.borrow()
    }

    pub fn upload_config(&self) -> &MediaUploadConfig {
        &self.upload
    }

    /// Runs a camelCase command from a toolbar or menu item.
    pub fn execute_command(&mut self, name: &str) -> bool {
        match self.model.execute_named(name) {
            Ok(applied) => applied,
            Err(err) => {
                tracing::error!(command = name, error = %err, "command failed");
                false
            }
        }
    }

    pub fn set_font_family(&mut self, font_family: &str) -> bool {
        self.apply(|c| c.set_font_family(font_family))
    }

    pub fn set_font_size(&mut self, font_size: &str) -> bool {
        self.apply(|c| c.set_font_size(font_size))
    }

    pub fn insert_heading(&mut self, level: u8) -> bool {
        self.apply(|c| c.insert_heading(level))
    }

    pub fn set_text_align(&mut self, align: &str) -> bool {
        self.apply(|c| c.set_text_align(align))
    }

    pub fn set_line_height(&mut self, height: &str) -> bool {
        self.apply(|c| c.set_line_height(height))
    }

    pub fn insert_table(&mut self, rows: usize, cols: usize) -> bool {
        self.apply(|c| c.insert_table(rows, cols))
    }

    pub fn set_text_color(&mut self, color: &str) -> bool {
        self.apply(|c| c.set_text_color(color))
    }

    pub fn set_background_color(&mut self, color: &str) -> bool {
        self.apply(|c| c.set_background_color(color))
    }

    /// Text for the link dialog: the current selection.
    pub fn link_dialog_text(&self) -> String {
        self.model.editor().selected_text()
    }

    /// Both `url` and `text` are required.
    pub fn insert_link(&mut self, url: &str, text: &str, title: &str, open_in_new_window: bool) -> bool {
        if url.is_empty() || text.is_empty() {
            return false;
        }
        self.model
            .run(|c| c.insert_link(url, text, title, open_in_new_window))
    }

    pub fn insert_image_by_url(&mut self, url: &str, alt_text: &str) -> bool {
        let alt = Some(alt_text).filter(|alt| !alt.is_empty());
        self.model.run(|c| c.insert_image_by_link(url, alt))
    }

    pub fn insert_video(&mut self, url: &str, width: u32, height: u32) -> Result<(), Notice> {
        if self.model.run(|c| c.insert_youtube_video(url, width, height)) {
            Ok(())
        } else {
            Err(Notice::new("Invalid URL", "Please enter a valid YouTube URL"))
        }
    }

    /// HTML for the source code and preview dialogs.
    pub fn source_code(&self) -> String {
        self.model.get_html()
    }

    pub fn update_source_code(&mut self, source: &str) -> Result<(), Notice> {
        let result = self.model.run(|c| c.set_content(source));
        match result {
            Ok(_) => {
                let manager = self.model.state_manager_mut();
                if !manager.sync_content() {
                    manager.force_update();
                }
                Ok(())
            }
            Err(err) => Err(Notice::new("Invalid content", err.to_string())),
        }
    }

    pub fn insert_special_character(&mut self, character: &str) -> bool {
        self.model.run(|c| c.insert_special_character(character))
    }

    pub fn insert_date_time(&mut self, datetime: &str) -> bool {
        self.model.run(|c| c.insert_date_time(datetime))
    }

    pub fn toggle_search_and_replace_dialog(&mut self) -> bool {
        self.view.borrow_mut().toggle_search_and_replace()
    }

    pub fn set_search_term(&mut self, term: &str) -> bool {
        self.apply(|c| c.set_search_term(term))
    }

    pub fn set_replace_term(&mut self, term: &str) -> bool {
        self.apply(|c| c.set_replace_term(term))
    }

    pub fn set_case_sensitive(&mut self, case_sensitive: bool) -> bool {
        self.apply(|c| c.set_case_sensitive(case_sensitive))
    }

    pub fn validate_upload(&self, file: &UploadFile) -> Result<(), Notice> {
        self.upload.validate(file).map_err(|err| {
            tracing::debug!(file = %file.name, error = %err, "upload restricted");
            Notice::new("File Restriction", err.to_string())
        })
    }

    /// Upload through the media endpoint finished.
    pub fn upload_succeeded(&mut self, file: &UploadFile, response: &UploadResponse) -> Result<bool, Notice> {
        let completion = self
            .upload
            .completion_from_response(response, file)
            .map_err(|err| Notice::new("Upload failed", err.to_string()))?;
        Ok(self.model.complete_upload(&completion))
    }

    /// Direct upload to cloud storage finished. Returns the body the host
    /// posts to the create-after-upload endpoint.
    pub fn direct_upload_succeeded(
        &mut self,
        file: &UploadFile,
        presign: &PresignResponse,
    ) -> Result<CreateAfterUpload, Notice> {
        let completion = self
            .upload
            .completion(&presign.fields.object_key, file.alt_text.clone())
            .map_err(|err| Notice::new("Upload failed", err.to_string()))?;
        self.model.complete_upload(&completion);
        Ok(self.upload.create_after_upload(file, presign))
    }

    pub fn upload_failed(&self, file: &UploadFile, error: &str) -> Notice {
        tracing::warn!(file = %file.name, error, "upload failed");
        Notice::new("Upload failed", error)
    }

    pub fn tick(&mut self) {
        self.model.tick();
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.model.next_deadline()
    }

    pub fn disconnect(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        self.model.destroy();
        self.view.borrow_mut().destroy();
        tracing::info!("editor disconnected");
    }

    fn apply(&mut self, f: impl FnOnce(&EditorCommands) -> bool) -> bool {
        let applied = self.model.run(f);
        self.model.state_manager_mut().force_update();
        applied
    }
}
