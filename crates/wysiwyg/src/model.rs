use std::cell::{Ref, RefCell};
use std::rc::Rc;
use std::time::Instant;

use raytha_editor_core::{Editor, Selection};
use serde_json::{Value, json};

use crate::clock::{Clock, SystemClock};
use crate::commands::{EditorCommand, EditorCommands};
use crate::config::WysiwygConfig;
use crate::error::CommandError;
use crate::state_manager::EditorStateManager;
use crate::upload::UploadCompletion;

const TABLE_NODES: [&str; 4] = ["table", "tableCell", "tableHeader", "tableRow"];

/// One editor instance: the engine with the full extension set, the command
/// façade over it and the state manager listening to it.
pub struct EditorModel {
    engine: Rc<RefCell<Editor>>,
    commands: EditorCommands,
    state_manager: EditorStateManager,
    destroyed: bool,
}

impl EditorModel {
    pub fn new(config: &WysiwygConfig) -> Self {
        Self::with_clock(config, Rc::new(SystemClock))
    }

    pub fn with_clock(config: &WysiwygConfig, clock: Rc<dyn Clock>) -> Self {
        let mut editor = Editor::with_wysiwyg_extensions();
        let heights = config.view.line_heights.clone();
        let default_height = config.text_style.line_height.clone();
        editor.configure_extension("line_height", |options| {
            options["heights"] = json!(heights);
            options["default_height"] = json!(default_height);
        });

        let engine = Rc::new(RefCell::new(editor));
        let commands = EditorCommands::new(Rc::clone(&engine));
        let state_manager = EditorStateManager::new(Rc::clone(&engine), clock, config);
        tracing::debug!("editor model created");

        Self {
            engine,
            commands,
            state_manager,
            destroyed: false,
        }
    }

    pub fn editor(&self) -> Ref<'_, Editor> {
        self.engine.borrow()
    }

    pub fn get_html(&self) -> String {
        self.engine.borrow().get_html()
    }

    pub fn commands(&self) -> &EditorCommands {
        &self.commands
    }

    pub fn state_manager(&self) -> &EditorStateManager {
        &self.state_manager
    }

    pub fn state_manager_mut(&mut self) -> &mut EditorStateManager {
        &mut self.state_manager
    }

    /// Runs `f` against the commands, then feeds the resulting engine events
    /// to the state manager.
    pub fn run<T>(&mut self, f: impl FnOnce(&EditorCommands) -> T) -> T {
        let out = f(&self.commands);
        self.state_manager.process_events();
        out
    }

    /// Parses a camelCase command name and runs it, refreshing the snapshot
    /// when it applied.
    pub fn execute_named(&mut self, name: &str) -> Result<bool, CommandError> {
        let command: EditorCommand = name.parse().inspect_err(|_| {
            tracing::error!(command = name, "invalid command");
        })?;
        let result = self.run(|commands| commands.execute(command));
        if matches!(result, Ok(true)) {
            self.state_manager.force_update();
        }
        result
    }

    pub fn configure_extension(&mut self, name: &str, updater: impl FnOnce(&mut Value)) -> bool {
        let configured = self.engine.borrow_mut().configure_extension(name, updater);
        if !configured {
            tracing::error!(extension = name, "cannot configure unknown extension");
        }
        self.state_manager.process_events();
        configured
    }

    pub fn type_text(&mut self, text: &str) -> bool {
        self.dispatch("text.insert", Some(json!({ "text": text })))
    }

    pub fn press_enter(&mut self) -> bool {
        self.dispatch("block.split", None)
    }

    pub fn press_backspace(&mut self) -> bool {
        self.dispatch("text.delete_backward", None)
    }

    pub fn set_selection(&mut self, selection: Selection) {
        if self.destroyed {
            return;
        }
        self.engine.borrow_mut().set_selection(selection);
        self.state_manager.process_events();
    }

    /// Inserts the uploaded image at the selection.
    pub fn complete_upload(&mut self, completion: &UploadCompletion) -> bool {
        if self.destroyed {
            return false;
        }
        let alt = completion.alt_text.as_deref();
        self.run(|commands| commands.insert_image_by_link(&completion.url, alt))
    }

    /// Whether the table bubble menu should show for the current selection.
    pub fn table_menu_visible(&self) -> bool {
        let editor = self.engine.borrow();
        TABLE_NODES.iter().any(|node| editor.is_active(node, None))
    }

    pub fn tick(&mut self) {
        self.state_manager.run_pending();
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.state_manager.next_deadline()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Destroys the state manager before releasing the engine's resources.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.state_manager.destroy();
        self.commands.clear_clipboard();
        self.destroyed = true;
        tracing::debug!("editor model destroyed");
    }

    fn dispatch(&mut self, id: &str, args: Option<Value>) -> bool {
        if self.destroyed {
            return false;
        }
        let result = self.engine.borrow_mut().run_command(id, args);
        self.state_manager.process_events();
        match result {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(command = id, error = %err, "input rejected");
                false
            }
        }
    }
}
