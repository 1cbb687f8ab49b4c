//! Flat command surface over the engine's string-ID commands.
//!
//! Each method runs one engine command and reports whether it applied.
//! Rejections are expected in normal use (toggling a table header outside a
//! table, undo with empty history) and only show up at `debug`.

use std::cell::RefCell;
use std::rc::Rc;
use std::str::FromStr;

use raytha_editor_core::{CommandError as EngineError, Editor};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::clipboard::{Clipboard, ClipboardItem};
use crate::error::{ClipboardError, CommandError};
use crate::state::INVISIBLE_CHARACTERS;

/// Commands that take no arguments, addressable by their camelCase name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EditorCommand {
    NewDocument,
    Undo,
    Redo,
    Copy,
    Cut,
    Paste,
    PasteAsText,
    SelectAll,
    NextSearchResult,
    PreviousSearchResult,
    Replace,
    ReplaceAll,
    ToggleInvisibleCharacters,
    ToggleTextBlocks,
    ToggleSpellcheck,
    AddRowBefore,
    AddRowAfter,
    AddColumnBefore,
    AddColumnAfter,
    DeleteRow,
    DeleteColumn,
    DeleteTable,
    MergeCells,
    SplitCell,
    ToggleHeaderRow,
    ToggleHeaderColumn,
    ToggleHeaderCell,
    FixTable,
    InsertHorizontalRule,
    InsertPageBreak,
    InsertNonbreakingSpace,
    ToggleBold,
    ToggleItalic,
    ToggleUnderline,
    ToggleStrike,
    ToggleSuperscript,
    ToggleSubscript,
    ToggleCode,
    InsertParagraph,
    ClearFormatting,
    AddIndent,
    RemoveIndent,
    ToggleBlockquote,
    ToggleCodeBlock,
    ToggleBulletList,
    ToggleOrderedList,
    SplitListItem,
    SinkListItem,
    LiftListItem,
}

impl FromStr for EditorCommand {
    type Err = CommandError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(Value::String(name.to_string()))
            .map_err(|_| CommandError::UnknownCommand(name.to_string()))
    }
}

pub struct EditorCommands {
    engine: Rc<RefCell<Editor>>,
    clipboard: RefCell<Option<Box<dyn Clipboard>>>,
}

impl EditorCommands {
    pub fn new(engine: Rc<RefCell<Editor>>) -> Self {
        Self {
            engine,
            clipboard: RefCell::new(None),
        }
    }

    pub fn set_clipboard(&self, clipboard: impl Clipboard + 'static) {
        *self.clipboard.borrow_mut() = Some(Box::new(clipboard));
    }

    pub fn clear_clipboard(&self) {
        *self.clipboard.borrow_mut() = None;
    }

    pub fn is_supported(command: EditorCommand) -> bool {
        !matches!(
            command,
            EditorCommand::PasteAsText
                | EditorCommand::ToggleTextBlocks
                | EditorCommand::ToggleSpellcheck
                | EditorCommand::InsertPageBreak
        )
    }

    pub fn execute(&self, command: EditorCommand) -> Result<bool, CommandError> {
        use EditorCommand::*;

        let applied = match command {
            NewDocument => self.new_document(),
            Undo => self.undo(),
            Redo => self.redo(),
            Copy => self.copy(),
            Cut => self.cut(),
            Paste => self.paste(),
            PasteAsText => return self.paste_as_text(),
            SelectAll => self.select_all(),
            NextSearchResult => self.run("search.next", None),
            PreviousSearchResult => self.run("search.previous", None),
            Replace => self.replace(),
            ReplaceAll => self.replace_all(),
            ToggleInvisibleCharacters => self.toggle_invisible_characters(),
            ToggleTextBlocks => return self.toggle_text_blocks(),
            ToggleSpellcheck => return self.toggle_spellcheck(),
            AddRowBefore => self.add_row_before(),
            AddRowAfter => self.add_row_after(),
            AddColumnBefore => self.add_column_before(),
            AddColumnAfter => self.add_column_after(),
            DeleteRow => self.delete_row(),
            DeleteColumn => self.delete_column(),
            DeleteTable => self.delete_table(),
            MergeCells => self.merge_cells(),
            SplitCell => self.split_cell(),
            ToggleHeaderRow => self.toggle_header_row(),
            ToggleHeaderColumn => self.toggle_header_column(),
            ToggleHeaderCell => self.toggle_header_cell(),
            FixTable => self.fix_table(),
            InsertHorizontalRule => self.insert_horizontal_rule(),
            InsertPageBreak => return self.insert_page_break(),
            InsertNonbreakingSpace => self.insert_nonbreaking_space(),
            ToggleBold => self.toggle_bold(),
            ToggleItalic => self.toggle_italic(),
            ToggleUnderline => self.toggle_underline(),
            ToggleStrike => self.toggle_strike(),
            ToggleSuperscript => self.toggle_superscript(),
            ToggleSubscript => self.toggle_subscript(),
            ToggleCode => self.toggle_code(),
            InsertParagraph => self.insert_paragraph(),
            ClearFormatting => self.clear_formatting(),
            AddIndent => self.add_indent(),
            RemoveIndent => self.remove_indent(),
            ToggleBlockquote => self.toggle_blockquote(),
            ToggleCodeBlock => self.toggle_code_block(),
            ToggleBulletList => self.toggle_bullet_list(),
            ToggleOrderedList => self.toggle_ordered_list(),
            SplitListItem => self.split_list_item(),
            SinkListItem => self.sink_list_item(),
            LiftListItem => self.lift_list_item(),
        };
        Ok(applied)
    }

    // file

    pub fn new_document(&self) -> bool {
        self.run("document.clear", Some(json!({ "emit_update": true })))
    }

    // edit

    pub fn undo(&self) -> bool {
        self.run("history.undo", None)
    }

    pub fn redo(&self) -> bool {
        self.run("history.redo", None)
    }

    pub fn copy(&self) -> bool {
        let Some(item) = self.selected_item() else {
            return false;
        };
        self.write_clipboard("copy", item)
    }

    /// The selection is only deleted once the clipboard accepted it.
    pub fn cut(&self) -> bool {
        let Some(item) = self.selected_item() else {
            return false;
        };
        self.write_clipboard("cut", item) && self.run("text.delete_selection", None)
    }

    pub fn paste(&self) -> bool {
        let item = match self.with_clipboard(|clipboard| clipboard.read()) {
            Ok(item) => item,
            Err(err) => {
                tracing::warn!(command = "paste", error = %err, "clipboard read failed");
                return false;
            }
        };
        if !item.html.is_empty() {
            self.run("content.insert_html", Some(json!({ "html": item.html })))
        } else if !item.text.is_empty() {
            self.run("text.insert", Some(json!({ "text": item.text })))
        } else {
            false
        }
    }

    pub fn paste_as_text(&self) -> Result<bool, CommandError> {
        Err(CommandError::NotImplemented("pasteAsText"))
    }

    pub fn select_all(&self) -> bool {
        self.run("selection.select_all", None)
    }

    pub fn set_search_term(&self, term: &str) -> bool {
        self.run("search.set_term", Some(json!({ "term": term })))
    }

    pub fn set_replace_term(&self, term: &str) -> bool {
        self.run("search.set_replace_term", Some(json!({ "term": term })))
    }

    /// Returns the 0-based index of the current result afterwards.
    pub fn next_search_result(&self) -> usize {
        self.run("search.next", None);
        self.result_index()
    }

    pub fn previous_search_result(&self) -> usize {
        self.run("search.previous", None);
        self.result_index()
    }

    pub fn set_case_sensitive(&self, case_sensitive: bool) -> bool {
        self.run(
            "search.set_case_sensitive",
            Some(json!({ "case_sensitive": case_sensitive })),
        )
    }

    pub fn replace(&self) -> bool {
        self.run("search.replace", None)
    }

    pub fn replace_all(&self) -> bool {
        self.run("search.replace_all", None)
    }

    // view

    /// Replaces the document without emitting an update. Malformed markup
    /// is an error; other rejections are `Ok(false)`.
    pub fn set_content(&self, html: &str) -> Result<bool, CommandError> {
        let args = json!({ "html": html, "emit_update": false });
        match self.try_run("document.set_content", Some(args)) {
            Ok(applied) => Ok(applied),
            Err(EngineError::InvalidContent(err)) => {
                tracing::debug!(error = %err, "content rejected");
                Err(CommandError::InvalidContent(err))
            }
            Err(err) => {
                tracing::debug!(command = "document.set_content", error = %err, "command rejected");
                Ok(false)
            }
        }
    }

    pub fn toggle_invisible_characters(&self) -> bool {
        self.run(&format!("{INVISIBLE_CHARACTERS}.toggle"), None)
    }

    pub fn toggle_text_blocks(&self) -> Result<bool, CommandError> {
        Err(CommandError::NotImplemented("toggleTextBlocks"))
    }

    pub fn toggle_spellcheck(&self) -> Result<bool, CommandError> {
        Err(CommandError::NotImplemented("toggleSpellcheck"))
    }

    // insert

    pub fn insert_link(&self, url: &str, text: &str, title: &str, open_in_new_window: bool) -> bool {
        let mut args = json!({
            "href": url,
            "text": text,
            "target": if open_in_new_window { "_blank" } else { "_self" },
        });
        if !title.is_empty() {
            args["title"] = json!(title);
        }
        self.run("link.insert", Some(args))
    }

    pub fn unset_link(&self) -> bool {
        self.run("link.unset", None)
    }

    pub fn insert_image_by_link(&self, url: &str, alt_text: Option<&str>) -> bool {
        let mut args = json!({ "src": url });
        if let Some(alt) = alt_text {
            args["alt"] = json!(alt);
        }
        self.run("image.insert", Some(args))
    }

    /// `false` when `url` is not a YouTube video link.
    pub fn insert_youtube_video(&self, url: &str, width: u32, height: u32) -> bool {
        self.run(
            "youtube.insert",
            Some(json!({ "src": url, "width": width, "height": height })),
        )
    }

    pub fn insert_table(&self, rows: usize, cols: usize) -> bool {
        self.run(
            "table.insert",
            Some(json!({ "rows": rows, "cols": cols, "with_header_row": true })),
        )
    }

    pub fn add_row_before(&self) -> bool {
        self.run("table.add_row_before", None)
    }

    pub fn add_row_after(&self) -> bool {
        self.run("table.add_row_after", None)
    }

    pub fn add_column_before(&self) -> bool {
        self.run("table.add_column_before", None)
    }

    pub fn add_column_after(&self) -> bool {
        self.run("table.add_column_after", None)
    }

    pub fn delete_row(&self) -> bool {
        self.run("table.delete_row", None)
    }

    pub fn delete_column(&self) -> bool {
        self.run("table.delete_column", None)
    }

    pub fn delete_table(&self) -> bool {
        self.run("table.delete", None)
    }

    pub fn merge_cells(&self) -> bool {
        self.run("table.merge_cells", None)
    }

    pub fn split_cell(&self) -> bool {
        self.run("table.split_cell", None)
    }

    pub fn toggle_header_row(&self) -> bool {
        self.run("table.toggle_header_row", None)
    }

    pub fn toggle_header_column(&self) -> bool {
        self.run("table.toggle_header_column", None)
    }

    pub fn toggle_header_cell(&self) -> bool {
        self.run("table.toggle_header_cell", None)
    }

    pub fn fix_table(&self) -> bool {
        self.run("table.fix", None)
    }

    pub fn insert_special_character(&self, character: &str) -> bool {
        self.insert_text(character)
    }

    pub fn insert_horizontal_rule(&self) -> bool {
        self.run("horizontal_rule.insert", None)
    }

    pub fn insert_page_break(&self) -> Result<bool, CommandError> {
        Err(CommandError::NotImplemented("insertPageBreak"))
    }

    pub fn insert_nonbreaking_space(&self) -> bool {
        self.insert_text("\u{a0}")
    }

    /// Inserts an already formatted date/time as text.
    pub fn insert_date_time(&self, datetime: &str) -> bool {
        self.insert_text(datetime)
    }

    pub fn insert_hard_break(&self) -> bool {
        self.run("hard_break.insert", None)
    }

    // format

    pub fn toggle_bold(&self) -> bool {
        self.run("marks.toggle_bold", None)
    }

    pub fn toggle_italic(&self) -> bool {
        self.run("marks.toggle_italic", None)
    }

    pub fn toggle_underline(&self) -> bool {
        self.run("marks.toggle_underline", None)
    }

    pub fn toggle_strike(&self) -> bool {
        self.run("marks.toggle_strike", None)
    }

    pub fn toggle_superscript(&self) -> bool {
        self.run("marks.toggle_superscript", None)
    }

    pub fn toggle_subscript(&self) -> bool {
        self.run("marks.toggle_subscript", None)
    }

    pub fn toggle_code(&self) -> bool {
        self.run("marks.toggle_code", None)
    }

    pub fn insert_paragraph(&self) -> bool {
        self.run("block.set_paragraph", None)
    }

    /// Also drops any font size in the block, in the same transaction.
    pub fn insert_heading(&self, level: u8) -> bool {
        self.run(
            "block.set_heading",
            Some(json!({ "level": level, "clear_font_size": true })),
        )
    }

    pub fn set_font_family(&self, font_family: &str) -> bool {
        self.run("marks.set_font_family", Some(json!({ "font_family": font_family })))
    }

    pub fn set_font_size(&self, font_size: &str) -> bool {
        self.run("marks.set_font_size", Some(json!({ "font_size": font_size })))
    }

    pub fn set_text_align(&self, align: &str) -> bool {
        self.run("block.set_text_align", Some(json!({ "align": align })))
    }

    /// Only heights listed in the line-height extension options apply.
    pub fn set_line_height(&self, height: &str) -> bool {
        self.run("block.set_line_height", Some(json!({ "height": height })))
    }

    pub fn set_text_color(&self, color: &str) -> bool {
        self.run("marks.set_color", Some(json!({ "color": color })))
    }

    pub fn set_background_color(&self, color: &str) -> bool {
        self.run("marks.set_highlight", Some(json!({ "color": color })))
    }

    pub fn clear_formatting(&self) -> bool {
        self.run("marks.unset_all", None)
    }

    pub fn add_indent(&self) -> bool {
        self.run("block.indent", None)
    }

    pub fn remove_indent(&self) -> bool {
        self.run("block.outdent", None)
    }

    pub fn toggle_blockquote(&self) -> bool {
        self.run("blockquote.toggle", None)
    }

    pub fn toggle_code_block(&self) -> bool {
        self.run("code_block.toggle", None)
    }

    pub fn toggle_bullet_list(&self) -> bool {
        self.run("list.toggle", Some(json!({ "type": "bullet" })))
    }

    pub fn toggle_ordered_list(&self) -> bool {
        self.run("list.toggle", Some(json!({ "type": "ordered" })))
    }

    pub fn split_list_item(&self) -> bool {
        self.run("list.split_item", None)
    }

    pub fn sink_list_item(&self) -> bool {
        self.run("list.sink_item", None)
    }

    pub fn lift_list_item(&self) -> bool {
        self.run("list.lift_item", None)
    }

    fn insert_text(&self, text: &str) -> bool {
        self.run("text.insert", Some(json!({ "text": text })))
    }

    fn run(&self, id: &str, args: Option<Value>) -> bool {
        match self.try_run(id, args) {
            Ok(applied) => applied,
            Err(err) => {
                tracing::debug!(command = id, error = %err, "command rejected");
                false
            }
        }
    }

    /// `Ok(false)` when the engine is already borrowed by the caller.
    fn try_run(&self, id: &str, args: Option<Value>) -> Result<bool, EngineError> {
        let Ok(mut engine) = self.engine.try_borrow_mut() else {
            tracing::warn!(command = id, "engine busy; command dropped");
            return Ok(false);
        };
        engine.run_command(id, args).map(|()| true)
    }

    fn result_index(&self) -> usize {
        self.engine
            .try_borrow()
            .map(|engine| engine.search().result_index)
            .unwrap_or_default()
    }

    fn selected_item(&self) -> Option<ClipboardItem> {
        let engine = self.engine.try_borrow().ok()?;
        if engine.selection().is_collapsed() {
            return None;
        }
        Some(ClipboardItem::new(engine.selected_text(), engine.selected_html()))
    }

    fn write_clipboard(&self, command: &'static str, item: ClipboardItem) -> bool {
        match self.with_clipboard(|clipboard| clipboard.write(item)) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(command, error = %err, "clipboard write failed");
                false
            }
        }
    }

    fn with_clipboard<T>(
        &self,
        f: impl FnOnce(&mut dyn Clipboard) -> Result<T, ClipboardError>,
    ) -> Result<T, ClipboardError> {
        let mut slot = self
            .clipboard
            .try_borrow_mut()
            .map_err(|_| ClipboardError::Access("clipboard is busy".into()))?;
        match slot.as_deref_mut() {
            Some(clipboard) => f(clipboard),
            None => Err(ClipboardError::Unavailable),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_names() {
        assert_eq!("toggleBold".parse::<EditorCommand>().unwrap(), EditorCommand::ToggleBold);
        assert_eq!(
            "toggleInvisibleCharacters".parse::<EditorCommand>().unwrap(),
            EditorCommand::ToggleInvisibleCharacters
        );
        assert_eq!(
            "toggle_bold".parse::<EditorCommand>(),
            Err(CommandError::UnknownCommand("toggle_bold".into()))
        );
    }

    #[test]
    fn unsupported_commands_are_flagged() {
        assert!(!EditorCommands::is_supported(EditorCommand::InsertPageBreak));
        assert!(!EditorCommands::is_supported(EditorCommand::PasteAsText));
        assert!(EditorCommands::is_supported(EditorCommand::Paste));
    }
}
