use raytha_editor_core::{Editor, EventKind, Listener, ListenerId};
use serde_json::Value;

use crate::state::SearchResult;

/// The part of an editing engine the state manager reads from.
pub trait EditingEngine {
    fn is_active(&self, name: &str, attrs: Option<&Value>) -> bool;
    fn get_attributes(&self, name: &str) -> Value;
    fn get_html(&self) -> String;
    fn word_count(&self) -> usize;
    fn cursor_breadcrumb(&self) -> String;
    fn search_status(&self) -> SearchResult;
    fn extension_enabled(&self, name: &str) -> bool;
    fn on(&mut self, kind: EventKind, listener: Listener) -> ListenerId;
    fn off(&mut self, id: ListenerId) -> bool;
}

impl EditingEngine for Editor {
    fn is_active(&self, name: &str, attrs: Option<&Value>) -> bool {
        Editor::is_active(self, name, attrs)
    }

    fn get_attributes(&self, name: &str) -> Value {
        Editor::get_attributes(self, name)
    }

    fn get_html(&self) -> String {
        Editor::get_html(self)
    }

    fn word_count(&self) -> usize {
        Editor::word_count(self)
    }

    fn cursor_breadcrumb(&self) -> String {
        Editor::cursor_breadcrumb(self)
    }

    fn search_status(&self) -> SearchResult {
        let search = self.search();
        let total = search.results.len();
        SearchResult {
            total,
            index: if total == 0 { 0 } else { search.result_index + 1 },
        }
    }

    fn extension_enabled(&self, name: &str) -> bool {
        Editor::extension_enabled(self, name)
    }

    fn on(&mut self, kind: EventKind, listener: Listener) -> ListenerId {
        Editor::on(self, kind, listener)
    }

    fn off(&mut self, id: ListenerId) -> bool {
        Editor::off(self, id)
    }
}
