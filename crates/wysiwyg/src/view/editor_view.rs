use crate::config::WysiwygConfig;
use crate::state::EditorState;
use crate::view::component::UpdateableComponent;
use crate::view::dom::{Dom, El, NodeId};
use crate::view::footer::Footer;
use crate::view::menubar::Menubar;
use crate::view::search_dialog::SearchAndReplaceDialog;
use crate::view::toolbar::Toolbar;

/// Owns the editor chrome and routes snapshots to its components.
pub struct EditorView {
    dom: Dom,
    container: NodeId,
    body: NodeId,
    menubar: Menubar,
    toolbar: Toolbar,
    footer: Footer,
    search_dialog: SearchAndReplaceDialog,
    destroyed: bool,
}

impl EditorView {
    pub fn new(config: &WysiwygConfig) -> Self {
        let mut dom = Dom::new();
        let root = dom.root();
        let container = dom.append(root, El::new("div").id("editorContainer").class("wysiwyg-editor"));
        let header = dom.append(container, El::new("div").class("editor-header"));
        let body = dom.append(container, El::new("div").id("editorBody").class("editor-body"));
        let footer_node = dom.append(container, El::new("div").class("editor-footer"));

        let menubar = Menubar::mount(&mut dom, header, config);
        let toolbar = Toolbar::mount(&mut dom, header, config);
        let footer = Footer::mount(&mut dom, footer_node);
        let search_dialog = SearchAndReplaceDialog::mount(&mut dom, container);

        Self {
            dom,
            container,
            body,
            menubar,
            toolbar,
            footer,
            search_dialog,
            destroyed: false,
        }
    }

    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    pub fn dom_mut(&mut self) -> &mut Dom {
        &mut self.dom
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    /// Where the host mounts the editable area.
    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn menubar(&self) -> &Menubar {
        &self.menubar
    }

    pub fn toolbar(&self) -> &Toolbar {
        &self.toolbar
    }

    pub fn footer(&self) -> &Footer {
        &self.footer
    }

    pub fn search_dialog(&self) -> &SearchAndReplaceDialog {
        &self.search_dialog
    }

    pub fn update_view(&mut self, state: &EditorState, previous: Option<&EditorState>) {
        if self.destroyed {
            return;
        }
        if previous.is_none_or(|previous| previous != state) {
            self.menubar.update_ui(&mut self.dom, state, previous);
            self.toolbar.update_ui(&mut self.dom, state, previous);
            self.footer.update_ui(&mut self.dom, state, previous);
        }
        if previous.is_none_or(|previous| previous.search_result != state.search_result) {
            self.search_dialog.update_search_results(&mut self.dom, &state.search_result);
        }
    }

    pub fn toggle_search_and_replace(&mut self) -> bool {
        if self.destroyed {
            return false;
        }
        self.search_dialog.toggle(&mut self.dom)
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.menubar.destroy(&mut self.dom);
        self.toolbar.destroy(&mut self.dom);
        self.footer.destroy(&mut self.dom);
        self.search_dialog.destroy(&mut self.dom);
        self.dom.remove(self.container);
    }
}
