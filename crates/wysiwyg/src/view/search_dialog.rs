use crate::state::SearchResult;
use crate::view::dom::{Dom, El, NodeId};
use crate::view::{action, command_button};

const HIDDEN: &str = "d-none";

/// Floating find-and-replace panel. Starts hidden.
pub struct SearchAndReplaceDialog {
    root: NodeId,
    index: Option<NodeId>,
    total: Option<NodeId>,
    visible: bool,
}

impl SearchAndReplaceDialog {
    pub fn mount(dom: &mut Dom, parent: NodeId) -> Self {
        let root = dom.append(parent, markup());
        Self {
            index: dom.query(root, "#searchResultIndex"),
            total: dom.query(root, "#searchResultTotal"),
            root,
            visible: false,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Returns whether the dialog is visible afterwards.
    pub fn toggle(&mut self, dom: &mut Dom) -> bool {
        self.visible = !self.visible;
        dom.toggle_class(self.root, HIDDEN, Some(!self.visible));
        self.visible
    }

    pub fn update_search_results(&self, dom: &mut Dom, result: &SearchResult) {
        if let Some(node) = self.index {
            dom.set_text(node, &result.index.to_string());
        }
        if let Some(node) = self.total {
            dom.set_text(node, &result.total.to_string());
        }
    }

    /// The counter as rendered, e.g. `2 of 3`.
    pub fn results_label(&self, dom: &Dom) -> String {
        let text = |node: Option<NodeId>| node.map(|node| dom.text(node)).unwrap_or("0");
        format!("{} of {}", text(self.index), text(self.total))
    }

    pub fn destroy(&self, dom: &mut Dom) {
        dom.remove(self.root);
    }
}

fn markup() -> El {
    let input = |id: &str, method: &str, placeholder: &str| {
        El::new("input")
            .id(id)
            .class("form-control form-control-sm")
            .attr("type", "text")
            .attr("placeholder", placeholder)
            .attr("data-action", action("input", method))
    };

    El::new("div")
        .id("searchAndReplaceDialog")
        .class("search-and-replace")
        .class(HIDDEN)
        .child(input("searchTerm", "setSearchTerm", "Find"))
        .child(input("replaceTerm", "setReplaceTerm", "Replace with"))
        .child(
            El::new("input")
                .id("caseSensitive")
                .attr("type", "checkbox")
                .attr("data-action", action("change", "setCaseSensitive")),
        )
        .child(
            El::new("div")
                .class("search-results")
                .child(El::new("span").id("searchResultIndex").text("0"))
                .child(El::new("span").text("of"))
                .child(El::new("span").id("searchResultTotal").text("0")),
        )
        .child(command_button("previousSearchResultButton", "previousSearchResult", "icon-arrow-up"))
        .child(command_button("nextSearchResultButton", "nextSearchResult", "icon-arrow-down"))
        .child(command_button("replaceButton", "replace", "icon-replace"))
        .child(command_button("replaceAllButton", "replaceAll", "icon-replace-all"))
}
