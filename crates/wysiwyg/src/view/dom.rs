//! A small element tree standing in for the browser DOM.
//!
//! Markup is built with [`El`] and appended unlogged. Every later write
//! goes through [`Dom::set_attr`], [`Dom::toggle_class`], [`Dom::set_text`]
//! or [`Dom::remove`] and lands in the mutation log.

use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Default)]
struct Element {
    tag: String,
    attrs: BTreeMap<String, String>,
    classes: Vec<String>,
    text: String,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
    detached: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    SetAttribute { node: NodeId, name: String, value: String },
    ToggleClass { node: NodeId, class: String, present: bool },
    SetText { node: NodeId, text: String },
    Remove { node: NodeId },
}

impl Mutation {
    pub fn node(&self) -> NodeId {
        match self {
            Mutation::SetAttribute { node, .. }
            | Mutation::ToggleClass { node, .. }
            | Mutation::SetText { node, .. }
            | Mutation::Remove { node } => *node,
        }
    }
}

/// Element description used to build initial markup.
#[derive(Debug, Clone, Default)]
pub struct El {
    tag: String,
    attrs: Vec<(String, String)>,
    classes: Vec<String>,
    text: String,
    children: Vec<El>,
}

impl El {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            ..Self::default()
        }
    }

    pub fn id(self, id: &str) -> Self {
        self.attr("id", id)
    }

    pub fn attr(mut self, name: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        if name == "class" {
            return self.class(&value);
        }
        self.attrs.push((name.to_string(), value));
        self
    }

    /// Accepts a space separated list.
    pub fn class(mut self, classes: &str) -> Self {
        self.classes.extend(classes.split_whitespace().map(String::from));
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn child(mut self, child: El) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = El>) -> Self {
        self.children.extend(children);
        self
    }
}

#[derive(Debug, Clone)]
pub struct Dom {
    nodes: Vec<Element>,
    mutations: Vec<Mutation>,
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

impl Dom {
    pub fn new() -> Self {
        Self {
            nodes: vec![Element {
                tag: "body".into(),
                ..Element::default()
            }],
            mutations: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Appends `el` and its subtree under `parent` without logging.
    pub fn append(&mut self, parent: NodeId, el: El) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Element {
            tag: el.tag,
            attrs: el.attrs.into_iter().collect(),
            classes: el.classes,
            text: el.text,
            children: Vec::new(),
            parent: Some(parent),
            detached: false,
        });
        if let Some(parent) = self.nodes.get_mut(parent.0) {
            parent.children.push(id);
        }
        for child in el.children {
            self.append(id, child);
        }
        id
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|el| el.tag.as_str())
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node)?.attrs.get(name).map(String::as_str)
    }

    pub fn attr_names(&self, node: NodeId) -> impl Iterator<Item = &str> {
        self.element(node)
            .into_iter()
            .flat_map(|el| el.attrs.keys().map(String::as_str))
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.element(node)
            .is_some_and(|el| el.classes.iter().any(|c| c == class))
    }

    pub fn classes(&self, node: NodeId) -> &[String] {
        self.element(node).map(|el| el.classes.as_slice()).unwrap_or(&[])
    }

    pub fn text(&self, node: NodeId) -> &str {
        self.element(node).map(|el| el.text.as_str()).unwrap_or("")
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.element(node).map(|el| el.children.as_slice()).unwrap_or(&[])
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.element(node)?.parent
    }

    pub fn last_element_child(&self, node: NodeId) -> Option<NodeId> {
        self.children(node).last().copied()
    }

    pub fn is_attached(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            match self.nodes.get(id.0) {
                Some(el) if !el.detached => current = el.parent,
                _ => return false,
            }
        }
        true
    }

    pub fn get_by_id(&self, id: &str) -> Option<NodeId> {
        self.query(self.root(), &format!("#{id}"))
    }

    /// First descendant of `scope` matching a compound selector such as
    /// `a.dropdown-item[data-role="x"]`. `scope` itself is not tested.
    pub fn query(&self, scope: NodeId, selector: &str) -> Option<NodeId> {
        let selector = Selector::parse(selector)?;
        self.descendants(scope)
            .into_iter()
            .find(|node| selector.matches(self, *node))
    }

    pub fn query_all(&self, scope: NodeId, selector: &str) -> Vec<NodeId> {
        let Some(selector) = Selector::parse(selector) else {
            return Vec::new();
        };
        self.descendants(scope)
            .into_iter()
            .filter(|node| selector.matches(self, *node))
            .collect()
    }

    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) {
        let Some(el) = self.element_mut(node) else {
            return;
        };
        el.attrs.insert(name.to_string(), value.to_string());
        self.mutations.push(Mutation::SetAttribute {
            node,
            name: name.to_string(),
            value: value.to_string(),
        });
    }

    /// Adds or removes `class`; `force` picks the outcome, `None` flips it.
    /// Returns whether the class is present afterwards.
    pub fn toggle_class(&mut self, node: NodeId, class: &str, force: Option<bool>) -> bool {
        let Some(el) = self.element_mut(node) else {
            return false;
        };
        let has = el.classes.iter().any(|c| c == class);
        let present = force.unwrap_or(!has);
        if present && !has {
            el.classes.push(class.to_string());
        } else if !present && has {
            el.classes.retain(|c| c != class);
        }
        self.mutations.push(Mutation::ToggleClass {
            node,
            class: class.to_string(),
            present,
        });
        present
    }

    pub fn set_text(&mut self, node: NodeId, text: &str) {
        let Some(el) = self.element_mut(node) else {
            return;
        };
        text.clone_into(&mut el.text);
        self.mutations.push(Mutation::SetText {
            node,
            text: text.to_string(),
        });
    }

    /// Detaches `node` and its subtree. Ids stay valid but no longer match queries.
    pub fn remove(&mut self, node: NodeId) {
        if node == self.root() {
            return;
        }
        let Some(el) = self.element_mut(node) else {
            return;
        };
        el.detached = true;
        let parent = el.parent;
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(p.0)) {
            parent.children.retain(|child| *child != node);
        }
        self.mutations.push(Mutation::Remove { node });
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    pub fn touched_nodes(&self) -> BTreeSet<NodeId> {
        self.mutations.iter().map(Mutation::node).collect()
    }

    pub fn clear_mutations(&mut self) {
        self.mutations.clear();
    }

    fn element(&self, node: NodeId) -> Option<&Element> {
        if !self.is_attached(node) {
            return None;
        }
        self.nodes.get(node.0)
    }

    fn element_mut(&mut self, node: NodeId) -> Option<&mut Element> {
        if !self.is_attached(node) {
            return None;
        }
        self.nodes.get_mut(node.0)
    }

    fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(scope).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }
}

#[derive(Debug, Default)]
struct Selector {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, Option<String>)>,
}

impl Selector {
    fn parse(input: &str) -> Option<Selector> {
        let input = input.trim();
        if input.is_empty() {
            tracing::warn!("empty selector");
            return None;
        }

        let mut selector = Selector::default();
        let tag_end = input.find(['#', '.', '[']).unwrap_or(input.len());
        if tag_end > 0 {
            let tag = &input[..tag_end];
            if tag.contains(char::is_whitespace) {
                tracing::warn!(selector = input, "descendant selectors are not supported");
                return None;
            }
            selector.tag = Some(tag.to_ascii_lowercase());
        }

        let mut rest = &input[tag_end..];
        while let Some(first) = rest.chars().next() {
            match first {
                '#' | '.' => {
                    let body = &rest[1..];
                    let end = body.find(['#', '.', '[']).unwrap_or(body.len());
                    let name = &body[..end];
                    if name.is_empty() {
                        tracing::warn!(selector = input, "malformed selector");
                        return None;
                    }
                    if first == '#' {
                        selector.id = Some(name.to_string());
                    } else {
                        selector.classes.push(name.to_string());
                    }
                    rest = &body[end..];
                }
                '[' => {
                    let Some(end) = rest.find(']') else {
                        tracing::warn!(selector = input, "unterminated attribute selector");
                        return None;
                    };
                    let inner = &rest[1..end];
                    let attr = match inner.split_once('=') {
                        Some((name, value)) => (
                            name.trim().to_string(),
                            Some(value.trim().trim_matches(['"', '\'']).to_string()),
                        ),
                        None => (inner.trim().to_string(), None),
                    };
                    selector.attrs.push(attr);
                    rest = &rest[end + 1..];
                }
                _ => {
                    tracing::warn!(selector = input, "malformed selector");
                    return None;
                }
            }
        }
        Some(selector)
    }

    fn matches(&self, dom: &Dom, node: NodeId) -> bool {
        if let Some(tag) = &self.tag {
            if dom.tag(node) != Some(tag.as_str()) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if dom.attr(node, "id") != Some(id.as_str()) {
                return false;
            }
        }
        self.classes.iter().all(|class| dom.has_class(node, class))
            && self.attrs.iter().all(|(name, value)| match value {
                Some(value) => dom.attr(node, name) == Some(value.as_str()),
                None => dom.attr(node, name).is_some(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Dom, NodeId) {
        let mut dom = Dom::new();
        let menu = dom.append(
            dom.root(),
            El::new("div").id("menu").class("dropdown").children([
                El::new("a")
                    .class("dropdown-item")
                    .attr("data-size", "12px")
                    .child(El::new("i").class("icon-empty")),
                El::new("a")
                    .class("dropdown-item active")
                    .attr("data-size", "16px")
                    .child(El::new("i").class("icon-check")),
            ]),
        );
        (dom, menu)
    }

    #[test]
    fn compound_selectors() {
        let (dom, menu) = sample();

        assert_eq!(dom.get_by_id("menu"), Some(menu));
        assert_eq!(dom.query_all(menu, ".dropdown-item").len(), 2);
        let item = dom.query(menu, r#"a.dropdown-item[data-size="16px"]"#).unwrap();
        assert!(dom.has_class(item, "active"));
        assert_eq!(dom.query(menu, "[data-size]"), dom.query(menu, "a"));
        assert_eq!(dom.query(menu, "#menu"), None);
        assert_eq!(dom.query(menu, "div a"), None);
    }

    #[test]
    fn building_is_not_logged_but_writes_are() {
        let (mut dom, menu) = sample();
        assert!(dom.mutations().is_empty());

        let icon = dom.query(menu, ".icon-empty").unwrap();
        assert!(dom.toggle_class(icon, "icon-check", Some(true)));
        assert!(!dom.toggle_class(icon, "icon-empty", Some(false)));
        dom.set_text(menu, "x");

        assert_eq!(dom.classes(icon), ["icon-check".to_string()]);
        assert_eq!(dom.touched_nodes(), BTreeSet::from([menu, icon]));
        assert_eq!(dom.mutations().len(), 3);

        dom.clear_mutations();
        assert!(dom.touched_nodes().is_empty());
    }

    #[test]
    fn removed_subtrees_stop_matching() {
        let (mut dom, menu) = sample();
        let icon = dom.query(menu, ".icon-check").unwrap();

        dom.remove(menu);

        assert!(!dom.is_attached(icon));
        assert_eq!(dom.get_by_id("menu"), None);
        dom.set_text(icon, "ignored");
        assert_eq!(dom.mutations(), [Mutation::Remove { node: menu }]);
    }
}
