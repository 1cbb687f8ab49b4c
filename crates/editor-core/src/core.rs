use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::ops::Range;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::events::{EditorEvent, EventBus, EventKind, Listener, ListenerId};
use crate::extension::{CommandError, ExtensionRegistry, QueryError};
use crate::ops::{Op, Path, Transaction};
use crate::search::SearchState;
use crate::tree::{PathError, children_mut, clamp_to_char_boundary, node_mut};

pub type Attrs = BTreeMap<String, serde_json::Value>;
pub type ElementKind = String;

/// Root of an editable document: a list of top-level blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Document {
    #[serde(default)]
    pub children: Vec<Node>,
}

impl Document {
    /// A document holding one empty paragraph, the smallest shape the schema accepts.
    pub fn empty() -> Self {
        Self {
            children: vec![Node::paragraph("")],
        }
    }

    /// Applies one op and reports how positions around it moved.
    fn apply_op(&mut self, op: Op) -> Result<(Op, Shift), ApplyError> {
        let applied = match op {
            Op::InsertText { path, offset, text } => {
                let leaf = self.text_leaf(&path)?;
                let at = clamp_to_char_boundary(&leaf.text, offset);
                leaf.text.insert_str(at, &text);
                let len = text.len();
                let inverse = Op::RemoveText {
                    path: path.clone(),
                    range: at..at + len,
                };
                (inverse, Shift::TextInserted { path, at, len })
            }
            Op::RemoveText { path, range } => {
                let leaf = self.text_leaf(&path)?;
                let start = clamp_to_char_boundary(&leaf.text, range.start);
                let end = clamp_to_char_boundary(&leaf.text, range.end).max(start);
                let removed: String = leaf.text.drain(start..end).collect();
                let inverse = Op::InsertText {
                    path: path.clone(),
                    offset: start,
                    text: removed,
                };
                let shift = if start == end {
                    Shift::Nothing
                } else {
                    Shift::TextRemoved {
                        path,
                        range: start..end,
                    }
                };
                (inverse, shift)
            }
            Op::InsertNode { path, node } => {
                let (index, siblings) = self.siblings_of(&path)?;
                if index > siblings.len() {
                    return Err(ApplyError::InvalidPath(format!(
                        "cannot insert at {index}, parent holds {} nodes",
                        siblings.len()
                    )));
                }
                siblings.insert(index, node);
                (Op::RemoveNode { path: path.clone() }, Shift::NodeInserted { path })
            }
            Op::RemoveNode { path } => {
                let (index, siblings) = self.siblings_of(&path)?;
                if index >= siblings.len() {
                    return Err(ApplyError::InvalidPath(format!(
                        "nothing to remove at {index}, parent holds {} nodes",
                        siblings.len()
                    )));
                }
                let removed = siblings.remove(index);
                // A text leaf folded into an equal-marked left neighbour keeps its characters
                // addressable from that neighbour.
                let joined_left = match (&removed, index.checked_sub(1).and_then(|left| siblings.get(left))) {
                    (Node::Text(gone), Some(Node::Text(left)))
                        if left.marks == gone.marks && left.text.ends_with(&gone.text) =>
                    {
                        Some((left.text.len() - gone.text.len(), gone.text.len()))
                    }
                    _ => None,
                };
                let inverse = Op::InsertNode {
                    path: path.clone(),
                    node: removed,
                };
                (inverse, Shift::NodeRemoved { path, joined_left })
            }
            Op::SetNodeAttrs { path, patch } => {
                let attrs = match node_mut(self, &path)? {
                    Node::Element(el) => &mut el.attrs,
                    Node::Void(void) => &mut void.attrs,
                    Node::Text(_) => {
                        return Err(ApplyError::InvalidPath(format!("{path:?} is a text leaf without attrs")));
                    }
                };
                let restore = patch.apply_to(attrs);
                (Op::SetNodeAttrs { path, patch: restore }, Shift::Nothing)
            }
            Op::SetTextMarks { path, marks } => {
                let leaf = self.text_leaf(&path)?;
                let previous = std::mem::replace(&mut leaf.marks, marks);
                (Op::SetTextMarks { path, marks: previous }, Shift::Nothing)
            }
        };
        Ok(applied)
    }

    fn text_leaf(&mut self, path: &[usize]) -> Result<&mut TextNode, ApplyError> {
        match node_mut(self, path)? {
            Node::Text(leaf) => Ok(leaf),
            _ => Err(ApplyError::InvalidPath(format!("{path:?} is not a text leaf"))),
        }
    }

    fn siblings_of(&mut self, path: &[usize]) -> Result<(usize, &mut Vec<Node>), ApplyError> {
        let (&index, parent) = path
            .split_last()
            .ok_or_else(|| ApplyError::InvalidPath("node ops need a non-empty path".into()))?;
        let siblings = children_mut(self, parent)
            .ok_or_else(|| ApplyError::InvalidPath(format!("{parent:?} cannot hold children")))?;
        Ok((index, siblings))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    Element(ElementNode),
    Text(TextNode),
    Void(VoidNode),
}

impl Node {
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::element("paragraph", Attrs::default(), vec![Node::text(text, Marks::default())])
    }

    pub fn text(text: impl Into<String>, marks: Marks) -> Self {
        Node::Text(TextNode {
            text: text.into(),
            marks,
        })
    }

    pub fn element(kind: impl Into<String>, attrs: Attrs, children: Vec<Node>) -> Self {
        Node::Element(ElementNode {
            kind: kind.into(),
            attrs,
            children,
        })
    }

    pub fn void(kind: impl Into<String>, attrs: Attrs) -> Self {
        Node::Void(VoidNode {
            kind: kind.into(),
            attrs,
        })
    }

    pub fn horizontal_rule() -> Self {
        Self::void("horizontal_rule", Attrs::default())
    }

    pub fn hard_break() -> Self {
        Self::void("hard_break", Attrs::default())
    }

    pub fn as_element(&self) -> Option<&ElementNode> {
        if let Node::Element(el) = self { Some(el) } else { None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementNode {
    pub kind: ElementKind,
    #[serde(default)]
    pub attrs: Attrs,
    #[serde(default)]
    pub children: Vec<Node>,
}

impl ElementNode {
    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(Value::as_str)
    }

    pub fn attr_u64(&self, key: &str) -> Option<u64> {
        self.attrs.get(key).and_then(Value::as_u64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoidNode {
    pub kind: ElementKind,
    #[serde(default)]
    pub attrs: Attrs,
}

impl VoidNode {
    /// Text a void contributes to plain-text views such as word counting.
    pub fn inline_text(&self) -> &'static str {
        if self.kind == "hard_break" { "\n" } else { " " }
    }

    /// Every inline void occupies one offset unit inside its block.
    pub fn inline_text_len(&self) -> usize {
        1
    }

    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextNode {
    pub text: String,
    #[serde(default)]
    pub marks: Marks,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkMark {
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Inline formatting carried by a text leaf. Flags map to tags, the optional
/// strings to inline `style` declarations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Marks {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strike: bool,
    pub superscript: bool,
    pub subscript: bool,
    pub code: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<LinkMark>,
}

impl Marks {
    /// Whether a `<span style>` wrapper is needed for this leaf.
    pub fn has_text_style(&self) -> bool {
        [&self.font_family, &self.font_size, &self.color]
            .iter()
            .any(|style| style.is_some())
    }
}

/// How one applied op moved the positions around it.
#[derive(Debug)]
enum Shift {
    Nothing,
    TextInserted { path: Path, at: usize, len: usize },
    TextRemoved { path: Path, range: Range<usize> },
    NodeInserted { path: Path },
    /// `joined_left` holds the neighbour offset where the removed leaf's text begins and its length.
    NodeRemoved { path: Path, joined_left: Option<(usize, usize)> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    #[serde(default)]
    pub path: Path,
    pub offset: usize,
}

impl Point {
    pub fn new(path: Path, offset: usize) -> Self {
        Self { path, offset }
    }

    /// Index this point descends through directly below `parent`, if it lies inside it.
    fn index_below(&self, parent: &[usize]) -> Option<usize> {
        if self.path.len() > parent.len() && self.path.starts_with(parent) {
            Some(self.path[parent.len()])
        } else {
            None
        }
    }

    fn rebase(&mut self, shift: &Shift) {
        match shift {
            Shift::Nothing => {}
            // A point exactly at the insertion offset stays put; commands that type at
            // the caret pass their own selection_after.
            Shift::TextInserted { path, at, len } => {
                if self.path == *path && self.offset > *at {
                    self.offset += len;
                }
            }
            Shift::TextRemoved { path, range } => {
                if self.path == *path && self.offset > range.start {
                    self.offset = if self.offset >= range.end {
                        self.offset - range.len()
                    } else {
                        range.start
                    };
                }
            }
            Shift::NodeInserted { path } => {
                let Some((&index, parent)) = path.split_last() else {
                    return;
                };
                if self.index_below(parent).is_some_and(|ix| ix >= index) {
                    self.path[parent.len()] += 1;
                }
            }
            Shift::NodeRemoved { path, joined_left } => {
                let Some((&index, parent)) = path.split_last() else {
                    return;
                };
                let depth = parent.len();
                let Some(ix) = self.index_below(parent) else {
                    return;
                };
                match ix.cmp(&index) {
                    Ordering::Less => {}
                    Ordering::Greater => self.path[depth] = ix - 1,
                    Ordering::Equal => {
                        self.path.truncate(depth + 1);
                        self.path[depth] = index.saturating_sub(1);
                        self.offset = match joined_left {
                            Some((start, len)) => start + self.offset.min(*len),
                            None => 0,
                        };
                    }
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: Point,
    pub focus: Point,
}

impl Selection {
    pub fn new(anchor: Point, focus: Point) -> Self {
        Self { anchor, focus }
    }

    pub fn collapsed(point: Point) -> Self {
        Self::new(point.clone(), point)
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    fn rebase(&mut self, shift: &Shift) {
        self.anchor.rebase(shift);
        self.focus.rebase(shift);
    }
}

/// One undoable step: the ops that revert it plus the selections on either side.
#[derive(Debug, Clone)]
pub struct UndoRecord {
    pub inverse_ops: Vec<Op>,
    pub selection_before: Selection,
    pub selection_after: Selection,
}

#[derive(Debug, Default)]
struct History {
    done: Vec<UndoRecord>,
    undone: Vec<UndoRecord>,
}

impl History {
    fn record(&mut self, entry: UndoRecord, limit: usize) {
        self.undone.clear();
        self.done.push(entry);
        if self.done.len() > limit {
            let overflow = self.done.len() - limit;
            self.done.drain(..overflow);
        }
    }
}

/// Engine limits. Zero means "use the built-in default".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub max_undo: usize,
    pub max_normalize_iterations: usize,
}

impl EditorConfig {
    const DEFAULT_MAX_UNDO: usize = 200;
    const DEFAULT_NORMALIZE_PASSES: usize = 100;

    fn resolved(self) -> Self {
        let or_default = |value: usize, default: usize| if value == 0 { default } else { value };
        Self {
            max_undo: or_default(self.max_undo, Self::DEFAULT_MAX_UNDO),
            max_normalize_iterations: or_default(self.max_normalize_iterations, Self::DEFAULT_NORMALIZE_PASSES),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApplyError {
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("normalization did not converge")]
    NormalizeDidNotConverge,
}

impl From<PathError> for ApplyError {
    fn from(value: PathError) -> Self {
        ApplyError::InvalidPath(value.0)
    }
}

/// Document, selection and history behind one editing surface.
///
/// Every mutation goes through [`Editor::apply`], which is atomic: a failing op
/// leaves the document and selection untouched and emits no event.
pub struct Editor {
    pub(crate) doc: Document,
    pub(crate) selection: Selection,
    pub(crate) registry: ExtensionRegistry,
    config: EditorConfig,
    history: History,
    pub(crate) options: BTreeMap<String, Value>,
    pub(crate) search: SearchState,
    events: EventBus,
    transaction_seq: u64,
}

impl Editor {
    pub fn new(doc: Document, selection: Selection, registry: ExtensionRegistry) -> Self {
        Self::with_config(doc, selection, registry, EditorConfig::default())
    }

    pub fn with_config(
        doc: Document,
        selection: Selection,
        registry: ExtensionRegistry,
        config: EditorConfig,
    ) -> Self {
        let options = registry.default_options();
        let mut editor = Self {
            doc,
            selection,
            registry,
            config: config.resolved(),
            history: History::default(),
            options,
            search: SearchState::default(),
            events: EventBus::default(),
            transaction_seq: 0,
        };
        editor.normalize_in_place();
        editor
    }

    fn blank(registry: ExtensionRegistry) -> Self {
        Self::new(
            Document::empty(),
            Selection::collapsed(Point::new(vec![0, 0], 0)),
            registry,
        )
    }

    pub fn with_core_extensions() -> Self {
        Self::blank(ExtensionRegistry::core())
    }

    pub fn with_wysiwyg_extensions() -> Self {
        Self::blank(ExtensionRegistry::wysiwyg())
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Moves the selection without touching the document or the history.
    pub fn set_selection(&mut self, selection: Selection) {
        let next = self.registry.normalize_selection(&self.doc, &selection);
        if next != self.selection {
            self.selection = next;
            self.dispatch_events(Some("selection".to_string()), true, false, false);
        }
    }

    pub fn registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn search(&self) -> &SearchState {
        &self.search
    }

    pub fn on(&mut self, kind: EventKind, listener: Listener) -> ListenerId {
        self.events.on(kind, listener)
    }

    pub fn off(&mut self, id: ListenerId) -> bool {
        self.events.off(id)
    }

    pub fn listener_count(&self) -> usize {
        self.events.len()
    }

    pub fn extension_options(&self, name: &str) -> Option<&Value> {
        self.options.get(name)
    }

    /// Returns `false` when no registered extension carries options under `name`.
    pub fn configure_extension(&mut self, name: &str, update: impl FnOnce(&mut Value)) -> bool {
        match self.options.get_mut(name) {
            Some(options) => update(options),
            None => return false,
        }
        self.notify_state_change(format!("configure:{name}"));
        true
    }

    pub fn extension_enabled(&self, name: &str) -> bool {
        self.options
            .get(name)
            .and_then(|options| options.get("enabled"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn can_undo(&self) -> bool {
        !self.history.done.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.history.undone.is_empty()
    }

    pub fn undo(&mut self) -> bool {
        self.step_history(false)
    }

    pub fn redo(&mut self) -> bool {
        self.step_history(true)
    }

    fn step_history(&mut self, forward: bool) -> bool {
        let popped = if forward {
            self.history.undone.pop()
        } else {
            self.history.done.pop()
        };
        let Some(record) = popped else {
            return false;
        };

        let landing = if forward {
            record.selection_after.clone()
        } else {
            record.selection_before.clone()
        };
        match self.replay(record.inverse_ops, landing) {
            Ok(inverse_ops) => {
                let flipped = UndoRecord {
                    inverse_ops,
                    selection_before: record.selection_before,
                    selection_after: record.selection_after,
                };
                if forward {
                    self.history.done.push(flipped);
                } else {
                    self.history.undone.push(flipped);
                }
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, redo = forward, "history entry could not be replayed");
                false
            }
        }
    }

    fn replay(&mut self, ops: Vec<Op>, landing: Selection) -> Result<Vec<Op>, ApplyError> {
        let before = self.selection.clone();
        let mut doc = self.doc.clone();
        // History entries carry their own selection; transforms only need somewhere to go.
        let mut scratch = before.clone();
        let mut inverse = Vec::new();
        apply_all(&mut doc, &mut scratch, ops, &mut inverse)?;
        inverse.reverse();

        let mut selection = landing;
        self.normalize_into(&mut doc, &mut selection)?;
        self.commit(doc, selection);
        self.refresh_search();

        let moved = self.selection != before;
        self.dispatch_events(Some("history".to_string()), moved, true, true);
        Ok(inverse)
    }

    /// Applies every op of `tx` or none of them.
    pub fn apply(&mut self, tx: Transaction) -> Result<(), ApplyError> {
        let Transaction {
            ops,
            selection_after,
            meta,
        } = tx;
        let before = self.selection.clone();
        let mut doc = self.doc.clone();
        let mut selection = before.clone();

        let mut inverse = Vec::new();
        apply_all(&mut doc, &mut selection, ops, &mut inverse)?;
        if let Some(explicit) = selection_after {
            selection = explicit;
        }
        inverse.extend(self.normalize_into(&mut doc, &mut selection)?);
        inverse.reverse();

        let doc_changed = doc != self.doc;
        self.commit(doc, selection);
        let selection_changed = self.selection != before;

        if doc_changed {
            if meta.add_to_history {
                let entry = UndoRecord {
                    inverse_ops: inverse,
                    selection_before: before,
                    selection_after: self.selection.clone(),
                };
                self.history.record(entry, self.config.max_undo);
            }
            self.refresh_search();
        }

        self.dispatch_events(meta.source, selection_changed, doc_changed, meta.emit_update);
        Ok(())
    }

    pub fn run_command(&mut self, id: &str, args: Option<Value>) -> Result<(), CommandError> {
        let handler = self
            .registry
            .command(id)
            .map(|command| command.handler)
            .ok_or_else(|| CommandError::Unknown(id.to_string()))?;
        tracing::trace!(command = id, "running command");
        handler(self, args)
    }

    pub fn run_query_json(&self, id: &str, args: Option<Value>) -> Result<Value, QueryError> {
        let query = self
            .registry
            .query(id)
            .ok_or_else(|| QueryError::new(format!("no query registered as {id}")))?;
        (query.handler)(self, args)
    }

    pub fn run_query<T: DeserializeOwned>(&self, id: &str, args: Option<Value>) -> Result<T, QueryError> {
        let value = self.run_query_json(id, args)?;
        serde_json::from_value(value).map_err(|err| QueryError::new(format!("query {id} returned {err}")))
    }

    /// Emits a bare `Transaction` event for state that lives outside the document.
    pub(crate) fn notify_state_change(&mut self, source: String) {
        self.dispatch_events(Some(source), false, false, false);
    }

    pub(crate) fn refresh_search(&mut self) {
        let search = &mut self.search;
        if search.search_term.is_empty() {
            search.results.clear();
            search.result_index = 0;
            return;
        }
        search.results =
            crate::search::find_matches(&self.doc, &self.registry, &search.search_term, search.case_sensitive);
        if search.result_index >= search.results.len() {
            search.result_index = 0;
        }
    }

    fn commit(&mut self, doc: Document, selection: Selection) {
        self.selection = self.registry.normalize_selection(&doc, &selection);
        self.doc = doc;
    }

    fn dispatch_events(&mut self, source: Option<String>, selection_changed: bool, doc_changed: bool, emit_update: bool) {
        self.transaction_seq += 1;
        let transaction = self.transaction_seq;

        let kinds = std::iter::once(EventKind::Transaction)
            .chain(selection_changed.then_some(EventKind::SelectionUpdate))
            .chain((doc_changed && emit_update).then_some(EventKind::Update));
        for kind in kinds {
            self.events.emit(&EditorEvent {
                kind,
                transaction,
                source: source.clone(),
            });
        }
    }

    fn normalize_in_place(&mut self) {
        let mut doc = std::mem::take(&mut self.doc);
        let mut selection = self.selection.clone();
        if let Err(err) = self.normalize_into(&mut doc, &mut selection) {
            tracing::warn!(error = %err, "initial document normalization failed");
        }
        self.commit(doc, selection);
    }

    /// Runs normalizer passes until one produces no ops, returning their inverses.
    fn normalize_into(&self, doc: &mut Document, selection: &mut Selection) -> Result<Vec<Op>, ApplyError> {
        let mut inverse = Vec::new();
        for _ in 0..self.config.max_normalize_iterations {
            let fixes = self.registry.normalize(doc);
            if fixes.is_empty() {
                return Ok(inverse);
            }
            apply_all(doc, selection, fixes, &mut inverse)?;
        }
        Err(ApplyError::NormalizeDidNotConverge)
    }
}

fn apply_all(
    doc: &mut Document,
    selection: &mut Selection,
    ops: impl IntoIterator<Item = Op>,
    inverse: &mut Vec<Op>,
) -> Result<(), ApplyError> {
    for op in ops {
        let (undo, shift) = doc.apply_op(op)?;
        selection.rebase(&shift);
        inverse.push(undo);
    }
    Ok(())
}

/// Attribute edit: keys to overwrite and keys to drop.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttrPatch {
    #[serde(default)]
    pub set: Attrs,
    #[serde(default)]
    pub remove: Vec<String>,
}

impl AttrPatch {
    pub fn set(key: impl Into<String>, value: Value) -> Self {
        Self {
            set: Attrs::from([(key.into(), value)]),
            remove: Vec::new(),
        }
    }

    pub fn remove(key: impl Into<String>) -> Self {
        Self {
            set: Attrs::default(),
            remove: vec![key.into()],
        }
    }

    /// Applies the patch to `attrs` and returns the patch that restores them.
    fn apply_to(&self, attrs: &mut Attrs) -> AttrPatch {
        let mut restore = AttrPatch::default();
        for (key, value) in &self.set {
            match attrs.insert(key.clone(), value.clone()) {
                Some(previous) => {
                    restore.set.insert(key.clone(), previous);
                }
                None => restore.remove.push(key.clone()),
            }
        }
        for key in &self.remove {
            if let Some(previous) = attrs.remove(key) {
                restore.set.insert(key.clone(), previous);
            }
        }
        restore
    }
}
