//! Extension surface: schema specs, normalizer passes, named commands and queries.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{ApplyError, Document, Editor, Node, Point, Selection};
use crate::html::HtmlError;
use crate::ops::{Op, Transaction};
use crate::tree::{children_at_path, first_text_in, first_text_point};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("unknown command: {0}")]
    Unknown(String),
    #[error("{0}")]
    Rejected(String),
    #[error("invalid content: {0}")]
    InvalidContent(#[from] HtmlError),
    #[error("failed to apply transaction: {0}")]
    Apply(#[from] ApplyError),
}

impl CommandError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct QueryError {
    message: String,
}

impl QueryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

pub type CommandHandler = Arc<dyn Fn(&mut Editor, Option<Value>) -> Result<(), CommandError> + Send + Sync>;
pub type QueryHandler = Arc<dyn Fn(&Editor, Option<Value>) -> Result<Value, QueryError> + Send + Sync>;

/// A named editor command with the metadata a command palette would list.
#[derive(Clone)]
pub struct CommandSpec {
    pub id: String,
    pub label: String,
    pub description: Option<String>,
    pub keywords: Vec<String>,
    pub args_example: Option<Value>,
    pub handler: CommandHandler,
}

impl CommandSpec {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        handler: impl Fn(&mut Editor, Option<Value>) -> Result<(), CommandError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: None,
            keywords: Vec::new(),
            args_example: None,
            handler: Arc::new(handler),
        }
    }

    /// A command whose handler only builds a transaction; an empty one is a successful no-op.
    pub fn transaction(
        id: impl Into<String>,
        label: impl Into<String>,
        build: impl Fn(&Editor, Option<&Value>) -> Result<Transaction, String> + Send + Sync + 'static,
    ) -> Self {
        let id = id.into();
        let source = format!("command:{id}");
        Self::new(id, label, move |editor, args| {
            let mut tx = build(editor, args.as_ref()).map_err(CommandError::Rejected)?;
            if tx.is_noop() {
                return Ok(());
            }
            tx.meta.source.get_or_insert_with(|| source.clone());
            Ok(editor.apply(tx)?)
        })
    }

    pub fn description(self, description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            ..self
        }
    }

    pub fn keywords<S: Into<String>>(self, keywords: impl IntoIterator<Item = S>) -> Self {
        Self {
            keywords: keywords.into_iter().map(Into::into).collect(),
            ..self
        }
    }

    pub fn args_example(self, args_example: Value) -> Self {
        Self {
            args_example: Some(args_example),
            ..self
        }
    }
}

#[derive(Clone)]
pub struct QuerySpec {
    pub id: String,
    pub handler: QueryHandler,
}

impl QuerySpec {
    pub fn new(
        id: impl Into<String>,
        handler: impl Fn(&Editor, Option<Value>) -> Result<Value, QueryError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            handler: Arc::new(handler),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeRole {
    Block,
    Inline,
}

/// What an element may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChildConstraint {
    None,
    BlockOnly,
    InlineOnly,
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub kind: String,
    pub role: NodeRole,
    pub is_void: bool,
    pub children: ChildConstraint,
}

impl NodeSpec {
    fn block(kind: &str, children: ChildConstraint) -> Self {
        Self {
            kind: kind.to_string(),
            role: NodeRole::Block,
            is_void: false,
            children,
        }
    }

    /// A block holding inline content, such as a paragraph or heading.
    pub fn text_block(kind: &str) -> Self {
        Self::block(kind, ChildConstraint::InlineOnly)
    }

    /// A block holding other blocks, such as a list or table cell.
    pub fn container(kind: &str) -> Self {
        Self::block(kind, ChildConstraint::BlockOnly)
    }

    pub fn void(kind: &str, role: NodeRole) -> Self {
        Self {
            kind: kind.to_string(),
            role,
            is_void: true,
            children: ChildConstraint::None,
        }
    }
}

/// One normalization rule. Returning no ops means the document already satisfies it.
pub trait NormalizePass: Send + Sync {
    fn id(&self) -> &'static str;
    fn run(&self, doc: &Document, registry: &ExtensionRegistry) -> Vec<Op>;
}

pub trait Extension: Send + Sync {
    fn name(&self) -> &'static str;
    fn node_specs(&self) -> Vec<NodeSpec> {
        Vec::new()
    }
    /// Options stored on the editor under [`Extension::name`], adjustable at runtime.
    fn default_options(&self) -> Option<Value> {
        None
    }
    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        Vec::new()
    }
    fn commands(&self) -> Vec<CommandSpec> {
        Vec::new()
    }
    fn queries(&self) -> Vec<QuerySpec> {
        Vec::new()
    }
}

#[derive(Default)]
pub struct ExtensionRegistry {
    extension_names: Vec<&'static str>,
    node_specs: HashMap<String, NodeSpec>,
    normalize_passes: Vec<Box<dyn NormalizePass>>,
    commands: HashMap<String, CommandSpec>,
    queries: HashMap<String, QuerySpec>,
    default_options: BTreeMap<String, Value>,
}

impl ExtensionRegistry {
    pub fn new(extensions: impl IntoIterator<Item = Box<dyn Extension>>) -> Result<Self, String> {
        extensions.into_iter().try_fold(Self::default(), |mut registry, extension| {
            registry.register_extension(extension)?;
            Ok(registry)
        })
    }

    pub fn core() -> Self {
        Self::from_builtin(crate::extensions::core_extensions())
    }

    pub fn wysiwyg() -> Self {
        Self::from_builtin(crate::extensions::wysiwyg_extensions())
    }

    /// Built-in sets are fixed, so a clash is logged and the later extension skipped.
    fn from_builtin(extensions: Vec<Box<dyn Extension>>) -> Self {
        let mut registry = Self::default();
        for extension in extensions {
            let name = extension.name();
            if let Err(err) = registry.register_extension(extension) {
                tracing::error!(extension = name, error = %err, "built-in extension rejected");
            }
        }
        registry
    }

    /// Adds everything `extension` contributes, refusing any id another extension already owns.
    pub fn register_extension(&mut self, extension: Box<dyn Extension>) -> Result<(), String> {
        let name = extension.name();
        let specs = extension.node_specs();
        let commands = extension.commands();
        let queries = extension.queries();

        let clash = if self.has_extension(name) {
            Some(format!("extension name {name}"))
        } else if let Some(spec) = specs.iter().find(|spec| self.node_specs.contains_key(&spec.kind)) {
            Some(format!("node kind {}", spec.kind))
        } else if let Some(command) = commands.iter().find(|command| self.commands.contains_key(&command.id)) {
            Some(format!("command {}", command.id))
        } else {
            queries
                .iter()
                .find(|query| self.queries.contains_key(&query.id))
                .map(|query| format!("query {}", query.id))
        };
        if let Some(clash) = clash {
            return Err(format!("{name}: {clash} is already registered"));
        }

        self.extension_names.push(name);
        self.node_specs
            .extend(specs.into_iter().map(|spec| (spec.kind.clone(), spec)));
        self.normalize_passes.extend(extension.normalize_passes());
        self.commands
            .extend(commands.into_iter().map(|command| (command.id.clone(), command)));
        self.queries
            .extend(queries.into_iter().map(|query| (query.id.clone(), query)));
        if let Some(options) = extension.default_options() {
            self.default_options.insert(name.to_string(), options);
        }
        Ok(())
    }

    pub fn extension_names(&self) -> &[&'static str] {
        &self.extension_names
    }

    pub fn has_extension(&self, name: &str) -> bool {
        self.extension_names.contains(&name)
    }

    pub fn default_options(&self) -> BTreeMap<String, Value> {
        self.default_options.clone()
    }

    pub fn node_specs(&self) -> &HashMap<String, NodeSpec> {
        &self.node_specs
    }

    pub fn normalize_passes(&self) -> &[Box<dyn NormalizePass>] {
        &self.normalize_passes
    }

    pub fn commands(&self) -> &HashMap<String, CommandSpec> {
        &self.commands
    }

    pub fn command(&self, id: &str) -> Option<CommandSpec> {
        self.commands.get(id).cloned()
    }

    pub fn queries(&self) -> &HashMap<String, QuerySpec> {
        &self.queries
    }

    pub fn query(&self, id: &str) -> Option<QuerySpec> {
        self.queries.get(id).cloned()
    }

    pub fn is_known_kind(&self, kind: &str) -> bool {
        self.node_specs.contains_key(kind)
    }

    /// Ops of the first pass that still has work; the editor repeats until every pass is quiet.
    pub fn normalize(&self, doc: &Document) -> Vec<Op> {
        self.normalize_passes
            .iter()
            .map(|pass| pass.run(doc, self))
            .find(|ops| !ops.is_empty())
            .unwrap_or_default()
    }

    /// Moves both ends of `selection` onto text leaves that exist in `doc`.
    pub fn normalize_selection(&self, doc: &Document, selection: &Selection) -> Selection {
        let anchor = resolve_caret(doc, &selection.anchor)
            .or_else(|| resolve_caret(doc, &selection.focus))
            .or_else(|| first_text_point(doc))
            .unwrap_or_else(|| Point::new(vec![0], 0));
        let focus = resolve_caret(doc, &selection.focus).unwrap_or_else(|| anchor.clone());
        Selection::new(anchor, focus)
    }
}

/// Clamps `point` index by index onto the closest text leaf.
fn resolve_caret(doc: &Document, point: &Point) -> Option<Point> {
    if point.path.is_empty() {
        return None;
    }

    let mut path = Vec::with_capacity(point.path.len());
    let mut level: &[Node] = &doc.children;
    let mut landed: Option<&Node> = None;
    for &wanted in &point.path {
        let Some(last) = level.len().checked_sub(1) else {
            break;
        };
        let ix = wanted.min(last);
        path.push(ix);
        let node = &level[ix];
        landed = Some(node);
        match node {
            Node::Text(_) => break,
            Node::Element(el) => level = &el.children,
            Node::Void(_) => break,
        }
    }

    match landed? {
        Node::Text(leaf) => Some(Point::new(path, point.offset.min(leaf.text.len()))),
        Node::Element(el) => first_text_in(&el.children, path),
        // Voids hold no caret: take the first text in a later sibling element.
        Node::Void(_) => {
            let (&ix, parent) = path.split_last()?;
            children_at_path(doc, parent)?
                .iter()
                .enumerate()
                .skip(ix + 1)
                .find_map(|(next, node)| {
                    let mut at = parent.to_vec();
                    at.push(next);
                    first_text_in(&node.as_element()?.children, at)
                })
        }
    }
}

fn arg<'a>(args: Option<&'a Value>, key: &str) -> Option<&'a Value> {
    args.and_then(|args| args.get(key))
}

pub(crate) fn arg_str(args: Option<&Value>, key: &str) -> Result<String, String> {
    arg_opt_str(args, key).ok_or_else(|| format!("Missing args.{key}"))
}

pub(crate) fn arg_opt_str(args: Option<&Value>, key: &str) -> Option<String> {
    arg(args, key).and_then(Value::as_str).map(str::to_string)
}

pub(crate) fn arg_u64(args: Option<&Value>, key: &str) -> Result<u64, String> {
    arg(args, key)
        .and_then(Value::as_u64)
        .ok_or_else(|| format!("Missing args.{key}"))
}

pub(crate) fn arg_bool(args: Option<&Value>, key: &str, default: bool) -> bool {
    arg(args, key).and_then(Value::as_bool).unwrap_or(default)
}
