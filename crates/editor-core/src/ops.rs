use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::core::{AttrPatch, Document, Marks, Node, Selection};

/// Child indices from the document root down to a node.
pub type Path = Vec<usize>;

/// A primitive document edit. Applying one yields its inverse, which is what history stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    InsertText {
        #[serde(default)]
        path: Path,
        offset: usize,
        text: String,
    },
    RemoveText {
        #[serde(default)]
        path: Path,
        range: Range<usize>,
    },
    InsertNode {
        #[serde(default)]
        path: Path,
        node: Node,
    },
    RemoveNode {
        #[serde(default)]
        path: Path,
    },
    SetNodeAttrs {
        #[serde(default)]
        path: Path,
        patch: AttrPatch,
    },
    SetTextMarks {
        #[serde(default)]
        path: Path,
        marks: Marks,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionMeta {
    /// Free-form origin tag copied onto every event the transaction emits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub add_to_history: bool,
    /// When false the transaction still mutates the document but no `Update` event fires.
    pub emit_update: bool,
}

impl Default for TransactionMeta {
    fn default() -> Self {
        Self {
            source: None,
            add_to_history: true,
            emit_update: true,
        }
    }
}

/// Ops applied together, plus an optional explicit selection to land on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transaction {
    pub ops: Vec<Op>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection_after: Option<Selection>,
    pub meta: TransactionMeta,
}

impl Transaction {
    pub fn new(ops: Vec<Op>) -> Self {
        Self {
            ops,
            ..Self::default()
        }
    }

    /// Ops that turn `old` into `new` by replacing the changed run of top-level blocks.
    pub fn replace_document(old: &Document, new: &Document) -> Self {
        Self::new(changed_blocks(&old.children, &new.children))
    }

    pub fn selection_after(self, selection_after: Selection) -> Self {
        Self {
            selection_after: Some(selection_after),
            ..self
        }
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.meta.source = Some(source.into());
        self
    }

    pub fn without_update_event(mut self) -> Self {
        self.meta.emit_update = false;
        self
    }

    pub fn is_noop(&self) -> bool {
        self.ops.is_empty() && self.selection_after.is_none()
    }
}

/// Removes the differing middle of `old` back to front, then inserts the middle of `new`.
fn changed_blocks(old: &[Node], new: &[Node]) -> Vec<Op> {
    let shared_head = old.iter().zip(new).take_while(|(a, b)| a == b).count();
    let shared_tail = old[shared_head..]
        .iter()
        .rev()
        .zip(new[shared_head..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let removed = (shared_head..old.len() - shared_tail)
        .rev()
        .map(|ix| Op::RemoveNode { path: vec![ix] });
    let inserted = new[shared_head..new.len() - shared_tail]
        .iter()
        .enumerate()
        .map(|(offset, node)| Op::InsertNode {
            path: vec![shared_head + offset],
            node: node.clone(),
        });
    removed.chain(inserted).collect()
}
