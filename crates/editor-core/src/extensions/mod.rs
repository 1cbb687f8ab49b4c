//! The built-in extension set and the editing helpers its commands share.

mod blocks;
mod history;
mod lists;
mod marks;
mod media;
mod search;
mod table;
mod text;
mod view;

use crate::core::{Document, Editor, ElementNode, Marks, Node, Point, Selection};
use crate::extension::{Extension, ExtensionRegistry};
use crate::ops::{Op, Path, Transaction};
use crate::tree::{
    block_path_of, children_mut, element_at_path, element_mut, global_offset_of, inline_len,
    leaf_blocks_in_order, marks_at_global, point_for_global_offset, replace_node_ops,
    selected_text_blocks, splice_inline, total_inline_text_len,
};

pub use media::youtube_embed_url;

pub(crate) const MAX_INDENT_LEVEL: u64 = 8;

pub fn core_extensions() -> Vec<Box<dyn Extension>> {
    vec![
        Box::new(text::DocumentExtension),
        Box::new(text::TextExtension),
        Box::new(history::HistoryExtension),
    ]
}

pub fn wysiwyg_extensions() -> Vec<Box<dyn Extension>> {
    let mut extensions = core_extensions();
    extensions.extend([
        Box::new(marks::MarksExtension) as Box<dyn Extension>,
        Box::new(marks::TextStyleExtension),
        Box::new(marks::HighlightExtension),
        Box::new(marks::LinkExtension),
        Box::new(blocks::HeadingExtension),
        Box::new(blocks::BlockquoteExtension),
        Box::new(blocks::CodeBlockExtension),
        Box::new(blocks::HorizontalRuleExtension),
        Box::new(text::HardBreakExtension),
        Box::new(blocks::TextAlignExtension),
        Box::new(blocks::LineHeightExtension),
        Box::new(blocks::IndentExtension),
        Box::new(lists::ListExtension),
        Box::new(table::TableExtension),
        Box::new(media::ImageExtension),
        Box::new(media::YoutubeExtension),
        Box::new(search::SearchAndReplaceExtension),
        Box::new(view::InvisibleCharactersExtension),
        Box::new(view::CharacterCountExtension),
    ]);
    extensions
}

/// A caret addressed by its text block and global inline offset, which
/// survives edits that rebuild the block's leaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Caret {
    pub block: Path,
    pub offset: usize,
}

impl Caret {
    pub fn of(doc: &Document, point: &Point) -> Self {
        Self {
            block: block_path_of(point).to_vec(),
            offset: global_offset_of(doc, point),
        }
    }

    pub fn start_of(block: Path) -> Self {
        Self { block, offset: 0 }
    }

    pub fn point(&self, doc: &Document) -> Point {
        match element_at_path(doc, &self.block) {
            Some(el) => point_for_global_offset(&self.block, &el.children, self.offset),
            None => {
                let mut path = self.block.clone();
                path.push(0);
                Point::new(path, 0)
            }
        }
    }

    pub fn selection(&self, doc: &Document) -> Selection {
        Selection::collapsed(self.point(doc))
    }
}

/// Runs `edit` against a copy of the document and diffs the result into a transaction.
pub(crate) fn edit_document(
    editor: &Editor,
    edit: impl FnOnce(&mut Document) -> Result<Selection, String>,
) -> Result<Transaction, String> {
    let mut doc = editor.doc().clone();
    let selection = edit(&mut doc)?;
    if doc == *editor.doc() && selection == *editor.selection() {
        return Ok(Transaction::default());
    }
    Ok(Transaction::replace_document(editor.doc(), &doc).selection_after(selection))
}

pub(crate) fn text_of(children: &[Node]) -> usize {
    total_inline_text_len(children)
}

/// Marks a character typed at `global` would take: those of the leaf ending there.
pub(crate) fn marks_before(children: &[Node], global: usize) -> Marks {
    let mut cursor = 0usize;
    for node in children {
        let len = inline_len(node);
        if let Node::Text(t) = node {
            if global > cursor && global <= cursor + len {
                return t.marks.clone();
            }
        }
        cursor += len;
    }
    marks_at_global(children, global)
}

pub(crate) fn remove_at(doc: &mut Document, path: &[usize]) -> Result<Node, String> {
    let (ix, parent) = path
        .split_last()
        .ok_or_else(|| "Cannot remove the document".to_string())?;
    let siblings = children_mut(doc, parent).ok_or_else(|| "Parent is not a container".to_string())?;
    if *ix >= siblings.len() {
        return Err("Path out of bounds".into());
    }
    Ok(siblings.remove(*ix))
}

/// Removes the selected content and returns where the caret lands.
pub(crate) fn delete_selection_in(
    doc: &mut Document,
    registry: &ExtensionRegistry,
    sel: &Selection,
) -> Result<Caret, String> {
    if sel.is_collapsed() {
        return Ok(Caret::of(doc, &sel.focus));
    }

    let blocks: Vec<(Path, usize, usize)> = selected_text_blocks(doc, registry, sel)?
        .into_iter()
        .map(|(block, from, to)| (block.path, from, to))
        .collect();
    let (Some(first), Some(last)) = (blocks.first().cloned(), blocks.last().cloned()) else {
        return Ok(Caret::of(doc, &sel.focus));
    };
    let (first_path, from, first_to) = first;
    let (last_path, _, to) = last;

    if blocks.len() == 1 {
        let (start, end) = (from.min(first_to), from.max(first_to));
        let el = element_mut(doc, &first_path).ok_or_else(|| "Selection block not found".to_string())?;
        el.children = splice_inline(&el.children, start, end, Vec::new());
        return Ok(Caret {
            block: first_path,
            offset: start,
        });
    }

    let tail = {
        let last = element_at_path(doc, &last_path).ok_or_else(|| "Selection block not found".to_string())?;
        splice_inline(&last.children, 0, to, Vec::new())
    };

    let leaves = leaf_blocks_in_order(doc, registry);
    let a = leaves.iter().position(|p| *p == first_path);
    let b = leaves.iter().position(|p| *p == last_path);
    let (Some(a), Some(b)) = (a, b) else {
        return Err("Selection blocks not found".into());
    };
    for path in leaves[a + 1..=b].iter().rev() {
        remove_at(doc, path)?;
    }

    let first = element_mut(doc, &first_path).ok_or_else(|| "Selection block not found".to_string())?;
    let total = text_of(&first.children);
    first.children = splice_inline(&first.children, from, total, tail);
    Ok(Caret {
        block: first_path,
        offset: from,
    })
}

/// Inserts inline nodes at the caret; the returned caret sits after them.
pub(crate) fn insert_inline_at(doc: &mut Document, caret: &Caret, mut nodes: Vec<Node>) -> Result<Caret, String> {
    let len: usize = nodes.iter().map(inline_len).sum();
    let el = element_mut(doc, &caret.block).ok_or_else(|| "Caret is not in a text block".to_string())?;
    // The caret needs a text leaf to land in after a trailing void.
    if matches!(nodes.last(), Some(Node::Void(_))) {
        nodes.push(Node::text("", marks_before(&el.children, caret.offset)));
    }
    el.children = splice_inline(&el.children, caret.offset, caret.offset, nodes);
    Ok(Caret {
        block: caret.block.clone(),
        offset: caret.offset + len,
    })
}

/// Splits the caret's block in two; the second half keeps the block's kind.
pub(crate) fn split_block_at(doc: &mut Document, caret: &Caret) -> Result<Caret, String> {
    let (ix, parent) = caret
        .block
        .split_last()
        .ok_or_else(|| "Caret is not in a block".to_string())?;
    let el = element_at_path(doc, &caret.block)
        .cloned()
        .ok_or_else(|| "Caret is not in a text block".to_string())?;

    let total = text_of(&el.children);
    let head = splice_inline(&el.children, caret.offset, total, Vec::new());
    let tail = splice_inline(&el.children, 0, caret.offset, Vec::new());

    // Enter at the end of a heading continues with a plain paragraph.
    let tail_node = if el.kind == "heading" && caret.offset >= total {
        Node::element("paragraph", Default::default(), tail)
    } else {
        Node::element(el.kind.clone(), el.attrs.clone(), tail)
    };

    let siblings = children_mut(doc, parent).ok_or_else(|| "Parent is not a container".to_string())?;
    siblings[*ix] = Node::Element(ElementNode {
        children: head,
        ..el
    });
    siblings.insert(ix + 1, tail_node);

    let mut block = parent.to_vec();
    block.push(ix + 1);
    Ok(Caret::start_of(block))
}

/// Replaces every selected text block for which `retype` returns a node.
pub(crate) fn retype_selected_blocks(
    editor: &Editor,
    retype: impl Fn(&ElementNode) -> Option<Node>,
) -> Result<Transaction, String> {
    let sel = editor.selection().clone();
    let mut ops: Vec<Op> = Vec::new();
    for (block, _, _) in selected_text_blocks(editor.doc(), editor.registry(), &sel)? {
        if let Some(node) = retype(block.el) {
            if node.as_element() != Some(block.el) {
                ops.extend(replace_node_ops(&block.path, node));
            }
        }
    }
    if ops.is_empty() {
        return Ok(Transaction::default());
    }
    Ok(Transaction::new(ops).selection_after(sel))
}

/// Patches the attributes of every selected text block for which `patch` returns one.
pub(crate) fn patch_selected_blocks(
    editor: &Editor,
    patch: impl Fn(&ElementNode) -> Option<crate::core::AttrPatch>,
) -> Result<Transaction, String> {
    let sel = editor.selection().clone();
    let ops: Vec<Op> = selected_text_blocks(editor.doc(), editor.registry(), &sel)?
        .into_iter()
        .filter_map(|(block, _, _)| {
            patch(block.el).map(|patch| Op::SetNodeAttrs {
                path: block.path.clone(),
                patch,
            })
        })
        .collect();
    if ops.is_empty() {
        return Ok(Transaction::default());
    }
    Ok(Transaction::new(ops).selection_after(sel))
}
