//! Path arithmetic and inline-offset helpers shared by the extensions.
//!
//! Offsets inside a text block are "global": the byte offsets of the text
//! leaves laid end to end, with every inline void counting one unit.

use crate::core::{Document, ElementNode, Marks, Node, Point, Selection, VoidNode};
use crate::extension::{ChildConstraint, ExtensionRegistry};
use crate::ops::{Op, Path};

#[derive(Debug)]
pub struct PathError(pub String);

pub fn node_at_path<'a>(doc: &'a Document, path: &[usize]) -> Option<&'a Node> {
    node_ref(doc, path)
}

pub(crate) fn child_path(parent: &[usize], ix: usize) -> Path {
    let mut path = Vec::with_capacity(parent.len() + 1);
    path.extend_from_slice(parent);
    path.push(ix);
    path
}

pub(crate) fn node_ref<'a>(doc: &'a Document, path: &[usize]) -> Option<&'a Node> {
    let (&last, parent) = path.split_last()?;
    children_at_path(doc, parent)?.get(last)
}

pub(crate) fn node_mut<'a>(doc: &'a mut Document, path: &[usize]) -> Result<&'a mut Node, PathError> {
    let (&last, parent) = path
        .split_last()
        .ok_or_else(|| PathError("empty path".into()))?;
    let mut level = &mut doc.children;
    for (depth, &ix) in parent.iter().enumerate() {
        let len = level.len();
        level = match level.get_mut(ix) {
            Some(Node::Element(el)) => &mut el.children,
            Some(_) => return Err(PathError(format!("nothing below index {ix} at depth {depth}"))),
            None => return Err(PathError(format!("index {ix} past {len} nodes at depth {depth}"))),
        };
    }
    let len = level.len();
    level
        .get_mut(last)
        .ok_or_else(|| PathError(format!("index {last} past {len} nodes at depth {}", parent.len())))
}

pub(crate) fn element_at_path<'a>(doc: &'a Document, path: &[usize]) -> Option<&'a ElementNode> {
    node_ref(doc, path).and_then(Node::as_element)
}

pub(crate) fn element_mut<'a>(doc: &'a mut Document, path: &[usize]) -> Option<&'a mut ElementNode> {
    if let Node::Element(el) = node_mut(doc, path).ok()? { Some(el) } else { None }
}

/// Children of the element at `parent_path`; the empty path names the document root.
pub(crate) fn children_at_path<'a>(doc: &'a Document, parent_path: &[usize]) -> Option<&'a [Node]> {
    parent_path
        .iter()
        .try_fold(doc.children.as_slice(), |level, &ix| match level.get(ix)? {
            Node::Element(el) => Some(el.children.as_slice()),
            Node::Void(_) | Node::Text(_) => None,
        })
}

pub(crate) fn children_mut<'a>(doc: &'a mut Document, parent_path: &[usize]) -> Option<&'a mut Vec<Node>> {
    let mut level = &mut doc.children;
    for &ix in parent_path {
        level = match level.get_mut(ix)? {
            Node::Element(el) => &mut el.children,
            Node::Void(_) | Node::Text(_) => return None,
        };
    }
    Some(level)
}

/// Nearest element on `path` (innermost first) that satisfies `pred`.
pub(crate) fn ancestor_element_path(
    doc: &Document,
    path: &[usize],
    pred: impl Fn(&ElementNode) -> bool,
) -> Option<Path> {
    (1..=path.len())
        .rev()
        .map(|len| &path[..len])
        .find(|prefix| element_at_path(doc, prefix).is_some_and(&pred))
        .map(<[usize]>::to_vec)
}

/// Elements from the outermost block down to the innermost one containing `path`.
pub(crate) fn element_ancestors<'a>(doc: &'a Document, path: &[usize]) -> Vec<&'a ElementNode> {
    (1..=path.len())
        .filter_map(|len| element_at_path(doc, &path[..len]))
        .collect()
}

pub(crate) fn block_path_of(point: &Point) -> &[usize] {
    point.path.split_last().map(|(_, p)| p).unwrap_or(&[])
}

/// First text leaf under `children`, whose paths start with `prefix`.
pub(crate) fn first_text_in(children: &[Node], prefix: Path) -> Option<Point> {
    children.iter().enumerate().find_map(|(ix, node)| match node {
        Node::Text(_) => Some(Point::new(child_path(&prefix, ix), 0)),
        Node::Element(el) => first_text_in(&el.children, child_path(&prefix, ix)),
        Node::Void(_) => None,
    })
}

fn last_text_in(children: &[Node], prefix: Path) -> Option<Point> {
    children.iter().enumerate().rev().find_map(|(ix, node)| match node {
        Node::Text(leaf) => Some(Point::new(child_path(&prefix, ix), leaf.text.len())),
        Node::Element(el) => last_text_in(&el.children, child_path(&prefix, ix)),
        Node::Void(_) => None,
    })
}

pub(crate) fn first_text_point(doc: &Document) -> Option<Point> {
    first_text_in(&doc.children, Vec::new())
}

pub(crate) fn last_text_point(doc: &Document) -> Option<Point> {
    last_text_in(&doc.children, Vec::new())
}

/// Largest char boundary of `s` at or before `ix`.
pub(crate) fn clamp_to_char_boundary(s: &str, ix: usize) -> usize {
    (0..=ix.min(s.len()))
        .rev()
        .find(|&at| s.is_char_boundary(at))
        .unwrap_or(0)
}

pub(crate) fn inline_len(node: &Node) -> usize {
    match node {
        Node::Text(leaf) => leaf.text.len(),
        Node::Void(void) => void.inline_text_len(),
        Node::Element(_) => 0,
    }
}

pub(crate) fn total_inline_text_len(children: &[Node]) -> usize {
    children.iter().map(inline_len).sum()
}

pub(crate) fn point_global_offset(children: &[Node], child_ix: usize, offset: usize) -> usize {
    let before: usize = children.iter().take(child_ix).map(inline_len).sum();
    let within = match children.get(child_ix) {
        Some(Node::Text(leaf)) => clamp_to_char_boundary(&leaf.text, offset),
        Some(Node::Void(void)) => offset.min(void.inline_text_len()),
        Some(Node::Element(_)) | None => 0,
    };
    before + within
}

pub(crate) fn point_for_global_offset(block_path: &[usize], children: &[Node], global_offset: usize) -> Point {
    let at = |ix: usize, offset: usize| Point::new(child_path(block_path, ix), offset);
    let text_len = |ix: usize| match &children[ix] {
        Node::Text(leaf) => Some(leaf.text.len()),
        _ => None,
    };

    let mut remaining = global_offset;
    for (ix, node) in children.iter().enumerate() {
        match node {
            Node::Text(leaf) if remaining <= leaf.text.len() => {
                return at(ix, clamp_to_char_boundary(&leaf.text, remaining));
            }
            Node::Text(leaf) => remaining -= leaf.text.len(),
            Node::Void(_) if remaining == 0 => {
                // Caret right before a void: end of the preceding text, else start of the next.
                let previous = (0..ix).rev().find_map(|prev| text_len(prev).map(|len| at(prev, len)));
                let next = || {
                    (ix + 1..children.len())
                        .find(|&next| text_len(next).is_some())
                        .map(|next| at(next, 0))
                };
                if let Some(point) = previous.or_else(next) {
                    return point;
                }
                break;
            }
            Node::Void(void) => remaining = remaining.saturating_sub(void.inline_text_len()),
            Node::Element(_) => {}
        }
    }

    (0..children.len())
        .rev()
        .find_map(|ix| text_len(ix).map(|len| at(ix, len)))
        .unwrap_or_else(|| at(0, 0))
}

pub(crate) fn is_point_in_block(point: &Point, block_path: &[usize]) -> bool {
    point
        .path
        .split_last()
        .is_some_and(|(_, parent)| parent == block_path)
}

pub(crate) fn global_offset_of(doc: &Document, point: &Point) -> usize {
    let Some((&child_ix, block_path)) = point.path.split_last() else {
        return 0;
    };
    element_at_path(doc, block_path).map_or(0, |el| point_global_offset(&el.children, child_ix, point.offset))
}

/// A block whose children are inline content, with its location.
#[derive(Debug, Clone)]
pub(crate) struct TextBlock<'a> {
    pub path: Path,
    pub el: &'a ElementNode,
}

pub(crate) fn element_is_text_block(el: &ElementNode, registry: &ExtensionRegistry) -> bool {
    match registry.node_specs().get(&el.kind) {
        Some(spec) => spec.children == ChildConstraint::InlineOnly,
        None => el.children.iter().any(|child| !matches!(child, Node::Element(_))),
    }
}

/// Pre-order walk; `visit` decides whether to descend into the node it was handed.
fn visit_blocks<'a>(nodes: &'a [Node], path: &mut Path, visit: &mut dyn FnMut(&Path, &'a Node) -> bool) {
    for (ix, node) in nodes.iter().enumerate() {
        path.push(ix);
        if let (true, Node::Element(el)) = (visit(path, node), node) {
            visit_blocks(&el.children, path, visit);
        }
        path.pop();
    }
}

pub(crate) fn text_blocks_in_order<'a>(doc: &'a Document, registry: &ExtensionRegistry) -> Vec<TextBlock<'a>> {
    let mut blocks = Vec::new();
    visit_blocks(&doc.children, &mut Vec::new(), &mut |path, node| match node {
        Node::Element(el) if element_is_text_block(el, registry) => {
            blocks.push(TextBlock { path: path.clone(), el });
            false
        }
        Node::Element(_) => true,
        Node::Void(_) | Node::Text(_) => false,
    });
    blocks
}

/// Paths of text blocks and block-level voids, in document order.
pub(crate) fn leaf_blocks_in_order(doc: &Document, registry: &ExtensionRegistry) -> Vec<Path> {
    let mut leaves = Vec::new();
    visit_blocks(&doc.children, &mut Vec::new(), &mut |path, node| match node {
        Node::Element(el) if !element_is_text_block(el, registry) => true,
        Node::Element(_) | Node::Void(_) => {
            leaves.push(path.clone());
            false
        }
        Node::Text(_) => false,
    });
    leaves
}

/// The selection's ends in document order, anchor first when they coincide.
pub(crate) fn ordered_selection_points(sel: &Selection) -> (Point, Point) {
    let (anchor, focus) = (&sel.anchor, &sel.focus);
    let anchor_first = if anchor.path == focus.path {
        anchor.offset <= focus.offset
    } else {
        anchor.path < focus.path
    };
    if anchor_first {
        (anchor.clone(), focus.clone())
    } else {
        (focus.clone(), anchor.clone())
    }
}

/// The text blocks touched by the selection, with the global range selected in each.
pub(crate) fn selected_text_blocks<'a>(
    doc: &'a Document,
    registry: &ExtensionRegistry,
    sel: &Selection,
) -> Result<Vec<(TextBlock<'a>, usize, usize)>, String> {
    let (start, end) = ordered_selection_points(sel);
    let blocks = text_blocks_in_order(doc, registry);
    let locate = |point: &Point, end_name: &str| {
        blocks
            .iter()
            .position(|block| block.path == block_path_of(point))
            .ok_or_else(|| format!("Selection {end_name} is not in a text block"))
    };
    let (a, b) = (locate(&start, "start")?, locate(&end, "end")?);
    let (first, last) = (a.min(b), a.max(b));
    let leaf_ix = |point: &Point| point.path.last().copied().unwrap_or(0);

    Ok(blocks
        .into_iter()
        .enumerate()
        .take(last + 1)
        .skip(first)
        .map(|(ix, block)| {
            let children = block.el.children.as_slice();
            let from = if ix == first {
                point_global_offset(children, leaf_ix(&start), start.offset)
            } else {
                0
            };
            let to = if ix == last {
                point_global_offset(children, leaf_ix(&end), end.offset)
            } else {
                total_inline_text_len(children)
            };
            (block, from, to)
        })
        .collect())
}

/// Rewrites the marks of every character in `start_global..end_global`, splitting leaves at the edges.
pub(crate) fn apply_marks_in_block(
    children: &[Node],
    start_global: usize,
    end_global: usize,
    apply: &dyn Fn(Marks) -> Marks,
) -> Vec<Node> {
    if start_global >= end_global {
        return children.to_vec();
    }

    let mut out = Vec::with_capacity(children.len() + 2);
    let mut leaf_start = 0usize;
    for node in children {
        let span = leaf_start..leaf_start + inline_len(node);
        leaf_start = span.end;
        match node {
            Node::Text(leaf) if start_global < span.end && end_global > span.start => {
                let cut = |global: usize| clamp_to_char_boundary(&leaf.text, global.saturating_sub(span.start));
                let (lo, hi) = (cut(start_global), cut(end_global));
                push_text(&mut out, &leaf.text[..lo], &leaf.marks);
                push_text(&mut out, &leaf.text[lo..hi], &apply(leaf.marks.clone()));
                push_text(&mut out, &leaf.text[hi..], &leaf.marks);
            }
            _ => out.push(node.clone()),
        }
    }

    ensure_text_leaf(&mut out);
    out
}

/// Replaces the global range `start..end` of an inline run with `insert`.
pub(crate) fn splice_inline(children: &[Node], start: usize, end: usize, insert: Vec<Node>) -> Vec<Node> {
    let end = end.max(start);
    let mut out = Vec::with_capacity(children.len() + insert.len());
    let mut insert = Some(insert);
    let mut leaf_start = 0usize;

    for node in children {
        let len = inline_len(node);
        let (node_start, node_end) = (leaf_start, leaf_start + len);
        leaf_start = node_end;

        match node {
            Node::Text(leaf) => {
                let local =
                    |global: usize| clamp_to_char_boundary(&leaf.text, global.clamp(node_start, node_end) - node_start);
                let keep_until = local(start);
                let resume_at = local(end).max(keep_until);
                push_text(&mut out, &leaf.text[..keep_until], &leaf.marks);
                if (node_start..=node_end).contains(&start) {
                    out.extend(insert.take().into_iter().flatten());
                }
                push_text(&mut out, &leaf.text[resume_at..], &leaf.marks);
            }
            _ if len > 0 && node_end <= start => out.push(node.clone()),
            _ if node_start >= end => {
                out.extend(insert.take().into_iter().flatten());
                out.push(node.clone());
            }
            _ => {}
        }
    }

    out.extend(insert.into_iter().flatten());
    ensure_text_leaf(&mut out);
    out
}

/// Marks a character typed at `global` would inherit.
pub(crate) fn marks_at_global(children: &[Node], global: usize) -> Marks {
    let mut leaf_start = 0usize;
    let mut trailing: Option<&Marks> = None;
    for node in children {
        let len = inline_len(node);
        if let Node::Text(leaf) = node {
            if (leaf_start..leaf_start + len).contains(&global) {
                return leaf.marks.clone();
            }
            if global == leaf_start + len {
                trailing = Some(&leaf.marks);
            }
        }
        leaf_start += len;
    }
    trailing.cloned().unwrap_or_default()
}

fn inline_text_with(children: &[Node], void_text: fn(&VoidNode) -> &'static str) -> String {
    let mut out = String::new();
    for node in children {
        match node {
            Node::Text(leaf) => out.push_str(&leaf.text),
            Node::Void(void) => out.push_str(void_text(void)),
            Node::Element(_) => {}
        }
    }
    out
}

/// Plain text of an inline run; voids become a NUL so byte offsets stay aligned.
pub(crate) fn inline_search_text(children: &[Node]) -> String {
    inline_text_with(children, |_| "\0")
}

pub(crate) fn inline_plain_text(children: &[Node]) -> String {
    inline_text_with(children, VoidNode::inline_text)
}

pub(crate) fn replace_node_ops(path: &[usize], node: Node) -> Vec<Op> {
    let path = path.to_vec();
    vec![Op::RemoveNode { path: path.clone() }, Op::InsertNode { path, node }]
}

fn push_text(out: &mut Vec<Node>, text: &str, marks: &Marks) {
    if !text.is_empty() {
        out.push(Node::text(text, marks.clone()));
    }
}

fn ensure_text_leaf(out: &mut Vec<Node>) {
    if !out.iter().any(|node| matches!(node, Node::Text(_))) {
        out.insert(0, Node::text("", Marks::default()));
    }
}
