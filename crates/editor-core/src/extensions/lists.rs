//! Lists are stored flat: each `list_item` is a text block carrying its
//! `list_type` and nesting `list_level`. Serialization rebuilds the
//! `<ul>`/`<ol>` nesting from consecutive items.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::json;

use super::blocks::carried_block_attrs;
use super::{Caret, edit_document, split_block_at, text_of};
use crate::core::{AttrPatch, Document, Node};
use crate::extension::{CommandSpec, Extension, ExtensionRegistry, NodeSpec, NormalizePass, arg_str};
use crate::ops::{Op, Path, Transaction};
use crate::tree::{children_mut, element_at_path, element_is_text_block, selected_text_blocks};

const LIST_TYPES: &[&str] = &["bullet", "ordered"];

pub(super) struct ListExtension;

impl Extension for ListExtension {
    fn name(&self) -> &'static str {
        "list"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec::text_block("list_item")]
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![Box::new(NormalizeListLevels)]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::transaction("list.toggle", "Toggle list", |editor, args| {
                let list_type = arg_str(args, "type")?;
                if !LIST_TYPES.contains(&list_type.as_str()) {
                    return Err(format!("Unknown list type: {list_type}"));
                }
                toggle_list(editor, &list_type)
            })
            .keywords(["list", "bullet", "ordered", "numbered", "ul", "ol"])
            .args_example(json!({ "type": "bullet" })),
            CommandSpec::transaction("list.split_item", "Split list item", |editor, _args| {
                let caret = Caret::of(editor.doc(), &editor.selection().focus);
                require_list_item(editor.doc(), &caret.block)?;
                edit_document(editor, |doc| split_item_in(doc, &caret).map(|caret| caret.selection(doc)))
            }),
            CommandSpec::transaction("list.sink_item", "Sink list item", |editor, _args| {
                let sel = editor.selection().clone();
                let items = selected_items(editor)?;
                edit_document(editor, |doc| {
                    sink_items_in(doc, &items)?;
                    Ok(sel)
                })
            })
            .keywords(["indent", "nest"]),
            CommandSpec::transaction("list.lift_item", "Lift list item", |editor, _args| {
                let sel = editor.selection().clone();
                let items = selected_items(editor)?;
                edit_document(editor, |doc| {
                    lift_items_in(doc, &items)?;
                    Ok(sel)
                })
            })
            .keywords(["outdent", "unnest"]),
        ]
    }
}

fn item_level(node: &Node) -> Option<u64> {
    let el = node.as_element().filter(|el| el.kind == "list_item")?;
    Some(el.attr_u64("list_level").unwrap_or(0))
}

/// End (exclusive) of the items nested under the item at `ix`.
fn subtree_end(siblings: &[Node], ix: usize) -> usize {
    let Some(level) = siblings.get(ix).and_then(item_level) else {
        return ix + 1;
    };
    let mut end = ix + 1;
    while siblings.get(end).and_then(item_level).is_some_and(|l| l > level) {
        end += 1;
    }
    end
}

fn require_list_item(doc: &Document, block: &[usize]) -> Result<(), String> {
    match element_at_path(doc, block) {
        Some(el) if el.kind == "list_item" => Ok(()),
        _ => Err("Selection is not in a list item".into()),
    }
}

fn selected_items(editor: &crate::core::Editor) -> Result<Vec<Path>, String> {
    let items: Vec<Path> = selected_text_blocks(editor.doc(), editor.registry(), editor.selection())?
        .into_iter()
        .filter(|(block, _, _)| block.el.kind == "list_item")
        .map(|(block, _, _)| block.path)
        .collect();
    if items.is_empty() {
        return Err("Selection is not in a list item".into());
    }
    Ok(items)
}

/// Selected sibling indices grouped by parent path.
fn group_by_parent(items: &[Path]) -> BTreeMap<Path, Vec<usize>> {
    let mut groups: BTreeMap<Path, Vec<usize>> = BTreeMap::new();
    for path in items {
        if let Some((ix, parent)) = path.split_last() {
            groups.entry(parent.to_vec()).or_default().push(*ix);
        }
    }
    groups
}

fn set_level(node: &mut Node, level: u64) {
    if let Node::Element(el) = node {
        el.attrs.insert("list_level".into(), json!(level));
    }
}

fn to_paragraph(node: &Node) -> Node {
    match node {
        Node::Element(el) => Node::element("paragraph", carried_block_attrs(el), el.children.clone()),
        other => other.clone(),
    }
}

fn affected_indices(siblings: &[Node], selected: &[usize]) -> BTreeSet<usize> {
    selected
        .iter()
        .flat_map(|&ix| ix..subtree_end(siblings, ix))
        .collect()
}

fn sink_items_in(doc: &mut Document, items: &[Path]) -> Result<(), String> {
    for (parent, selected) in group_by_parent(items) {
        let siblings = children_mut(doc, &parent).ok_or_else(|| "List parent not found".to_string())?;
        let first = selected.iter().copied().min().unwrap_or(0);
        let level = siblings.get(first).and_then(item_level).unwrap_or(0);
        let has_sibling_above = first
            .checked_sub(1)
            .and_then(|ix| siblings.get(ix))
            .and_then(item_level)
            .is_some_and(|above| above >= level);
        if !has_sibling_above {
            return Err("The first item of a list cannot be nested".into());
        }
        for ix in affected_indices(siblings, &selected) {
            if let Some(level) = item_level(&siblings[ix]) {
                set_level(&mut siblings[ix], level + 1);
            }
        }
    }
    Ok(())
}

fn lift_items_in(doc: &mut Document, items: &[Path]) -> Result<(), String> {
    for (parent, selected) in group_by_parent(items) {
        let siblings = children_mut(doc, &parent).ok_or_else(|| "List parent not found".to_string())?;
        for ix in affected_indices(siblings, &selected) {
            match item_level(&siblings[ix]) {
                Some(0) => siblings[ix] = to_paragraph(&siblings[ix]),
                Some(level) => set_level(&mut siblings[ix], level - 1),
                None => {}
            }
        }
    }
    Ok(())
}

/// Lifts one item; a top-level item leaves the list as a paragraph.
pub(super) fn lift_item_in(doc: &mut Document, block: &[usize]) -> Result<(), String> {
    require_list_item(doc, block)?;
    lift_items_in(doc, &[block.to_vec()])
}

/// Enter inside a list item: an empty item leaves the list, any other splits.
pub(super) fn split_item_in(doc: &mut Document, caret: &Caret) -> Result<Caret, String> {
    let el = element_at_path(doc, &caret.block).ok_or_else(|| "Selection is not in a list item".to_string())?;
    if text_of(&el.children) == 0 {
        lift_item_in(doc, &caret.block)?;
        return Ok(Caret::start_of(caret.block.clone()));
    }
    split_block_at(doc, caret)
}

fn toggle_list(editor: &crate::core::Editor, list_type: &str) -> Result<Transaction, String> {
    let sel = editor.selection().clone();
    let blocks: Vec<(Path, String, Option<String>)> = selected_text_blocks(editor.doc(), editor.registry(), &sel)?
        .into_iter()
        .map(|(block, _, _)| {
            (
                block.path,
                block.el.kind.clone(),
                block.el.attr_str("list_type").map(str::to_string),
            )
        })
        .collect();
    let all_same_list = !blocks.is_empty()
        && blocks
            .iter()
            .all(|(_, kind, ty)| kind == "list_item" && ty.as_deref() == Some(list_type));

    if all_same_list {
        let items: Vec<Path> = blocks.into_iter().map(|(path, _, _)| path).collect();
        return edit_document(editor, |doc| {
            for (parent, selected) in group_by_parent(&items) {
                let siblings = children_mut(doc, &parent).ok_or_else(|| "List parent not found".to_string())?;
                for ix in selected {
                    siblings[ix] = to_paragraph(&siblings[ix]);
                }
            }
            Ok(sel)
        });
    }

    edit_document(editor, |doc| {
        for (path, kind, _) in &blocks {
            let Some((ix, parent)) = path.split_last() else {
                continue;
            };
            let siblings = children_mut(doc, parent).ok_or_else(|| "List parent not found".to_string())?;
            match kind.as_str() {
                "list_item" => retype_nested_list(siblings, *ix, list_type),
                "code_block" => {}
                _ => {
                    if let Node::Element(el) = &siblings[*ix] {
                        let mut attrs = carried_block_attrs(el);
                        attrs.insert("list_type".into(), json!(list_type));
                        attrs.insert("list_level".into(), json!(0));
                        siblings[*ix] = Node::element("list_item", attrs, el.children.clone());
                    }
                }
            }
        }
        Ok(sel)
    })
}

/// Changes the type of every item in the same list as the item at `ix`:
/// the contiguous items at its level, stopping at shallower ones.
fn retype_nested_list(siblings: &mut [Node], ix: usize, list_type: &str) {
    let Some(level) = siblings.get(ix).and_then(item_level) else {
        return;
    };
    let in_list = |node: &Node| item_level(node).is_some_and(|l| l >= level);
    let mut start = ix;
    while start > 0 && in_list(&siblings[start - 1]) {
        start -= 1;
    }
    let mut end = ix + 1;
    while end < siblings.len() && in_list(&siblings[end]) {
        end += 1;
    }
    for node in &mut siblings[start..end] {
        if item_level(node) == Some(level) {
            if let Node::Element(el) = node {
                el.attrs.insert("list_type".into(), json!(list_type));
            }
        }
    }
}

/// A run of items starts at level 0 and nests at most one level per item.
struct NormalizeListLevels;

impl NormalizePass for NormalizeListLevels {
    fn id(&self) -> &'static str {
        "list.normalize_levels"
    }

    fn run(&self, doc: &Document, registry: &ExtensionRegistry) -> Vec<Op> {
        fn walk(children: &[Node], path: &mut Vec<usize>, registry: &ExtensionRegistry, ops: &mut Vec<Op>) {
            let mut previous: Option<u64> = None;
            for (ix, node) in children.iter().enumerate() {
                path.push(ix);
                match node {
                    Node::Element(el) if el.kind == "list_item" => {
                        let stored = el.attr_u64("list_level");
                        let max = previous.map_or(0, |p| p + 1);
                        let level = stored.unwrap_or(0).min(max);
                        let mut patch = AttrPatch::default();
                        if stored != Some(level) {
                            patch.set.insert("list_level".into(), json!(level));
                        }
                        if !el.attr_str("list_type").is_some_and(|t| LIST_TYPES.contains(&t)) {
                            patch.set.insert("list_type".into(), json!("bullet"));
                        }
                        if !patch.set.is_empty() {
                            ops.push(Op::SetNodeAttrs {
                                path: path.clone(),
                                patch,
                            });
                        }
                        previous = Some(level);
                    }
                    Node::Element(el) => {
                        previous = None;
                        if !element_is_text_block(el, registry) {
                            walk(&el.children, path, registry, ops);
                        }
                    }
                    _ => previous = None,
                }
                path.pop();
            }
        }

        let mut ops = Vec::new();
        walk(&doc.children, &mut Vec::new(), registry, &mut ops);
        ops
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Attrs;

    fn item(level: u64) -> Node {
        let mut attrs = Attrs::default();
        attrs.insert("list_type".into(), json!("bullet"));
        attrs.insert("list_level".into(), json!(level));
        Node::element("list_item", attrs, vec![Node::text("x", Default::default())])
    }

    #[test]
    fn subtree_covers_deeper_items_only() {
        let siblings = vec![item(0), item(1), item(2), item(1), item(0)];
        assert_eq!(subtree_end(&siblings, 0), 4);
        assert_eq!(subtree_end(&siblings, 1), 3);
        assert_eq!(subtree_end(&siblings, 4), 5);
    }

    #[test]
    fn levels_are_clamped_to_one_step_deeper() {
        let doc = Document {
            children: vec![item(2), item(3), Node::paragraph("p"), item(0)],
        };
        let ops = NormalizeListLevels.run(&doc, &ExtensionRegistry::wysiwyg());
        assert_eq!(
            ops,
            vec![
                Op::SetNodeAttrs {
                    path: vec![0],
                    patch: AttrPatch::set("list_level", json!(0)),
                },
                Op::SetNodeAttrs {
                    path: vec![1],
                    patch: AttrPatch::set("list_level", json!(1)),
                },
            ]
        );
    }
}
