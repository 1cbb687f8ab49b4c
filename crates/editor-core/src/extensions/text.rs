use serde_json::{Value, json};

use super::{
    Caret, delete_selection_in, edit_document, insert_inline_at, lists, marks_before, remove_at,
    split_block_at, text_of,
};
use crate::core::{Document, Editor, Marks, Node, Point, Selection};
use crate::extension::{
    CommandError, CommandSpec, Extension, ExtensionRegistry, NodeSpec, NormalizePass, QueryError,
    QuerySpec, arg_bool, arg_opt_str, arg_str,
};
use crate::html::parse_html;
use crate::ops::{Op, Transaction};
use crate::tree::{
    ancestor_element_path, children_mut, clamp_to_char_boundary, element_at_path, element_is_text_block,
    child_path, element_mut, first_text_point, inline_search_text, last_text_point, leaf_blocks_in_order,
    node_ref, splice_inline, text_blocks_in_order,
};

pub(super) struct DocumentExtension;

impl Extension for DocumentExtension {
    fn name(&self) -> &'static str {
        "document"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec::text_block("paragraph")]
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![
            Box::new(EnsureNonEmptyDocument),
            Box::new(PruneEmptyContainers),
            Box::new(EnsureParagraphHasTextLeaf),
            Box::new(EnsureTextAroundInlineVoids),
            Box::new(MergeAdjacentTextLeaves),
        ]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("document.clear", "Clear document", |editor, args| {
                let emit_update = arg_bool(args.as_ref(), "emit_update", false);
                replace_content(editor, Document::empty(), emit_update, "command:document.clear")
            })
            .description("Replace the document with a single empty paragraph.")
            .keywords(["new", "clear", "empty"]),
            CommandSpec::new("document.set_content", "Set content", |editor, args| {
                let html = arg_str(args.as_ref(), "html").map_err(CommandError::new)?;
                let emit_update = arg_bool(args.as_ref(), "emit_update", false);
                let doc = parse_html(&html)?;
                replace_content(editor, doc, emit_update, "command:document.set_content")
            })
            .description("Replace the document with parsed HTML.")
            .keywords(["content", "html", "load"])
            .args_example(json!({ "html": "<p>Hello</p>", "emit_update": false })),
            CommandSpec::transaction("selection.select_all", "Select all", |editor, _args| {
                let (Some(start), Some(end)) = (first_text_point(editor.doc()), last_text_point(editor.doc())) else {
                    return Err("Document has no text".into());
                };
                Ok(Transaction::default().selection_after(Selection::new(start, end)))
            })
            .keywords(["select", "all"]),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![
            QuerySpec::new("editor.html", |editor, _args| Ok(Value::String(editor.get_html()))),
            QuerySpec::new("editor.text", |editor, _args| Ok(Value::String(editor.get_text()))),
            QuerySpec::new("editor.breadcrumb", |editor, _args| {
                Ok(Value::String(editor.cursor_breadcrumb()))
            }),
            QuerySpec::new("editor.is_active", |editor, args| {
                let name = arg_opt_str(args.as_ref(), "name").unwrap_or_default();
                let attrs = args.as_ref().and_then(|v| v.get("attrs"));
                Ok(Value::Bool(editor.is_active(&name, attrs)))
            }),
            QuerySpec::new("editor.attributes", |editor, args| {
                let name = arg_str(args.as_ref(), "name").map_err(QueryError::new)?;
                Ok(editor.get_attributes(&name))
            }),
        ]
    }
}

fn replace_content(
    editor: &mut Editor,
    doc: Document,
    emit_update: bool,
    source: &str,
) -> Result<(), CommandError> {
    let caret = first_text_point(&doc).unwrap_or_else(|| Point::new(vec![0, 0], 0));
    let mut tx = Transaction::replace_document(editor.doc(), &doc)
        .selection_after(Selection::collapsed(caret))
        .source(source);
    if !emit_update {
        tx = tx.without_update_event();
    }
    editor.apply(tx).map_err(CommandError::from)
}

pub(super) struct TextExtension;

impl Extension for TextExtension {
    fn name(&self) -> &'static str {
        "text"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::transaction("text.insert", "Insert text", |editor, args| {
                let text = arg_str(args, "text")?;
                insert_text(editor, &text)
            })
            .description("Insert text at the selection, replacing selected content.")
            .args_example(json!({ "text": "hello" })),
            CommandSpec::transaction("content.insert_html", "Insert HTML", |editor, args| {
                let html = arg_str(args, "html")?;
                insert_html(editor, &html)
            })
            .description("Insert an HTML fragment at the selection.")
            .keywords(["paste", "html"])
            .args_example(json!({ "html": "<strong>bold</strong>" })),
            CommandSpec::transaction("text.delete_selection", "Delete selection", |editor, _args| {
                let registry = editor.registry();
                let sel = editor.selection();
                if sel.is_collapsed() {
                    return Ok(Transaction::default());
                }
                edit_document(editor, |doc| {
                    delete_selection_in(doc, registry, sel).map(|caret| caret.selection(doc))
                })
            })
            .keywords(["delete", "cut"]),
            CommandSpec::transaction("text.delete_backward", "Delete backward", |editor, _args| {
                delete_backward(editor)
            })
            .keywords(["backspace"]),
            CommandSpec::transaction("block.split", "Split block", |editor, _args| split(editor))
                .description("Break the block at the caret, as the Enter key does.")
                .keywords(["enter", "newline"]),
        ]
    }
}

pub(super) struct HardBreakExtension;

impl Extension for HardBreakExtension {
    fn name(&self) -> &'static str {
        "hard_break"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec::void("hard_break", crate::extension::NodeRole::Inline)]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::transaction("hard_break.insert", "Insert line break", |editor, _args| {
                let registry = editor.registry();
                let sel = editor.selection();
                edit_document(editor, |doc| {
                    let caret = delete_selection_in(doc, registry, sel)?;
                    let in_code = element_at_path(doc, &caret.block).is_some_and(|el| el.kind == "code_block");
                    let node = if in_code {
                        Node::text("\n", Marks::default())
                    } else {
                        Node::hard_break()
                    };
                    insert_inline_at(doc, &caret, vec![node]).map(|caret| caret.selection(doc))
                })
            })
            .keywords(["br", "shift enter", "line break"]),
        ]
    }
}

fn insert_text(editor: &Editor, text: &str) -> Result<Transaction, String> {
    if text.is_empty() {
        return Ok(Transaction::default());
    }

    let sel = editor.selection();
    if sel.is_collapsed() {
        if let Some(Node::Text(leaf)) = node_ref(editor.doc(), &sel.focus.path) {
            let path = sel.focus.path.clone();
            let offset = clamp_to_char_boundary(&leaf.text, sel.focus.offset);
            return Ok(Transaction::new(vec![Op::InsertText {
                path: path.clone(),
                offset,
                text: text.to_string(),
            }])
            .selection_after(Selection::collapsed(Point::new(path, offset + text.len()))));
        }
    }

    let registry = editor.registry();
    edit_document(editor, |doc| {
        let caret = delete_selection_in(doc, registry, sel)?;
        let marks = element_at_path(doc, &caret.block)
            .map(|el| marks_before(&el.children, caret.offset))
            .unwrap_or_default();
        insert_inline_at(doc, &caret, vec![Node::text(text, marks)]).map(|caret| caret.selection(doc))
    })
}

fn insert_html(editor: &Editor, html: &str) -> Result<Transaction, String> {
    let fragment = parse_html(html).map_err(|err| err.to_string())?;
    if fragment.children.is_empty() {
        return Ok(Transaction::default());
    }

    let registry = editor.registry();
    let sel = editor.selection();
    edit_document(editor, |doc| {
        let caret = delete_selection_in(doc, registry, sel)?;
        let target = element_at_path(doc, &caret.block).ok_or_else(|| "Caret is not in a text block".to_string())?;

        // A lone paragraph pastes inline, keeping the surrounding block.
        if let [Node::Element(only)] = fragment.children.as_slice() {
            if only.kind == "paragraph" {
                let inline: Vec<Node> = only
                    .children
                    .iter()
                    .filter(|n| !matches!(n, Node::Text(t) if t.text.is_empty()))
                    .cloned()
                    .collect();
                return insert_inline_at(doc, &caret, inline).map(|caret| caret.selection(doc));
            }
        }

        if target.kind == "code_block" {
            let text = fragment_plain_text(&fragment, registry);
            return insert_inline_at(doc, &caret, vec![Node::text(text, Marks::default())])
                .map(|caret| caret.selection(doc));
        }

        let tail = split_block_at(doc, &caret)?;
        let (tail_ix, parent) = tail
            .block
            .split_last()
            .map(|(ix, parent)| (*ix, parent.to_vec()))
            .ok_or_else(|| "Caret is not in a block".to_string())?;
        let inserted = fragment.children.len();
        let last_is_text_block = fragment
            .children
            .last()
            .and_then(Node::as_element)
            .is_some_and(|el| element_is_text_block(el, registry));

        let siblings = children_mut(doc, &parent).ok_or_else(|| "Parent is not a container".to_string())?;
        siblings.splice(tail_ix..tail_ix, fragment.children.iter().cloned());

        let is_empty = |node: &Node| node.as_element().is_some_and(|el| text_of(&el.children) == 0);
        let mut tail_at = tail_ix + inserted;
        let mut caret_at_end = false;
        if last_is_text_block && siblings.get(tail_at).is_some_and(is_empty) {
            siblings.remove(tail_at);
            tail_at -= 1;
            caret_at_end = true;
        }
        // An empty head left by splitting at offset zero goes too.
        if tail_ix > 0 && siblings.get(tail_ix - 1).is_some_and(is_empty) {
            siblings.remove(tail_ix - 1);
            tail_at -= 1;
        }

        let mut block = parent;
        block.push(tail_at);
        let offset = if caret_at_end {
            element_at_path(doc, &block).map(|el| text_of(&el.children)).unwrap_or(0)
        } else {
            0
        };
        Ok(Caret { block, offset }.selection(doc))
    })
}

fn fragment_plain_text(fragment: &Document, registry: &ExtensionRegistry) -> String {
    crate::tree::text_blocks_in_order(fragment, registry)
        .iter()
        .map(|block| crate::tree::inline_plain_text(&block.el.children))
        .collect::<Vec<_>>()
        .join("\n")
}

fn split(editor: &Editor) -> Result<Transaction, String> {
    let registry = editor.registry();
    let sel = editor.selection();
    edit_document(editor, |doc| {
        let caret = delete_selection_in(doc, registry, sel)?;
        let kind = element_at_path(doc, &caret.block)
            .map(|el| el.kind.clone())
            .ok_or_else(|| "Caret is not in a text block".to_string())?;
        let caret = match kind.as_str() {
            "code_block" => insert_inline_at(doc, &caret, vec![Node::text("\n", Marks::default())])?,
            "list_item" => lists::split_item_in(doc, &caret)?,
            _ => split_block_at(doc, &caret)?,
        };
        Ok(caret.selection(doc))
    })
}

fn in_same_cell(doc: &Document, a: &[usize], b: &[usize]) -> bool {
    let cell = |path: &[usize]| {
        ancestor_element_path(doc, path, |el| matches!(el.kind.as_str(), "table_cell" | "table_header"))
    };
    cell(a) == cell(b)
}

fn delete_backward(editor: &Editor) -> Result<Transaction, String> {
    let registry = editor.registry();
    let sel = editor.selection();
    if !sel.is_collapsed() {
        return edit_document(editor, |doc| {
            delete_selection_in(doc, registry, sel).map(|caret| caret.selection(doc))
        });
    }

    let doc = editor.doc();
    let caret = Caret::of(doc, &sel.focus);
    let current = element_at_path(doc, &caret.block).ok_or_else(|| "Caret is not in a text block".to_string())?;

    if caret.offset > 0 {
        let text = inline_search_text(&current.children);
        let end = clamp_to_char_boundary(&text, caret.offset);
        let width = text[..end].chars().next_back().map(char::len_utf8).unwrap_or(1);
        let start = end.saturating_sub(width);
        return edit_document(editor, |doc| {
            let el = element_mut(doc, &caret.block).ok_or_else(|| "Caret is not in a text block".to_string())?;
            el.children = splice_inline(&el.children, start, end, Vec::new());
            Ok(Caret {
                block: caret.block.clone(),
                offset: start,
            }
            .selection(doc))
        });
    }

    if current.kind == "list_item" {
        return edit_document(editor, |doc| {
            lists::lift_item_in(doc, &caret.block)?;
            Ok(caret.selection(doc))
        });
    }

    let leaves = leaf_blocks_in_order(doc, registry);
    let ix = leaves
        .iter()
        .position(|p| *p == caret.block)
        .ok_or_else(|| "Caret is not in a text block".to_string())?;

    let Some(previous) = ix.checked_sub(1).map(|i| leaves[i].clone()) else {
        if current.kind == "paragraph" {
            return Err("Nothing to delete".into());
        }
        let node = Node::element("paragraph", super::blocks::carried_block_attrs(current), current.children.clone());
        return Ok(Transaction::new(crate::tree::replace_node_ops(&caret.block, node)).selection_after(sel.clone()));
    };

    if !in_same_cell(doc, &previous, &caret.block) {
        return Err("Cannot join blocks across table cells".into());
    }

    match node_ref(doc, &previous) {
        // Voids and empty blocks are removed; the op re-indexes the caret path.
        Some(node) if node.as_element().is_none_or(|el| text_of(&el.children) == 0) => {
            Ok(Transaction::new(vec![Op::RemoveNode { path: previous }]))
        }
        Some(Node::Element(_)) => edit_document(editor, |doc| {
            let removed = remove_at(doc, &caret.block)?;
            let prev = element_mut(doc, &previous).ok_or_else(|| "Previous block not found".to_string())?;
            let offset = text_of(&prev.children);
            if let Node::Element(removed) = removed {
                prev.children.extend(removed.children);
            }
            Ok(Caret {
                block: previous.clone(),
                offset,
            }
            .selection(doc))
        }),
        _ => Err("Nothing to delete".into()),
    }
}

struct EnsureNonEmptyDocument;

impl NormalizePass for EnsureNonEmptyDocument {
    fn id(&self) -> &'static str {
        "document.ensure_non_empty"
    }

    fn run(&self, doc: &Document, _registry: &ExtensionRegistry) -> Vec<Op> {
        if doc.children.is_empty() {
            return vec![Op::InsertNode {
                path: vec![0],
                node: Node::paragraph(""),
            }];
        }
        Vec::new()
    }
}

/// Containers left without children by an edit are dropped, one per round.
struct PruneEmptyContainers;

impl NormalizePass for PruneEmptyContainers {
    fn id(&self) -> &'static str {
        "document.prune_empty_containers"
    }

    fn run(&self, doc: &Document, _registry: &ExtensionRegistry) -> Vec<Op> {
        fn find(children: &[Node], path: &mut Vec<usize>) -> Option<Vec<usize>> {
            for (ix, node) in children.iter().enumerate() {
                let Node::Element(el) = node else {
                    continue;
                };
                path.push(ix);
                if el.children.is_empty() && matches!(el.kind.as_str(), "blockquote" | "table" | "table_row") {
                    return Some(path.clone());
                }
                if let Some(found) = find(&el.children, path) {
                    return Some(found);
                }
                path.pop();
            }
            None
        }

        find(&doc.children, &mut Vec::new())
            .map(|path| vec![Op::RemoveNode { path }])
            .unwrap_or_default()
    }
}

struct EnsureParagraphHasTextLeaf;

impl NormalizePass for EnsureParagraphHasTextLeaf {
    fn id(&self) -> &'static str {
        "document.ensure_text_leaf"
    }

    fn run(&self, doc: &Document, registry: &ExtensionRegistry) -> Vec<Op> {
        text_blocks_in_order(doc, registry)
            .into_iter()
            .filter(|block| !block.el.children.iter().any(|node| matches!(node, Node::Text(_))))
            .map(|block| Op::InsertNode {
                path: child_path(&block.path, 0),
                node: Node::text("", Marks::default()),
            })
            .collect()
    }
}

/// Every inline void gets a text leaf on both sides so a caret can sit next to it.
struct EnsureTextAroundInlineVoids;

impl NormalizePass for EnsureTextAroundInlineVoids {
    fn id(&self) -> &'static str {
        "document.ensure_text_around_inline_voids"
    }

    fn run(&self, doc: &Document, registry: &ExtensionRegistry) -> Vec<Op> {
        let mut ops = Vec::new();
        for block in text_blocks_in_order(doc, registry) {
            let children = &block.el.children;
            let at = |ix: usize| child_path(&block.path, ix);
            for (ix, node) in children.iter().enumerate().rev() {
                if !matches!(node, Node::Void(_)) {
                    continue;
                }
                if !matches!(children.get(ix + 1), Some(Node::Text(_))) {
                    ops.push(Op::InsertNode {
                        path: at(ix + 1),
                        node: Node::text("", Marks::default()),
                    });
                }
                if ix == 0 || !matches!(children.get(ix - 1), Some(Node::Text(_))) {
                    ops.push(Op::InsertNode {
                        path: at(ix),
                        node: Node::text("", Marks::default()),
                    });
                }
            }
        }
        ops
    }
}

struct MergeAdjacentTextLeaves;

impl NormalizePass for MergeAdjacentTextLeaves {
    fn id(&self) -> &'static str {
        "document.merge_adjacent_text_leaves"
    }

    fn run(&self, doc: &Document, registry: &ExtensionRegistry) -> Vec<Op> {
        let mut ops = Vec::new();
        for block in text_blocks_in_order(doc, registry) {
            let children = &block.el.children;
            // Maximal runs of neighbouring equal-marked text leaves, as (first, last).
            let mut runs: Vec<(usize, usize)> = Vec::new();
            for (ix, node) in children.iter().enumerate() {
                let Node::Text(leaf) = node else {
                    continue;
                };
                match runs.last_mut() {
                    Some((_, last))
                        if *last + 1 == ix
                            && matches!(&children[*last], Node::Text(prev) if prev.marks == leaf.marks) =>
                    {
                        *last = ix;
                    }
                    _ => runs.push((ix, ix)),
                }
            }

            // Right to left, so earlier runs keep their indices.
            for &(first, last) in runs.iter().rev().filter(|(first, last)| first < last) {
                let Node::Text(head) = &children[first] else {
                    continue;
                };
                let tail: String = children[first + 1..=last]
                    .iter()
                    .filter_map(|node| match node {
                        Node::Text(leaf) => Some(leaf.text.as_str()),
                        _ => None,
                    })
                    .collect();
                if !tail.is_empty() {
                    ops.push(Op::InsertText {
                        path: child_path(&block.path, first),
                        offset: head.text.len(),
                        text: tail,
                    });
                }
                ops.extend(
                    (first + 1..=last)
                        .rev()
                        .map(|ix| Op::RemoveNode {
                            path: child_path(&block.path, ix),
                        }),
                );
            }
        }
        ops
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TextNode;

    fn registry() -> ExtensionRegistry {
        ExtensionRegistry::wysiwyg()
    }

    #[test]
    fn voids_get_text_on_both_sides() {
        let doc = Document {
            children: vec![Node::element(
                "paragraph",
                Default::default(),
                vec![Node::hard_break(), Node::hard_break()],
            )],
        };
        let ops = EnsureTextAroundInlineVoids.run(&doc, &registry());
        assert_eq!(ops.len(), 3);
        assert!(ops.iter().all(|op| matches!(op, Op::InsertNode { .. })));
    }

    #[test]
    fn merge_ignores_leaves_with_different_marks() {
        let bold = Marks {
            bold: true,
            ..Marks::default()
        };
        let doc = Document {
            children: vec![Node::element(
                "paragraph",
                Default::default(),
                vec![
                    Node::Text(TextNode {
                        text: "a".into(),
                        marks: bold.clone(),
                    }),
                    Node::text("b", Marks::default()),
                    Node::text("c", Marks::default()),
                ],
            )],
        };
        let ops = MergeAdjacentTextLeaves.run(&doc, &registry());
        assert_eq!(
            ops,
            vec![
                Op::InsertText {
                    path: vec![0, 1],
                    offset: 1,
                    text: "c".into()
                },
                Op::RemoveNode { path: vec![0, 2] },
            ]
        );
    }

    #[test]
    fn empty_blockquote_is_pruned() {
        let doc = Document {
            children: vec![Node::paragraph("x"), Node::element("blockquote", Default::default(), vec![])],
        };
        assert_eq!(
            PruneEmptyContainers.run(&doc, &registry()),
            vec![Op::RemoveNode { path: vec![1] }]
        );
    }
}
