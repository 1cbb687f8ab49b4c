use serde_json::{Value, json};

use super::{
    Caret, MAX_INDENT_LEVEL, delete_selection_in, edit_document, patch_selected_blocks, remove_at,
    retype_selected_blocks, split_block_at, text_of,
};
use crate::core::{AttrPatch, Attrs, Document, Editor, ElementNode, Marks, Node, Point, Selection};
use crate::extension::{
    CommandSpec, Extension, ExtensionRegistry, NodeRole, NodeSpec, NormalizePass, arg_bool, arg_str, arg_u64,
};
use crate::ops::{Op, Path, Transaction};
use crate::tree::{
    ancestor_element_path, block_path_of, children_at_path, children_mut, element_at_path, inline_plain_text,
    ordered_selection_points, selected_text_blocks, text_blocks_in_order,
};

/// Block attributes that survive a change of block type.
const CARRIED_ATTRS: &[&str] = &["text_align", "line_height", "indent"];

pub(super) fn carried_block_attrs(el: &ElementNode) -> Attrs {
    el.attrs
        .iter()
        .filter(|(key, _)| CARRIED_ATTRS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Inline content for a code block: one unmarked leaf.
fn plain_leaf(el: &ElementNode) -> Vec<Node> {
    vec![Node::text(inline_plain_text(&el.children), Marks::default())]
}

pub(super) struct HeadingExtension;

impl Extension for HeadingExtension {
    fn name(&self) -> &'static str {
        "heading"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec::text_block("heading")]
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![Box::new(NormalizeHeadingLevels)]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::transaction("block.set_heading", "Set heading", |editor, args| {
                let level = arg_u64(args, "level")?;
                let clear_font_size = arg_bool(args, "clear_font_size", true);
                set_heading(editor, level, clear_font_size)
            })
            .description("Convert the selected text blocks into headings.")
            .keywords(["heading", "title", "h1", "h2", "h3", "h4", "h5", "h6"])
            .args_example(json!({ "level": 2, "clear_font_size": true })),
            CommandSpec::transaction("block.set_paragraph", "Paragraph", |editor, _args| {
                retype_selected_blocks(editor, |el| match el.kind.as_str() {
                    "heading" => Some(Node::element("paragraph", carried_block_attrs(el), el.children.clone())),
                    "code_block" => Some(Node::element("paragraph", Attrs::default(), el.children.clone())),
                    _ => None,
                })
            })
            .keywords(["paragraph", "normal", "text"]),
        ]
    }
}

fn set_heading(editor: &Editor, level: u64, clear_font_size: bool) -> Result<Transaction, String> {
    if !(1..=6).contains(&level) {
        return Err(format!("Invalid heading level: {level}"));
    }
    let blocks = selected_text_blocks(editor.doc(), editor.registry(), editor.selection())?;
    if blocks.iter().any(|(block, _, _)| block.el.kind == "list_item") {
        return Err("Headings are not allowed inside list items".into());
    }

    retype_selected_blocks(editor, |el| {
        let children = if el.kind == "code_block" {
            plain_leaf(el)
        } else if clear_font_size {
            without_font_size(&el.children)
        } else {
            el.children.clone()
        };
        let mut attrs = carried_block_attrs(el);
        attrs.insert("level".into(), json!(level));
        Some(Node::element("heading", attrs, children))
    })
}

fn without_font_size(children: &[Node]) -> Vec<Node> {
    children
        .iter()
        .map(|node| match node {
            Node::Text(t) if t.marks.font_size.is_some() => {
                let mut marks = t.marks.clone();
                marks.font_size = None;
                Node::text(t.text.clone(), marks)
            }
            other => other.clone(),
        })
        .collect()
}

struct NormalizeHeadingLevels;

impl NormalizePass for NormalizeHeadingLevels {
    fn id(&self) -> &'static str {
        "heading.normalize_levels"
    }

    fn run(&self, doc: &Document, registry: &ExtensionRegistry) -> Vec<Op> {
        text_blocks_in_order(doc, registry)
            .into_iter()
            .filter(|block| block.el.kind == "heading")
            .filter_map(|block| {
                let level = block.el.attr_u64("level");
                let fixed = level.unwrap_or(1).clamp(1, 6);
                (level != Some(fixed)).then(|| Op::SetNodeAttrs {
                    path: block.path.clone(),
                    patch: AttrPatch::set("level", json!(fixed)),
                })
            })
            .collect()
    }
}

pub(super) struct BlockquoteExtension;

impl Extension for BlockquoteExtension {
    fn name(&self) -> &'static str {
        "blockquote"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec::container("blockquote")]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::transaction("blockquote.toggle", "Blockquote", |editor, _args| {
                let focus = &editor.selection().focus;
                match ancestor_element_path(editor.doc(), &focus.path, |el| el.kind == "blockquote") {
                    Some(quote) => unwrap_blockquote(editor, &quote),
                    None => wrap_in_blockquote(editor),
                }
            })
            .description("Wrap the selected blocks in a blockquote, or lift them out of one.")
            .keywords(["quote", "blockquote"]),
        ]
    }
}

fn wrap_in_blockquote(editor: &Editor) -> Result<Transaction, String> {
    let sel = editor.selection().clone();
    let (start, end) = ordered_selection_points(&sel);
    let start_block = block_path_of(&start);
    let end_block = block_path_of(&end);

    let common = start_block
        .iter()
        .zip(end_block.iter())
        .take_while(|(a, b)| a == b)
        .count()
        .min(start_block.len().saturating_sub(1))
        .min(end_block.len().saturating_sub(1));
    let parent: Path = start_block[..common].to_vec();
    if let Some(el) = element_at_path(editor.doc(), &parent) {
        if matches!(el.kind.as_str(), "table" | "table_row") {
            return Err("Cannot wrap table rows in a blockquote".into());
        }
    }
    let (first, last) = (start_block[common], end_block[common]);

    let siblings = children_at_path(editor.doc(), &parent).ok_or_else(|| "Selection parent is not a container".to_string())?;
    if last >= siblings.len() {
        return Err("Selection block range is out of bounds".into());
    }
    let quote = Node::element("blockquote", Attrs::default(), siblings[first..=last].to_vec());

    let mut ops: Vec<Op> = (first..=last)
        .rev()
        .map(|ix| {
            let mut path = parent.clone();
            path.push(ix);
            Op::RemoveNode { path }
        })
        .collect();
    let mut quote_path = parent.clone();
    quote_path.push(first);
    ops.push(Op::InsertNode {
        path: quote_path.clone(),
        node: quote,
    });

    let remap = |point: &Point| -> Point {
        let mut path = quote_path.clone();
        path.push(point.path[common] - first);
        path.extend_from_slice(&point.path[common + 1..]);
        Point::new(path, point.offset)
    };
    Ok(Transaction::new(ops).selection_after(Selection::new(remap(&sel.anchor), remap(&sel.focus))))
}

fn unwrap_blockquote(editor: &Editor, quote_path: &[usize]) -> Result<Transaction, String> {
    let sel = editor.selection().clone();
    let (quote_ix, parent) = quote_path
        .split_last()
        .ok_or_else(|| "Invalid blockquote path".to_string())?;
    let quote = element_at_path(editor.doc(), quote_path).ok_or_else(|| "Blockquote not found".to_string())?;

    let mut ops = vec![Op::RemoveNode {
        path: quote_path.to_vec(),
    }];
    for (i, node) in quote.children.iter().enumerate() {
        let mut path = parent.to_vec();
        path.push(quote_ix + i);
        ops.push(Op::InsertNode {
            path,
            node: node.clone(),
        });
    }

    let depth = quote_path.len();
    let remap = |point: &Point| -> Point {
        if point.path.len() <= depth || !point.path.starts_with(quote_path) {
            return point.clone();
        }
        let mut path = parent.to_vec();
        path.push(quote_ix + point.path[depth]);
        path.extend_from_slice(&point.path[depth + 1..]);
        Point::new(path, point.offset)
    };
    Ok(Transaction::new(ops).selection_after(Selection::new(remap(&sel.anchor), remap(&sel.focus))))
}

pub(super) struct CodeBlockExtension;

impl Extension for CodeBlockExtension {
    fn name(&self) -> &'static str {
        "code_block"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec::text_block("code_block")]
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![Box::new(NormalizeCodeBlockContent)]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::transaction("code_block.toggle", "Code block", |editor, args| {
                let language = args.and_then(|v| v.get("language")).cloned();
                toggle_code_block(editor, language)
            })
            .description("Turn the selected blocks into code blocks, or back into paragraphs.")
            .keywords(["code", "pre", "snippet"])
            .args_example(json!({ "language": "rust" })),
        ]
    }
}

fn toggle_code_block(editor: &Editor, language: Option<Value>) -> Result<Transaction, String> {
    let blocks = selected_text_blocks(editor.doc(), editor.registry(), editor.selection())?;
    let all_code = !blocks.is_empty() && blocks.iter().all(|(block, _, _)| block.el.kind == "code_block");

    retype_selected_blocks(editor, |el| {
        if all_code {
            return Some(Node::element("paragraph", Attrs::default(), plain_leaf(el)));
        }
        if el.kind == "code_block" {
            return None;
        }
        let mut attrs = Attrs::default();
        if let Some(language) = language.clone().filter(Value::is_string) {
            attrs.insert("language".into(), language);
        }
        Some(Node::element("code_block", attrs, plain_leaf(el)))
    })
}

/// Code blocks hold one unmarked text leaf.
struct NormalizeCodeBlockContent;

impl NormalizePass for NormalizeCodeBlockContent {
    fn id(&self) -> &'static str {
        "code_block.plain_content"
    }

    fn run(&self, doc: &Document, registry: &ExtensionRegistry) -> Vec<Op> {
        let mut ops = Vec::new();
        for block in text_blocks_in_order(doc, registry) {
            if block.el.kind != "code_block" {
                continue;
            }
            let plain = matches!(block.el.children.as_slice(), [Node::Text(t)] if t.marks == Marks::default());
            if !plain {
                ops.extend(crate::tree::replace_node_ops(
                    &block.path,
                    Node::element("code_block", block.el.attrs.clone(), plain_leaf(block.el)),
                ));
            }
        }
        ops
    }
}

pub(super) struct HorizontalRuleExtension;

impl Extension for HorizontalRuleExtension {
    fn name(&self) -> &'static str {
        "horizontal_rule"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec::void("horizontal_rule", NodeRole::Block)]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::transaction("horizontal_rule.insert", "Horizontal line", |editor, _args| {
                insert_block_void(editor, Node::horizontal_rule())
            })
            .keywords(["hr", "divider", "separator", "horizontal rule"]),
        ]
    }
}

/// Splits the caret block and puts `node` between the halves; an empty head
/// is replaced outright. Returns the paths of the inserted node and of the tail.
pub(super) fn insert_block_in(
    doc: &mut Document,
    registry: &ExtensionRegistry,
    sel: &Selection,
    node: Node,
) -> Result<(Path, Path), String> {
    let caret = delete_selection_in(doc, registry, sel)?;
    let tail = split_block_at(doc, &caret)?;
    let (tail_ix, parent) = tail
        .block
        .split_last()
        .map(|(ix, parent)| (*ix, parent.to_vec()))
        .ok_or_else(|| "Caret is not in a block".to_string())?;

    let head_empty = element_at_path(doc, &caret.block).is_some_and(|el| text_of(&el.children) == 0);
    let siblings = children_mut(doc, &parent).ok_or_else(|| "Parent is not a container".to_string())?;
    siblings.insert(tail_ix, node);
    let mut node_at = tail_ix;
    if head_empty {
        remove_at(doc, &caret.block)?;
        node_at -= 1;
    }

    let mut inserted = parent.clone();
    inserted.push(node_at);
    let mut tail = parent;
    tail.push(node_at + 1);
    Ok((inserted, tail))
}

pub(super) fn insert_block_void(editor: &Editor, node: Node) -> Result<Transaction, String> {
    let registry = editor.registry();
    let sel = editor.selection();
    edit_document(editor, |doc| {
        let (_, tail) = insert_block_in(doc, registry, sel, node)?;
        Ok(Caret::start_of(tail).selection(doc))
    })
}

pub(super) struct TextAlignExtension;

const ALIGNMENTS: &[&str] = &["left", "center", "right", "justify"];

impl Extension for TextAlignExtension {
    fn name(&self) -> &'static str {
        "text_align"
    }

    fn default_options(&self) -> Option<Value> {
        Some(json!({
            "types": ["paragraph", "heading", "list_item"],
            "alignments": ALIGNMENTS,
            "default_alignment": "left",
        }))
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::transaction("block.set_text_align", "Text align", |editor, args| {
                let align = arg_str(args, "align")?;
                if !ALIGNMENTS.contains(&align.as_str()) {
                    return Err(format!("Invalid text alignment: {align}"));
                }
                let types = option_list(editor, "text_align", "types");
                patch_selected_blocks(editor, |el| {
                    if !types.contains(&el.kind) {
                        return None;
                    }
                    let current = el.attr_str("text_align").unwrap_or("left");
                    if current == align {
                        return None;
                    }
                    Some(if align == "left" {
                        AttrPatch::remove("text_align")
                    } else {
                        AttrPatch::set("text_align", json!(align))
                    })
                })
            })
            .keywords(["align", "left", "center", "right", "justify"])
            .args_example(json!({ "align": "center" })),
        ]
    }
}

pub(super) struct LineHeightExtension;

impl Extension for LineHeightExtension {
    fn name(&self) -> &'static str {
        "line_height"
    }

    fn default_options(&self) -> Option<Value> {
        Some(json!({
            "types": ["paragraph", "heading", "list_item"],
            "heights": ["1", "1.1", "1.2", "1.3", "1.4", "1.5", "2"],
            "default_height": "1.4",
        }))
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::transaction("block.set_line_height", "Line height", |editor, args| {
                let height = arg_str(args, "height")?;
                if !option_list(editor, "line_height", "heights").contains(&height) {
                    return Err(format!("Line height {height} is not allowed"));
                }
                let types = option_list(editor, "line_height", "types");
                patch_selected_blocks(editor, |el| {
                    (types.contains(&el.kind) && el.attr_str("line_height") != Some(height.as_str()))
                        .then(|| AttrPatch::set("line_height", json!(height)))
                })
            })
            .keywords(["line height", "spacing"])
            .args_example(json!({ "height": "1.5" })),
            CommandSpec::transaction("block.unset_line_height", "Default line height", |editor, _args| {
                patch_selected_blocks(editor, |el| {
                    el.attrs
                        .contains_key("line_height")
                        .then(|| AttrPatch::remove("line_height"))
                })
            }),
        ]
    }
}

/// String entries of an array-valued extension option.
pub(super) fn option_list(editor: &Editor, extension: &str, key: &str) -> Vec<String> {
    editor
        .extension_options(extension)
        .and_then(|options| options.get(key))
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

pub(super) struct IndentExtension;

impl Extension for IndentExtension {
    fn name(&self) -> &'static str {
        "indent"
    }

    fn default_options(&self) -> Option<Value> {
        Some(json!({
            "types": ["paragraph", "heading"],
            "max_level": MAX_INDENT_LEVEL,
        }))
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::transaction("block.indent", "Increase indent", |editor, _args| {
                adjust_indent(editor, 1)
            })
            .keywords(["indent", "tab"]),
            CommandSpec::transaction("block.outdent", "Decrease indent", |editor, _args| {
                adjust_indent(editor, -1)
            })
            .keywords(["outdent", "dedent"]),
        ]
    }
}

fn adjust_indent(editor: &Editor, delta: i64) -> Result<Transaction, String> {
    let types = option_list(editor, "indent", "types");
    let max_level = editor
        .extension_options("indent")
        .and_then(|options| options.get("max_level"))
        .and_then(Value::as_u64)
        .unwrap_or(MAX_INDENT_LEVEL);

    let tx = patch_selected_blocks(editor, |el| {
        if !types.contains(&el.kind) {
            return None;
        }
        let current = el.attr_u64("indent").unwrap_or(0);
        let next = current.saturating_add_signed(delta).min(max_level);
        if next == current {
            return None;
        }
        Some(if next == 0 {
            AttrPatch::remove("indent")
        } else {
            AttrPatch::set("indent", json!(next))
        })
    })?;
    if tx.ops.is_empty() {
        return Err(if delta > 0 {
            "Nothing to indent".into()
        } else {
            "Nothing to outdent".into()
        });
    }
    Ok(tx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carried_attrs_drop_type_specific_ones() {
        let mut attrs = Attrs::default();
        attrs.insert("level".into(), json!(2));
        attrs.insert("text_align".into(), json!("center"));
        attrs.insert("indent".into(), json!(1));
        let el = ElementNode {
            kind: "heading".into(),
            attrs,
            children: vec![],
        };
        let carried = carried_block_attrs(&el);
        assert_eq!(carried.len(), 2);
        assert!(!carried.contains_key("level"));
    }
}
