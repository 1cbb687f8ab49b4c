//! Read-only views of the editor state, addressed by the camelCase names
//! toolbar code uses (`bold`, `textStyle`, `bulletList`, ...).

use serde_json::{Map, Value};

use crate::core::{Document, Editor, ElementNode, Marks, Node};
use crate::html::serialize_document;
use crate::tree::{
    block_path_of, element_ancestors, element_at_path, inline_plain_text, marks_at_global, node_ref,
    ordered_selection_points, selected_text_blocks, splice_inline, text_blocks_in_order,
    total_inline_text_len,
};

const MARK_NAMES: &[&str] = &[
    "bold",
    "italic",
    "underline",
    "strike",
    "superscript",
    "subscript",
    "code",
    "link",
    "highlight",
    "textStyle",
];

pub fn is_mark_name(name: &str) -> bool {
    MARK_NAMES.contains(&name)
}

fn camel_to_snake(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn snake_to_camel(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper = false;
    for c in key.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.push(c.to_ascii_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn mark_has(marks: &Marks, name: &str) -> bool {
    match name {
        "bold" => marks.bold,
        "italic" => marks.italic,
        "underline" => marks.underline,
        "strike" => marks.strike,
        "superscript" => marks.superscript,
        "subscript" => marks.subscript,
        "code" => marks.code,
        "link" => marks.link.is_some(),
        "highlight" => marks.highlight.is_some(),
        "textStyle" => marks.has_text_style(),
        _ => false,
    }
}

fn mark_attributes(marks: &Marks, name: &str) -> Map<String, Value> {
    let mut out = Map::new();
    let mut put = |key: &str, value: Option<&String>| {
        if let Some(value) = value {
            out.insert(key.to_string(), Value::String(value.clone()));
        }
    };
    match name {
        "textStyle" => {
            put("fontFamily", marks.font_family.as_ref());
            put("fontSize", marks.font_size.as_ref());
            put("color", marks.color.as_ref());
        }
        "highlight" => put("color", marks.highlight.as_ref()),
        "link" => {
            if let Some(link) = &marks.link {
                put("href", Some(&link.href));
                put("target", link.target.as_ref());
                put("title", link.title.as_ref());
            }
        }
        _ => {}
    }
    out
}

fn node_attributes(el: &ElementNode) -> Map<String, Value> {
    el.attrs
        .iter()
        .map(|(key, value)| (snake_to_camel(key), value.clone()))
        .collect()
}

fn attrs_match(actual: &Map<String, Value>, expected: Option<&Value>) -> bool {
    let Some(Value::Object(expected)) = expected else {
        return true;
    };
    expected.iter().all(|(key, want)| match actual.get(key) {
        Some(have) => have == want,
        // Left alignment is stored as the absence of the attribute.
        None => key == "textAlign" && want == "left",
    })
}

fn node_matches(el: &ElementNode, name: &str) -> bool {
    match name {
        "paragraph" => el.kind == "paragraph",
        "heading" => el.kind == "heading",
        "blockquote" => el.kind == "blockquote",
        "codeBlock" => el.kind == "code_block",
        "listItem" => el.kind == "list_item",
        "bulletList" => el.kind == "list_item" && el.attr_str("list_type") != Some("ordered"),
        "orderedList" => el.kind == "list_item" && el.attr_str("list_type") == Some("ordered"),
        "table" => el.kind == "table",
        "tableRow" => el.kind == "table_row",
        "tableCell" => el.kind == "table_cell",
        "tableHeader" => el.kind == "table_header",
        other => el.kind == camel_to_snake(other),
    }
}

fn mark_tag(marks: &Marks) -> Vec<&'static str> {
    let mut tags = Vec::new();
    for (on, tag) in [
        (marks.link.is_some(), "a"),
        (marks.bold, "strong"),
        (marks.italic, "em"),
        (marks.underline, "u"),
        (marks.strike, "s"),
        (marks.code, "code"),
        (marks.superscript, "sup"),
        (marks.subscript, "sub"),
        (marks.highlight.is_some(), "mark"),
        (marks.has_text_style(), "span"),
    ] {
        if on {
            tags.push(tag);
        }
    }
    tags
}

impl Editor {
    fn anchor_block(&self) -> Option<&ElementNode> {
        element_at_path(&self.doc, block_path_of(&self.selection.anchor))
    }

    /// Marks at the caret, or at the start of a range selection.
    pub fn active_marks(&self) -> Marks {
        if self.selection.is_collapsed() {
            return match node_ref(&self.doc, &self.selection.focus.path) {
                Some(Node::Text(t)) => t.marks.clone(),
                _ => Marks::default(),
            };
        }
        match selected_text_blocks(&self.doc, &self.registry, &self.selection) {
            Ok(blocks) => blocks
                .iter()
                .find(|(_, from, to)| from < to)
                .or(blocks.first())
                .map(|(block, from, _)| marks_at_global(&block.el.children, *from))
                .unwrap_or_default(),
            Err(_) => Marks::default(),
        }
    }

    /// Every text leaf touched by a range selection must carry the mark.
    pub(crate) fn range_has_mark(&self, pred: &dyn Fn(&Marks) -> bool) -> bool {
        let Ok(blocks) = selected_text_blocks(&self.doc, &self.registry, &self.selection) else {
            return false;
        };
        let mut seen = false;
        for (block, from, to) in &blocks {
            if from >= to {
                continue;
            }
            let mut cursor = 0usize;
            for node in &block.el.children {
                let len = crate::tree::inline_len(node);
                let (start, end) = (cursor, cursor + len);
                cursor = end;
                let Node::Text(t) = node else {
                    continue;
                };
                if *to <= start || *from >= end {
                    continue;
                }
                seen = true;
                if !pred(&t.marks) {
                    return false;
                }
            }
        }
        seen
    }

    pub fn is_active(&self, name: &str, attrs: Option<&Value>) -> bool {
        if name.is_empty() {
            let Some(block) = self.anchor_block() else {
                return false;
            };
            return attrs.is_some() && attrs_match(&node_attributes(block), attrs);
        }

        if is_mark_name(name) {
            let pred = |marks: &Marks| mark_has(marks, name) && attrs_match(&mark_attributes(marks, name), attrs);
            if self.selection.is_collapsed() {
                return pred(&self.active_marks());
            }
            return self.range_has_mark(&pred);
        }

        let block_path = block_path_of(&self.selection.anchor);
        element_ancestors(&self.doc, block_path)
            .into_iter()
            .rev()
            .any(|el| node_matches(el, name) && attrs_match(&node_attributes(el), attrs))
    }

    pub fn get_attributes(&self, name: &str) -> Value {
        if is_mark_name(name) {
            return Value::Object(mark_attributes(&self.active_marks(), name));
        }
        let block_path = block_path_of(&self.selection.anchor);
        element_ancestors(&self.doc, block_path)
            .into_iter()
            .rev()
            .find(|el| node_matches(el, name))
            .map(|el| Value::Object(node_attributes(el)))
            .unwrap_or_else(|| Value::Object(Map::new()))
    }

    /// Tag names from the outermost block to the caret, then the marks there.
    pub fn cursor_breadcrumb(&self) -> String {
        let (start, _) = ordered_selection_points(&self.selection);
        let mut tags: Vec<String> = Vec::new();

        for el in element_ancestors(&self.doc, block_path_of(&start)) {
            match el.kind.as_str() {
                "paragraph" => tags.push("p".into()),
                "heading" => tags.push(format!("h{}", el.attr_u64("level").unwrap_or(1))),
                "code_block" => tags.push("pre".into()),
                "blockquote" => tags.push("blockquote".into()),
                "list_item" => {
                    let list = if el.attr_str("list_type") == Some("ordered") { "ol" } else { "ul" };
                    tags.extend([list.to_string(), "li".into(), "p".into()]);
                }
                "table" => tags.push("table".into()),
                "table_row" => tags.push("tr".into()),
                "table_cell" => tags.push("td".into()),
                "table_header" => tags.push("th".into()),
                _ => {}
            }
        }

        if let Some(Node::Text(t)) = node_ref(&self.doc, &start.path) {
            tags.extend(mark_tag(&t.marks).into_iter().map(str::to_string));
        }
        tags.join(" > ")
    }

    pub fn get_html(&self) -> String {
        serialize_document(&self.doc)
    }

    /// Plain text of every text block, one block per line.
    pub fn get_text(&self) -> String {
        text_blocks_in_order(&self.doc, &self.registry)
            .iter()
            .map(|block| inline_plain_text(&block.el.children))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn word_count(&self) -> usize {
        self.get_text().split_whitespace().count()
    }

    pub fn character_count(&self) -> usize {
        text_blocks_in_order(&self.doc, &self.registry)
            .iter()
            .flat_map(|block| block.el.children.iter())
            .map(|node| match node {
                Node::Text(t) => t.text.chars().count(),
                _ => 0,
            })
            .sum()
    }

    /// The selected part of each touched text block, as standalone blocks.
    pub fn selected_fragment(&self) -> Document {
        if self.selection.is_collapsed() {
            return Document::default();
        }
        let Ok(blocks) = selected_text_blocks(&self.doc, &self.registry, &self.selection) else {
            return Document::default();
        };
        let children = blocks
            .into_iter()
            .map(|(block, from, to)| {
                let total = total_inline_text_len(&block.el.children);
                let head = splice_inline(&block.el.children, to, total, Vec::new());
                let slice = splice_inline(&head, 0, from, Vec::new());
                Node::element(block.el.kind.clone(), block.el.attrs.clone(), slice)
            })
            .collect();
        Document { children }
    }

    pub fn selected_html(&self) -> String {
        serialize_document(&self.selected_fragment())
    }

    pub fn selected_text(&self) -> String {
        self.selected_fragment()
            .children
            .iter()
            .filter_map(Node::as_element)
            .map(|el| inline_plain_text(&el.children))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_case_conversion() {
        assert_eq!(camel_to_snake("textAlign"), "text_align");
        assert_eq!(snake_to_camel("line_height"), "lineHeight");
        assert_eq!(snake_to_camel("level"), "level");
    }
}
