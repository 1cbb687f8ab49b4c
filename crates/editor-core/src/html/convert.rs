use serde_json::{Value, json};

use super::parse::{HtmlElement, HtmlNode};
use crate::core::{Attrs, Document, LinkMark, Marks, Node};

const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "figure", "footer",
    "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "iframe", "li", "main", "nav", "ol", "p",
    "pre", "section", "table", "tbody", "td", "tfoot", "th", "thead", "tr", "ul",
];

pub(super) fn document_from_tree(nodes: &[HtmlNode]) -> Document {
    Document {
        children: convert_blocks(nodes),
    }
}

fn is_block(node: &HtmlNode) -> bool {
    matches!(node, HtmlNode::Element(el) if BLOCK_ELEMENTS.contains(&el.name.as_str()))
}

/// Loose inline content between blocks is wrapped in paragraphs.
fn convert_blocks(nodes: &[HtmlNode]) -> Vec<Node> {
    let mut out = Vec::new();
    let mut pending: Vec<&HtmlNode> = Vec::new();

    for node in nodes {
        if is_block(node) {
            flush_paragraph(&mut pending, &mut out);
            if let HtmlNode::Element(el) = node {
                out.extend(convert_block(el));
            }
        } else {
            pending.push(node);
        }
    }
    flush_paragraph(&mut pending, &mut out);
    out
}

fn flush_paragraph(pending: &mut Vec<&HtmlNode>, out: &mut Vec<Node>) {
    if pending.is_empty() {
        return;
    }
    let inline = inline_children(pending.drain(..));
    if has_content(&inline) {
        out.push(Node::element("paragraph", Attrs::default(), inline));
    }
}

fn has_content(inline: &[Node]) -> bool {
    inline.iter().any(|n| match n {
        Node::Text(t) => !t.text.is_empty(),
        Node::Void(_) | Node::Element(_) => true,
    })
}

fn convert_block(el: &HtmlElement) -> Vec<Node> {
    match el.name.as_str() {
        "p" | "dt" | "dd" => vec![Node::element(
            "paragraph",
            block_attrs(el),
            inline_children(el.children.iter()),
        )],
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level: u64 = el.name[1..].parse().unwrap_or(1);
            let mut attrs = block_attrs(el);
            attrs.insert("level".into(), json!(level));
            vec![Node::element(
                "heading",
                attrs,
                inline_children(el.children.iter()),
            )]
        }
        "pre" => vec![code_block(el)],
        "blockquote" => {
            let mut children = convert_blocks(&el.children);
            if children.is_empty() {
                children.push(Node::paragraph(""));
            }
            vec![Node::element("blockquote", Attrs::default(), children)]
        }
        "ul" | "ol" => convert_list(el, 0),
        "li" => convert_list_item(el, "bullet", 0),
        "table" => convert_table(el).into_iter().collect(),
        "hr" => vec![Node::horizontal_rule()],
        "iframe" => youtube(el).into_iter().collect(),
        "div" if el.has_attr("data-youtube-video") => {
            find_descendant(el, "iframe").and_then(youtube).into_iter().collect()
        }
        _ => convert_blocks(&el.children),
    }
}

fn find_descendant<'a>(el: &'a HtmlElement, name: &str) -> Option<&'a HtmlElement> {
    el.children.iter().find_map(|child| match child {
        HtmlNode::Element(child) if child.name == name => Some(child),
        HtmlNode::Element(child) => find_descendant(child, name),
        HtmlNode::Text(_) => None,
    })
}

fn youtube(iframe: &HtmlElement) -> Option<Node> {
    let src = iframe.attr("src").filter(|s| !s.is_empty())?;
    let mut attrs = Attrs::default();
    attrs.insert("src".into(), json!(src));
    for key in ["width", "height"] {
        if let Some(value) = iframe.attr(key).and_then(|v| v.parse::<u64>().ok()) {
            attrs.insert(key.into(), json!(value));
        }
    }
    Some(Node::void("youtube", attrs))
}

fn code_block(pre: &HtmlElement) -> Node {
    fn collect(nodes: &[HtmlNode], out: &mut String) {
        for node in nodes {
            match node {
                HtmlNode::Text(t) => out.push_str(t),
                HtmlNode::Element(el) if el.name == "br" => out.push('\n'),
                HtmlNode::Element(el) => collect(&el.children, out),
            }
        }
    }

    let mut text = String::new();
    collect(&pre.children, &mut text);
    if let Some(stripped) = text.strip_prefix('\n') {
        text = stripped.to_string();
    }

    let mut attrs = Attrs::default();
    let language = find_descendant(pre, "code")
        .and_then(|code| code.attr("class"))
        .and_then(|class| {
            class
                .split_whitespace()
                .find_map(|c| c.strip_prefix("language-"))
        });
    if let Some(language) = language {
        attrs.insert("language".into(), json!(language));
    }
    Node::element("code_block", attrs, vec![Node::text(text, Marks::default())])
}

fn list_item(list_type: &str, level: u64, mut attrs: Attrs, children: Vec<Node>) -> Node {
    attrs.insert("list_type".into(), json!(list_type));
    attrs.insert("list_level".into(), json!(level));
    Node::element("list_item", attrs, children)
}

fn convert_list(list: &HtmlElement, level: u64) -> Vec<Node> {
    let list_type = if list.name == "ol" { "ordered" } else { "bullet" };
    let mut out = Vec::new();
    for child in &list.children {
        match child {
            HtmlNode::Element(el) if el.name == "li" => out.extend(convert_list_item(el, list_type, level)),
            HtmlNode::Element(el) if matches!(el.name.as_str(), "ul" | "ol") => {
                out.extend(convert_list(el, level + 1))
            }
            HtmlNode::Element(el) => {
                let inline = inline_children(std::iter::once(child));
                if has_content(&inline) {
                    out.push(list_item(list_type, level, block_attrs(el), inline));
                }
            }
            HtmlNode::Text(_) => {
                let inline = inline_children(std::iter::once(child));
                if has_content(&inline) {
                    out.push(list_item(list_type, level, Attrs::default(), inline));
                }
            }
        }
    }
    out
}

/// One `<li>` becomes one item per text block it holds; nested lists go one level deeper.
fn convert_list_item(li: &HtmlElement, list_type: &str, level: u64) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::new();
    let mut own_item = false;
    let mut pending: Vec<&HtmlNode> = Vec::new();

    for child in &li.children {
        match child {
            HtmlNode::Element(el) if matches!(el.name.as_str(), "ul" | "ol") => {
                flush_list_item(&mut pending, &mut out, &mut own_item, list_type, level);
                if !own_item {
                    out.push(list_item(list_type, level, Attrs::default(), vec![Node::text("", Marks::default())]));
                    own_item = true;
                }
                out.extend(convert_list(el, level + 1));
            }
            HtmlNode::Element(el) if is_block(child) => {
                flush_list_item(&mut pending, &mut out, &mut own_item, list_type, level);
                for block in convert_block(el) {
                    match block {
                        Node::Element(block)
                            if matches!(block.kind.as_str(), "paragraph" | "heading" | "code_block") =>
                        {
                            let mut attrs = block.attrs;
                            attrs.remove("level");
                            attrs.remove("language");
                            out.push(list_item(list_type, level, attrs, block.children));
                            own_item = true;
                        }
                        other => out.push(other),
                    }
                }
            }
            _ => pending.push(child),
        }
    }
    flush_list_item(&mut pending, &mut out, &mut own_item, list_type, level);

    if !own_item {
        out.insert(0, list_item(list_type, level, Attrs::default(), vec![Node::text("", Marks::default())]));
    }
    out
}

fn flush_list_item(
    pending: &mut Vec<&HtmlNode>,
    out: &mut Vec<Node>,
    own_item: &mut bool,
    list_type: &str,
    level: u64,
) {
    if pending.is_empty() {
        return;
    }
    let inline = inline_children(pending.drain(..));
    if has_content(&inline) {
        out.push(list_item(list_type, level, Attrs::default(), inline));
        *own_item = true;
    }
}

fn convert_table(table: &HtmlElement) -> Option<Node> {
    fn rows<'a>(el: &'a HtmlElement, out: &mut Vec<&'a HtmlElement>) {
        for child in &el.children {
            let HtmlNode::Element(child) = child else {
                continue;
            };
            match child.name.as_str() {
                "tr" => out.push(child),
                "thead" | "tbody" | "tfoot" => rows(child, out),
                _ => {}
            }
        }
    }

    let mut trs = Vec::new();
    rows(table, &mut trs);

    let rows: Vec<Node> = trs
        .into_iter()
        .filter_map(|tr| {
            let cells: Vec<Node> = tr
                .children
                .iter()
                .filter_map(|cell| match cell {
                    HtmlNode::Element(cell) if matches!(cell.name.as_str(), "td" | "th") => Some(cell),
                    _ => None,
                })
                .map(|cell| {
                    let kind = if cell.name == "th" { "table_header" } else { "table_cell" };
                    let mut attrs = Attrs::default();
                    for key in ["colspan", "rowspan"] {
                        if let Some(span) = cell.attr(key).and_then(|v| v.trim().parse::<u64>().ok()) {
                            if span > 1 {
                                attrs.insert(key.into(), json!(span));
                            }
                        }
                    }
                    let mut children = convert_blocks(&cell.children);
                    if children.is_empty() {
                        children.push(Node::paragraph(""));
                    }
                    Node::element(kind, attrs, children)
                })
                .collect();
            (!cells.is_empty()).then(|| Node::element("table_row", Attrs::default(), cells))
        })
        .collect();

    (!rows.is_empty()).then(|| Node::element("table", Attrs::default(), rows))
}

fn style_map(el: &HtmlElement) -> Vec<(String, String)> {
    el.attr("style")
        .map(|style| {
            style
                .split(';')
                .filter_map(|decl| {
                    let (key, value) = decl.split_once(':')?;
                    let key = key.trim().to_ascii_lowercase();
                    let value = value.trim().to_string();
                    (!key.is_empty() && !value.is_empty()).then_some((key, value))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn style_value(styles: &[(String, String)], key: &str) -> Option<String> {
    styles.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
}

fn block_attrs(el: &HtmlElement) -> Attrs {
    let styles = style_map(el);
    let mut attrs = Attrs::default();
    if let Some(align) = style_value(&styles, "text-align")
        .filter(|a| matches!(a.as_str(), "center" | "right" | "justify"))
    {
        attrs.insert("text_align".into(), Value::String(align));
    }
    if let Some(height) = style_value(&styles, "line-height") {
        attrs.insert("line_height".into(), Value::String(height));
    }
    let indent = style_value(&styles, "margin-left")
        .and_then(|m| m.strip_suffix("em").and_then(|n| n.trim().parse::<f64>().ok()))
        .map(|em| (em / 2.0).round() as u64)
        .filter(|n| *n > 0);
    if let Some(indent) = indent {
        attrs.insert("indent".into(), json!(indent));
    }
    attrs
}

fn inline_children<'a>(nodes: impl Iterator<Item = &'a HtmlNode>) -> Vec<Node> {
    let mut out = Vec::new();
    for node in nodes {
        convert_inline(node, &Marks::default(), &mut out);
    }
    collapse_whitespace(out)
}

fn convert_inline(node: &HtmlNode, marks: &Marks, out: &mut Vec<Node>) {
    let el = match node {
        HtmlNode::Text(text) => {
            out.push(Node::text(text.clone(), marks.clone()));
            return;
        }
        HtmlNode::Element(el) => el,
    };

    let mut marks = marks.clone();
    match el.name.as_str() {
        "br" => {
            out.push(Node::hard_break());
            return;
        }
        "img" => {
            let mut attrs = Attrs::default();
            attrs.insert("src".into(), json!(el.attr("src").unwrap_or("")));
            if let Some(alt) = el.attr("alt") {
                attrs.insert("alt".into(), json!(alt));
            }
            out.push(Node::void("image", attrs));
            return;
        }
        "strong" | "b" => marks.bold = true,
        "em" | "i" => marks.italic = true,
        "u" => marks.underline = true,
        "s" | "strike" | "del" => marks.strike = true,
        "code" => marks.code = true,
        "sup" => {
            marks.superscript = true;
            marks.subscript = false;
        }
        "sub" => {
            marks.subscript = true;
            marks.superscript = false;
        }
        "mark" => {
            let color = el
                .attr("data-color")
                .map(str::to_string)
                .or_else(|| style_value(&style_map(el), "background-color"))
                .unwrap_or_default();
            marks.highlight = Some(color);
        }
        "span" => {
            let styles = style_map(el);
            if let Some(family) = style_value(&styles, "font-family") {
                marks.font_family = Some(family);
            }
            if let Some(size) = style_value(&styles, "font-size") {
                marks.font_size = Some(size);
            }
            if let Some(color) = style_value(&styles, "color") {
                marks.color = Some(color);
            }
        }
        "a" => {
            if let Some(href) = el.attr("href") {
                marks.link = Some(LinkMark {
                    href: href.to_string(),
                    target: el.attr("target").map(str::to_string),
                    title: el.attr("title").filter(|t| !t.is_empty()).map(str::to_string),
                });
            }
        }
        _ => {}
    }

    for child in &el.children {
        convert_inline(child, &marks, out);
    }
}

/// Collapses whitespace runs outside `<pre>` and trims them at the block edges.
fn collapse_whitespace(nodes: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(nodes.len());
    let mut after_space = true;

    for node in nodes {
        match node {
            Node::Text(mut t) => {
                let mut collapsed = String::with_capacity(t.text.len());
                for c in t.text.chars() {
                    if matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0c') {
                        if !after_space {
                            collapsed.push(' ');
                            after_space = true;
                        }
                    } else {
                        collapsed.push(c);
                        after_space = false;
                    }
                }
                t.text = collapsed;
                if !t.text.is_empty() {
                    out.push(Node::Text(t));
                }
            }
            Node::Void(v) => {
                after_space = v.kind == "hard_break";
                out.push(Node::Void(v));
            }
            other => out.push(other),
        }
    }

    if let Some(Node::Text(last)) = out.last_mut() {
        if last.text.ends_with(' ') {
            last.text.pop();
        }
        if last.text.is_empty() {
            out.pop();
        }
    }

    if !out.iter().any(|n| matches!(n, Node::Text(_))) {
        out.insert(0, Node::text("", Marks::default()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::parse::parse_tree;

    fn convert(html: &str) -> Document {
        document_from_tree(&parse_tree(html).unwrap())
    }

    fn texts(node: &Node) -> Vec<String> {
        match node {
            Node::Element(el) => el
                .children
                .iter()
                .filter_map(|n| match n {
                    Node::Text(t) => Some(t.text.clone()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    #[test]
    fn loose_inline_content_is_wrapped_and_whitespace_collapsed() {
        let doc = convert("  hello   <b>big</b>\n world  <p>next</p>\n");
        assert_eq!(doc.children.len(), 2);
        assert_eq!(texts(&doc.children[0]), vec!["hello ", "big", " world"]);
        assert_eq!(texts(&doc.children[1]), vec!["next"]);
    }

    #[test]
    fn pre_keeps_whitespace() {
        let doc = convert("<pre><code>\nfn main() {\n    x\n}</code></pre>");
        assert_eq!(texts(&doc.children[0]), vec!["fn main() {\n    x\n}"]);
    }

    #[test]
    fn nested_lists_flatten_with_levels() {
        let doc = convert("<ul><li><p>a</p><ol><li>b</li></ol></li><li>c</li></ul>");
        let levels: Vec<(String, u64)> = doc
            .children
            .iter()
            .filter_map(Node::as_element)
            .map(|el| {
                (
                    el.attr_str("list_type").unwrap_or("").to_string(),
                    el.attr_u64("list_level").unwrap_or(99),
                )
            })
            .collect();
        assert_eq!(
            levels,
            vec![
                ("bullet".to_string(), 0),
                ("ordered".to_string(), 1),
                ("bullet".to_string(), 0)
            ]
        );
    }

    #[test]
    fn block_styles_become_attrs() {
        let doc = convert("<p style=\"text-align: center; line-height: 2; margin-left: 4em\">x</p>");
        let Some(el) = doc.children[0].as_element() else {
            panic!("expected paragraph");
        };
        assert_eq!(el.attr_str("text_align"), Some("center"));
        assert_eq!(el.attr_str("line_height"), Some("2"));
        assert_eq!(el.attr_u64("indent"), Some(2));
    }
}
