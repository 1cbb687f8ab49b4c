use crate::core::{ElementNode, LinkMark, Marks, Node, VoidNode};

pub(super) fn blocks_to_html(children: &[Node]) -> String {
    let mut out = String::new();
    write_blocks(children, &mut out);
    out
}

fn write_blocks(children: &[Node], out: &mut String) {
    let mut ix = 0usize;
    while ix < children.len() {
        match &children[ix] {
            Node::Element(el) if el.kind == "list_item" => {
                let run = children[ix..]
                    .iter()
                    .take_while(|n| matches!(n, Node::Element(el) if el.kind == "list_item"))
                    .count();
                write_list_run(&children[ix..ix + run], out);
                ix += run;
                continue;
            }
            Node::Element(el) => write_element(el, out),
            Node::Void(v) => write_void(v, out),
            Node::Text(t) => out.push_str(&escape_text(&t.text)),
        }
        ix += 1;
    }
}

fn list_tag(el: &ElementNode) -> &'static str {
    match el.attr_str("list_type") {
        Some("ordered") => "ol",
        _ => "ul",
    }
}

/// Flat `list_item` blocks become nested `<ul>`/`<ol>` trees keyed by `list_level`.
fn write_list_run(items: &[Node], out: &mut String) {
    let mut open: Vec<(&'static str, u64)> = Vec::new();

    for item in items {
        let Node::Element(el) = item else {
            continue;
        };
        let tag = list_tag(el);
        let level = el.attr_u64("list_level").unwrap_or(0);

        while let Some(&(open_tag, open_level)) = open.last() {
            if open_level > level || (open_level == level && open_tag != tag) {
                out.push_str("</li></");
                out.push_str(open_tag);
                out.push('>');
                open.pop();
                continue;
            }
            break;
        }

        match open.last() {
            Some(&(_, open_level)) if open_level == level => out.push_str("</li><li>"),
            _ => {
                out.push('<');
                out.push_str(tag);
                out.push_str("><li>");
                open.push((tag, level));
            }
        }

        out.push_str("<p");
        out.push_str(&block_style(el));
        out.push('>');
        write_inline(&el.children, out);
        out.push_str("</p>");
    }

    while let Some((tag, _)) = open.pop() {
        out.push_str("</li></");
        out.push_str(tag);
        out.push('>');
    }
}

fn write_element(el: &ElementNode, out: &mut String) {
    match el.kind.as_str() {
        "paragraph" => {
            out.push_str("<p");
            out.push_str(&block_style(el));
            out.push('>');
            write_inline(&el.children, out);
            out.push_str("</p>");
        }
        "heading" => {
            let level = el.attr_u64("level").unwrap_or(1).clamp(1, 6);
            out.push_str(&format!("<h{level}{}>", block_style(el)));
            write_inline(&el.children, out);
            out.push_str(&format!("</h{level}>"));
        }
        "code_block" => {
            out.push_str("<pre><code");
            if let Some(language) = el.attr_str("language") {
                out.push_str(&format!(" class=\"language-{}\"", escape_attr(language)));
            }
            out.push('>');
            let text: String = el
                .children
                .iter()
                .map(|n| match n {
                    Node::Text(t) => t.text.as_str(),
                    Node::Void(v) if v.kind == "hard_break" => "\n",
                    _ => "",
                })
                .collect();
            out.push_str(&escape_text(&text));
            out.push_str("</code></pre>");
        }
        "blockquote" => {
            out.push_str("<blockquote>");
            write_blocks(&el.children, out);
            out.push_str("</blockquote>");
        }
        "table" => {
            out.push_str("<table><tbody>");
            for row in &el.children {
                let Node::Element(row) = row else {
                    continue;
                };
                out.push_str("<tr>");
                for cell in &row.children {
                    let Node::Element(cell) = cell else {
                        continue;
                    };
                    let tag = if cell.kind == "table_header" { "th" } else { "td" };
                    out.push('<');
                    out.push_str(tag);
                    for key in ["colspan", "rowspan"] {
                        if let Some(span) = cell.attr_u64(key).filter(|span| *span > 1) {
                            out.push_str(&format!(" {key}=\"{span}\""));
                        }
                    }
                    out.push('>');
                    write_blocks(&cell.children, out);
                    out.push_str("</");
                    out.push_str(tag);
                    out.push('>');
                }
                out.push_str("</tr>");
            }
            out.push_str("</tbody></table>");
        }
        _ => {
            if el.children.iter().any(|n| matches!(n, Node::Element(_))) {
                write_blocks(&el.children, out);
            } else {
                out.push_str("<p>");
                write_inline(&el.children, out);
                out.push_str("</p>");
            }
        }
    }
}

fn write_void(v: &VoidNode, out: &mut String) {
    match v.kind.as_str() {
        "horizontal_rule" => out.push_str("<hr>"),
        "hard_break" => out.push_str("<br>"),
        "image" => {
            out.push_str(&format!(
                "<img src=\"{}\" alt=\"{}\">",
                escape_attr(v.attr_str("src").unwrap_or("")),
                escape_attr(v.attr_str("alt").unwrap_or(""))
            ));
        }
        "youtube" => {
            let width = v.attrs.get("width").and_then(|w| w.as_u64()).unwrap_or(640);
            let height = v.attrs.get("height").and_then(|h| h.as_u64()).unwrap_or(480);
            out.push_str(&format!(
                "<div data-youtube-video=\"\"><iframe src=\"{}\" width=\"{width}\" height=\"{height}\" allowfullscreen=\"true\"></iframe></div>",
                escape_attr(v.attr_str("src").unwrap_or(""))
            ));
        }
        other => {
            tracing::trace!(kind = other, "void kind has no html form");
        }
    }
}

fn block_style(el: &ElementNode) -> String {
    let mut parts: Vec<String> = Vec::new();
    if let Some(align) = el.attr_str("text_align").filter(|a| *a != "left") {
        parts.push(format!("text-align: {align}"));
    }
    if let Some(height) = el.attr_str("line_height") {
        parts.push(format!("line-height: {height}"));
    }
    if let Some(indent) = el.attr_u64("indent").filter(|i| *i > 0) {
        parts.push(format!("margin-left: {}em", indent * 2));
    }
    if parts.is_empty() {
        return String::new();
    }
    format!(" style=\"{};\"", escape_attr(&parts.join("; ")))
}

#[derive(Debug, Clone, PartialEq)]
enum MarkTag<'a> {
    Link(&'a LinkMark),
    Bold,
    Italic,
    Underline,
    Strike,
    Code,
    Superscript,
    Subscript,
    Highlight(&'a str),
    TextStyle {
        font_family: Option<&'a str>,
        font_size: Option<&'a str>,
        color: Option<&'a str>,
    },
}

impl MarkTag<'_> {
    fn open(&self) -> String {
        match self {
            MarkTag::Link(link) => {
                let mut tag = format!("<a href=\"{}\"", escape_attr(&link.href));
                if let Some(target) = &link.target {
                    tag.push_str(&format!(" target=\"{}\"", escape_attr(target)));
                }
                if let Some(title) = link.title.as_deref().filter(|t| !t.is_empty()) {
                    tag.push_str(&format!(" title=\"{}\"", escape_attr(title)));
                }
                tag.push_str(" rel=\"noopener noreferrer nofollow\">");
                tag
            }
            MarkTag::Bold => "<strong>".into(),
            MarkTag::Italic => "<em>".into(),
            MarkTag::Underline => "<u>".into(),
            MarkTag::Strike => "<s>".into(),
            MarkTag::Code => "<code>".into(),
            MarkTag::Superscript => "<sup>".into(),
            MarkTag::Subscript => "<sub>".into(),
            MarkTag::Highlight("") => "<mark>".into(),
            MarkTag::Highlight(color) => format!(
                "<mark data-color=\"{0}\" style=\"background-color: {0}; color: inherit\">",
                escape_attr(color)
            ),
            MarkTag::TextStyle {
                font_family,
                font_size,
                color,
            } => {
                let mut parts: Vec<String> = Vec::new();
                if let Some(family) = font_family {
                    parts.push(format!("font-family: {family}"));
                }
                if let Some(size) = font_size {
                    parts.push(format!("font-size: {size}"));
                }
                if let Some(color) = color {
                    parts.push(format!("color: {color}"));
                }
                format!("<span style=\"{}\">", escape_attr(&parts.join("; ")))
            }
        }
    }

    fn close(&self) -> &'static str {
        match self {
            MarkTag::Link(_) => "</a>",
            MarkTag::Bold => "</strong>",
            MarkTag::Italic => "</em>",
            MarkTag::Underline => "</u>",
            MarkTag::Strike => "</s>",
            MarkTag::Code => "</code>",
            MarkTag::Superscript => "</sup>",
            MarkTag::Subscript => "</sub>",
            MarkTag::Highlight(_) => "</mark>",
            MarkTag::TextStyle { .. } => "</span>",
        }
    }
}

fn mark_tags(marks: &Marks) -> Vec<MarkTag<'_>> {
    let mut tags = Vec::new();
    if let Some(link) = &marks.link {
        tags.push(MarkTag::Link(link));
    }
    if marks.bold {
        tags.push(MarkTag::Bold);
    }
    if marks.italic {
        tags.push(MarkTag::Italic);
    }
    if marks.underline {
        tags.push(MarkTag::Underline);
    }
    if marks.strike {
        tags.push(MarkTag::Strike);
    }
    if marks.code {
        tags.push(MarkTag::Code);
    }
    if marks.superscript {
        tags.push(MarkTag::Superscript);
    }
    if marks.subscript {
        tags.push(MarkTag::Subscript);
    }
    if let Some(color) = &marks.highlight {
        tags.push(MarkTag::Highlight(color));
    }
    if marks.has_text_style() {
        tags.push(MarkTag::TextStyle {
            font_family: marks.font_family.as_deref(),
            font_size: marks.font_size.as_deref(),
            color: marks.color.as_deref(),
        });
    }
    tags
}

/// Adjacent leaves that share a mark prefix share its open tags.
fn write_inline(children: &[Node], out: &mut String) {
    let mut open: Vec<MarkTag<'_>> = Vec::new();

    fn close_to(open: &mut Vec<MarkTag<'_>>, keep: usize, out: &mut String) {
        while open.len() > keep {
            if let Some(tag) = open.pop() {
                out.push_str(tag.close());
            }
        }
    }

    for node in children {
        match node {
            Node::Text(t) if t.text.is_empty() => {}
            Node::Text(t) => {
                let tags = mark_tags(&t.marks);
                let common = open
                    .iter()
                    .zip(tags.iter())
                    .take_while(|(a, b)| a == b)
                    .count();
                close_to(&mut open, common, out);
                for tag in tags.into_iter().skip(common) {
                    out.push_str(&tag.open());
                    open.push(tag);
                }
                out.push_str(&escape_text(&t.text));
            }
            Node::Void(v) => {
                close_to(&mut open, 0, out);
                write_void(v, out);
            }
            Node::Element(el) => {
                close_to(&mut open, 0, out);
                write_inline(&el.children, out);
            }
        }
    }
    close_to(&mut open, 0, out);
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            c => out.push(c),
        }
    }
    out
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Attrs, Document};
    use serde_json::json;

    fn bold() -> Marks {
        Marks {
            bold: true,
            ..Marks::default()
        }
    }

    #[test]
    fn shared_mark_prefix_is_not_reopened() {
        let doc = Document {
            children: vec![Node::element(
                "paragraph",
                Attrs::default(),
                vec![
                    Node::text("a", bold()),
                    Node::text(
                        "b",
                        Marks {
                            italic: true,
                            ..bold()
                        },
                    ),
                    Node::text("", Marks::default()),
                    Node::text("c", Marks::default()),
                ],
            )],
        };
        assert_eq!(
            blocks_to_html(&doc.children),
            "<p><strong>a<em>b</em></strong>c</p>"
        );
    }

    #[test]
    fn flat_list_items_nest_by_level() {
        let item = |ty: &str, level: u64, text: &str| {
            let mut attrs = Attrs::default();
            attrs.insert("list_type".into(), json!(ty));
            attrs.insert("list_level".into(), json!(level));
            Node::element("list_item", attrs, vec![Node::text(text, Marks::default())])
        };
        let html = blocks_to_html(&[
            item("bullet", 0, "a"),
            item("bullet", 1, "b"),
            item("bullet", 0, "c"),
            item("ordered", 0, "d"),
        ]);
        assert_eq!(
            html,
            "<ul><li><p>a</p><ul><li><p>b</p></li></ul></li><li><p>c</p></li></ul><ol><li><p>d</p></li></ol>"
        );
    }

    #[test]
    fn text_escapes_markup_and_nbsp() {
        assert_eq!(escape_text("a<b & c\u{a0}"), "a&lt;b &amp; c&nbsp;");
    }
}
