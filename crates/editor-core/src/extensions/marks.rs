use serde_json::json;

use super::{Caret, delete_selection_in, edit_document, insert_inline_at, marks_before};
use crate::core::{Editor, LinkMark, Marks, Node, Point, Selection};
use crate::extension::{CommandSpec, Extension, arg_opt_str, arg_str};
use crate::ops::{Op, Path, Transaction};
use crate::tree::{
    apply_marks_in_block, clamp_to_char_boundary, element_at_path, element_mut, inline_len, node_ref,
    selected_text_blocks,
};

pub(super) struct MarksExtension;

impl Extension for MarksExtension {
    fn name(&self) -> &'static str {
        "marks"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::transaction("marks.toggle_bold", "Bold", |editor, _args| {
                toggle_bool_mark(editor, |m| m.bold, |m, v| m.bold = v)
            })
            .keywords(["bold", "strong"]),
            CommandSpec::transaction("marks.toggle_italic", "Italic", |editor, _args| {
                toggle_bool_mark(editor, |m| m.italic, |m, v| m.italic = v)
            })
            .keywords(["italic", "em"]),
            CommandSpec::transaction("marks.toggle_underline", "Underline", |editor, _args| {
                toggle_bool_mark(editor, |m| m.underline, |m, v| m.underline = v)
            })
            .keywords(["underline"]),
            CommandSpec::transaction("marks.toggle_strike", "Strikethrough", |editor, _args| {
                toggle_bool_mark(editor, |m| m.strike, |m, v| m.strike = v)
            })
            .keywords(["strike", "strikethrough"]),
            CommandSpec::transaction("marks.toggle_superscript", "Superscript", |editor, _args| {
                toggle_bool_mark(
                    editor,
                    |m| m.superscript,
                    |m, v| {
                        m.superscript = v;
                        if v {
                            m.subscript = false;
                        }
                    },
                )
            })
            .keywords(["superscript", "sup"]),
            CommandSpec::transaction("marks.toggle_subscript", "Subscript", |editor, _args| {
                toggle_bool_mark(
                    editor,
                    |m| m.subscript,
                    |m, v| {
                        m.subscript = v;
                        if v {
                            m.superscript = false;
                        }
                    },
                )
            })
            .keywords(["subscript", "sub"]),
            CommandSpec::transaction("marks.toggle_code", "Inline code", |editor, _args| {
                toggle_bool_mark(editor, |m| m.code, |m, v| m.code = v)
            })
            .keywords(["code", "monospace"]),
            CommandSpec::transaction("marks.unset_all", "Clear formatting", |editor, _args| {
                update_marks(editor, |_| Marks::default())
            })
            .description("Remove every mark from the selection.")
            .keywords(["clear", "formatting", "reset"]),
        ]
    }
}

pub(super) struct TextStyleExtension;

impl Extension for TextStyleExtension {
    fn name(&self) -> &'static str {
        "text_style"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::transaction("marks.set_font_family", "Font family", |editor, args| {
                let family = arg_str(args, "font_family")?;
                update_marks(editor, move |mut m| {
                    m.font_family = Some(family.clone());
                    m
                })
            })
            .args_example(json!({ "font_family": "Georgia" })),
            CommandSpec::transaction("marks.unset_font_family", "Default font family", |editor, _args| {
                update_marks(editor, |mut m| {
                    m.font_family = None;
                    m
                })
            }),
            CommandSpec::transaction("marks.set_font_size", "Font size", |editor, args| {
                let size = arg_str(args, "font_size")?;
                update_marks(editor, move |mut m| {
                    m.font_size = Some(size.clone());
                    m
                })
            })
            .args_example(json!({ "font_size": "18px" })),
            CommandSpec::transaction("marks.unset_font_size", "Default font size", |editor, _args| {
                update_marks(editor, |mut m| {
                    m.font_size = None;
                    m
                })
            }),
            CommandSpec::transaction("marks.set_color", "Text color", |editor, args| {
                let color = arg_str(args, "color")?;
                update_marks(editor, move |mut m| {
                    m.color = Some(color.clone());
                    m
                })
            })
            .args_example(json!({ "color": "#e03e2d" })),
            CommandSpec::transaction("marks.unset_color", "Default text color", |editor, _args| {
                update_marks(editor, |mut m| {
                    m.color = None;
                    m
                })
            }),
        ]
    }
}

pub(super) struct HighlightExtension;

impl Extension for HighlightExtension {
    fn name(&self) -> &'static str {
        "highlight"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::transaction("marks.set_highlight", "Background color", |editor, args| {
                let color = arg_opt_str(args, "color").unwrap_or_default();
                update_marks(editor, move |mut m| {
                    m.highlight = Some(color.clone());
                    m
                })
            })
            .keywords(["highlight", "background"])
            .args_example(json!({ "color": "#fbeeb8" })),
            CommandSpec::transaction("marks.unset_highlight", "Remove highlight", |editor, _args| {
                update_marks(editor, |mut m| {
                    m.highlight = None;
                    m
                })
            }),
        ]
    }
}

pub(super) struct LinkExtension;

impl Extension for LinkExtension {
    fn name(&self) -> &'static str {
        "link"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::transaction("link.insert", "Insert link", |editor, args| {
                let link = LinkMark {
                    href: arg_str(args, "href")?,
                    target: arg_opt_str(args, "target"),
                    title: arg_opt_str(args, "title").filter(|t| !t.is_empty()),
                };
                let text = arg_opt_str(args, "text").unwrap_or_default();
                insert_link(editor, link, &text)
            })
            .description("Link the selection, or the link under the caret, replacing its text when given.")
            .keywords(["link", "url", "anchor"])
            .args_example(json!({
                "href": "https://raytha.com",
                "text": "Raytha",
                "title": "",
                "target": "_blank"
            })),
            CommandSpec::transaction("link.unset", "Remove link", |editor, _args| {
                let sel = extended_link_selection(editor)?;
                apply_mark_range(editor, &sel, &|mut m: Marks| {
                    m.link = None;
                    m
                })
            })
            .keywords(["unlink"]),
        ]
    }
}

fn toggle_bool_mark(
    editor: &Editor,
    get: fn(&Marks) -> bool,
    set: fn(&mut Marks, bool),
) -> Result<Transaction, String> {
    let target = if editor.selection().is_collapsed() {
        !get(&editor.active_marks())
    } else {
        !editor.range_has_mark(&|m: &Marks| get(m))
    };
    update_marks(editor, move |mut marks| {
        set(&mut marks, target);
        marks
    })
}

fn update_marks(editor: &Editor, apply: impl Fn(Marks) -> Marks) -> Result<Transaction, String> {
    let sel = editor.selection().clone();
    if sel.is_collapsed() {
        return toggle_mark_at_caret(editor, apply);
    }
    apply_mark_range(editor, &sel, &apply)
}

/// Splits the caret leaf around an empty leaf carrying the new marks, so the
/// next typed character picks them up.
fn toggle_mark_at_caret(editor: &Editor, apply: impl Fn(Marks) -> Marks) -> Result<Transaction, String> {
    let focus = editor.selection().focus.clone();
    let Some((child_ix, block_path)) = focus.path.split_last() else {
        return Err("Selection is not in a text node".into());
    };
    let Some(Node::Text(text)) = node_ref(editor.doc(), &focus.path) else {
        return Err("Selection is not in a text node".into());
    };

    let marks_after = apply(text.marks.clone());
    if marks_after == text.marks {
        return Ok(Transaction::default());
    }

    if text.text.is_empty() {
        return Ok(Transaction::new(vec![Op::SetTextMarks {
            path: focus.path.clone(),
            marks: marks_after,
        }])
        .selection_after(Selection::collapsed(Point::new(focus.path.clone(), 0))));
    }

    let cursor = clamp_to_char_boundary(&text.text, focus.offset);
    let (left, right) = text.text.split_at(cursor);
    let mut replacement: Vec<Node> = Vec::new();
    let mut caret_ix = *child_ix;
    if !left.is_empty() {
        replacement.push(Node::text(left, text.marks.clone()));
        caret_ix += 1;
    }
    replacement.push(Node::text("", marks_after));
    if !right.is_empty() {
        replacement.push(Node::text(right, text.marks.clone()));
    }

    let mut ops = vec![Op::RemoveNode {
        path: focus.path.clone(),
    }];
    for (i, node) in replacement.into_iter().enumerate() {
        let mut path = block_path.to_vec();
        path.push(child_ix + i);
        ops.push(Op::InsertNode { path, node });
    }

    let mut caret = block_path.to_vec();
    caret.push(caret_ix);
    Ok(Transaction::new(ops).selection_after(Selection::collapsed(Point::new(caret, 0))))
}

fn apply_mark_range(editor: &Editor, sel: &Selection, apply: &dyn Fn(Marks) -> Marks) -> Result<Transaction, String> {
    let ranges: Vec<(Path, usize, usize)> = selected_text_blocks(editor.doc(), editor.registry(), sel)?
        .into_iter()
        .map(|(block, from, to)| (block.path, from, to))
        .collect();
    let anchor = Caret::of(editor.doc(), &sel.anchor);
    let focus = Caret::of(editor.doc(), &sel.focus);

    edit_document(editor, |doc| {
        for (path, from, to) in &ranges {
            let el = element_mut(doc, path).ok_or_else(|| "Selection block not found".to_string())?;
            el.children = apply_marks_in_block(&el.children, *from, *to, apply);
        }
        Ok(Selection::new(anchor.point(doc), focus.point(doc)))
    })
}

/// Global range of the run of leaves sharing the link found at `global`.
fn link_range(children: &[Node], global: usize) -> Option<(usize, usize)> {
    let mut spans: Vec<(usize, usize, Option<&LinkMark>)> = Vec::with_capacity(children.len());
    let mut cursor = 0usize;
    for node in children {
        let len = inline_len(node);
        let link = match node {
            Node::Text(t) => t.marks.link.as_ref(),
            _ => None,
        };
        spans.push((cursor, cursor + len, link));
        cursor += len;
    }

    let hit = spans
        .iter()
        .position(|(start, end, link)| link.is_some() && start < end && *start <= global && global <= *end)?;
    let link = spans[hit].2;
    let mut first = hit;
    while first > 0 && spans[first - 1].2 == link {
        first -= 1;
    }
    let mut last = hit;
    while last + 1 < spans.len() && spans[last + 1].2 == link {
        last += 1;
    }
    Some((spans[first].0, spans[last].1))
}

/// The selection, or the whole link under a collapsed caret.
fn extended_link_selection(editor: &Editor) -> Result<Selection, String> {
    let sel = editor.selection();
    if !sel.is_collapsed() {
        return Ok(sel.clone());
    }
    let caret = Caret::of(editor.doc(), &sel.focus);
    let el = element_at_path(editor.doc(), &caret.block).ok_or_else(|| "Caret is not in a text block".to_string())?;
    let Some((from, to)) = link_range(&el.children, caret.offset) else {
        return Ok(sel.clone());
    };
    Ok(Selection::new(
        Caret {
            block: caret.block.clone(),
            offset: from,
        }
        .point(editor.doc()),
        Caret {
            block: caret.block,
            offset: to,
        }
        .point(editor.doc()),
    ))
}

fn insert_link(editor: &Editor, link: LinkMark, text: &str) -> Result<Transaction, String> {
    let sel = extended_link_selection(editor)?;
    if text.is_empty() && !sel.is_collapsed() {
        return apply_mark_range(editor, &sel, &|mut m: Marks| {
            m.link = Some(link.clone());
            m
        });
    }

    let text = if text.is_empty() { link.href.clone() } else { text.to_string() };
    let registry = editor.registry();
    edit_document(editor, |doc| {
        let caret = delete_selection_in(doc, registry, &sel)?;
        let mut marks = element_at_path(doc, &caret.block)
            .map(|el| marks_before(&el.children, caret.offset))
            .unwrap_or_default();
        marks.link = Some(link);
        let caret = insert_inline_at(doc, &caret, vec![Node::text(text, marks)])?;
        Ok(caret.selection(doc))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linked(text: &str, href: &str) -> Node {
        Node::text(
            text,
            Marks {
                link: Some(LinkMark {
                    href: href.into(),
                    target: None,
                    title: None,
                }),
                ..Marks::default()
            },
        )
    }

    #[test]
    fn link_range_spans_leaves_with_the_same_link() {
        let children = vec![
            Node::text("go ", Marks::default()),
            linked("he", "/a"),
            linked("re", "/a"),
            linked("x", "/b"),
        ];
        assert_eq!(link_range(&children, 4), Some((3, 7)));
        assert_eq!(link_range(&children, 1), None);
    }
}
