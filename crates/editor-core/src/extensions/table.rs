use serde_json::json;

use super::blocks::insert_block_in;
use super::{Caret, edit_document};
use crate::core::{Attrs, Document, Editor, ElementNode, Node, Selection};
use crate::extension::{CommandSpec, Extension, ExtensionRegistry, NodeSpec, NormalizePass, arg_bool, arg_u64};
use crate::ops::{Op, Path, Transaction};
use crate::tree::{ancestor_element_path, children_mut, element_at_path, element_mut, text_blocks_in_order};

const MAX_TABLE_SIZE: u64 = 32;

pub(super) struct TableExtension;

impl Extension for TableExtension {
    fn name(&self) -> &'static str {
        "table"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        ["table", "table_row", "table_cell", "table_header"]
            .into_iter()
            .map(NodeSpec::container)
            .collect()
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![Box::new(NormalizeTableStructure)]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::transaction("table.insert", "Insert table", |editor, args| {
                let rows = arg_u64(args, "rows")?.clamp(1, MAX_TABLE_SIZE) as usize;
                let cols = arg_u64(args, "cols")?.clamp(1, MAX_TABLE_SIZE) as usize;
                let with_header_row = arg_bool(args, "with_header_row", true);
                insert_table(editor, rows, cols, with_header_row)
            })
            .description("Insert a table at the current selection.")
            .keywords(["table", "grid"])
            .args_example(json!({ "rows": 3, "cols": 3, "with_header_row": true })),
            CommandSpec::transaction("table.delete", "Delete table", |editor, _args| delete_table(editor))
                .keywords(["table", "delete", "remove"]),
            CommandSpec::transaction("table.add_row_before", "Add row before", |editor, _args| {
                add_row(editor, false)
            })
            .keywords(["table", "row", "insert"]),
            CommandSpec::transaction("table.add_row_after", "Add row after", |editor, _args| {
                add_row(editor, true)
            })
            .keywords(["table", "row", "insert"]),
            CommandSpec::transaction("table.add_column_before", "Add column before", |editor, _args| {
                add_column(editor, false)
            })
            .keywords(["table", "column", "insert"]),
            CommandSpec::transaction("table.add_column_after", "Add column after", |editor, _args| {
                add_column(editor, true)
            })
            .keywords(["table", "column", "insert"]),
            CommandSpec::transaction("table.delete_row", "Delete row", |editor, _args| delete_row(editor))
                .keywords(["table", "row", "delete", "remove"]),
            CommandSpec::transaction("table.delete_column", "Delete column", |editor, _args| {
                delete_column(editor)
            })
            .keywords(["table", "column", "delete", "remove"]),
            CommandSpec::transaction("table.merge_cells", "Merge cells", |editor, _args| merge_cells(editor))
                .description("Merge the selected cells of one row into a single cell."),
            CommandSpec::transaction("table.split_cell", "Split cell", |editor, _args| split_cell(editor)),
            CommandSpec::transaction("table.toggle_header_row", "Toggle header row", |editor, _args| {
                toggle_header(editor, HeaderScope::Row)
            }),
            CommandSpec::transaction("table.toggle_header_column", "Toggle header column", |editor, _args| {
                toggle_header(editor, HeaderScope::Column)
            }),
            CommandSpec::transaction("table.toggle_header_cell", "Toggle header cell", |editor, _args| {
                toggle_header(editor, HeaderScope::Cell)
            }),
            // Structure is repaired by normalization after every transaction.
            CommandSpec::transaction("table.fix", "Fix table", |editor, _args| {
                TableContext::at(editor.doc(), &editor.selection().focus.path)?;
                Ok(Transaction::default())
            }),
        ]
    }
}

fn is_cell(el: &ElementNode) -> bool {
    matches!(el.kind.as_str(), "table_cell" | "table_header")
}

fn span(node: &Node, key: &str) -> usize {
    node.as_element()
        .and_then(|el| el.attr_u64(key))
        .map_or(1, |span| span.max(1) as usize)
}

fn empty_cell(kind: &str) -> Node {
    Node::element(kind, Attrs::default(), vec![Node::paragraph("")])
}

fn is_header_row(row: &ElementNode) -> bool {
    !row.children.is_empty()
        && row
            .children
            .iter()
            .all(|cell| cell.as_element().is_some_and(|el| el.kind == "table_header"))
}

fn row_width(row: &ElementNode) -> usize {
    row.children.iter().map(|cell| span(cell, "colspan")).sum()
}

/// Index of the cell covering grid column `col`, with the column it starts at.
fn cell_at_column(row: &ElementNode, col: usize) -> Option<(usize, usize)> {
    let mut start = 0usize;
    for (ix, cell) in row.children.iter().enumerate() {
        let width = span(cell, "colspan");
        if col < start + width {
            return Some((ix, start));
        }
        start += width;
    }
    None
}

fn set_span(cell: &mut Node, key: &str, value: usize) {
    if let Node::Element(el) = cell {
        if value > 1 {
            el.attrs.insert(key.into(), json!(value));
        } else {
            el.attrs.remove(key);
        }
    }
}

/// Where the caret sits inside a table.
struct TableContext {
    table: Path,
    row: usize,
    cell: usize,
    col_start: usize,
    col_span: usize,
}

impl TableContext {
    fn at(doc: &Document, path: &[usize]) -> Result<Self, String> {
        let cell_path = ancestor_element_path(doc, path, is_cell).ok_or_else(|| "Selection is not in a table".to_string())?;
        let [table @ .., row, cell] = cell_path.as_slice() else {
            return Err("Selection is not in a table".into());
        };
        let row_el = element_at_path(doc, &cell_path[..cell_path.len() - 1])
            .ok_or_else(|| "Selection is not in a table".to_string())?;
        let col_start = row_el.children[..*cell].iter().map(|c| span(c, "colspan")).sum();
        Ok(Self {
            table: table.to_vec(),
            row: *row,
            cell: *cell,
            col_start,
            col_span: span(&row_el.children[*cell], "colspan"),
        })
    }

    fn row_path(&self, row: usize) -> Path {
        let mut path = self.table.clone();
        path.push(row);
        path
    }

    fn cell_path(&self, row: usize, cell: usize) -> Path {
        let mut path = self.row_path(row);
        path.push(cell);
        path
    }
}

fn table_mut<'a>(doc: &'a mut Document, ctx: &TableContext) -> Result<&'a mut ElementNode, String> {
    element_mut(doc, &ctx.table).ok_or_else(|| "Table not found".to_string())
}

fn rows_mut(table: &mut ElementNode) -> impl Iterator<Item = &mut ElementNode> {
    table.children.iter_mut().filter_map(|row| match row {
        Node::Element(el) if el.kind == "table_row" => Some(el),
        _ => None,
    })
}

/// Caret at the start of the first text block under `prefix`.
fn caret_in(doc: &Document, registry: &ExtensionRegistry, prefix: &[usize]) -> Selection {
    let block = text_blocks_in_order(doc, registry)
        .into_iter()
        .find(|block| block.path.starts_with(prefix))
        .map(|block| block.path)
        .unwrap_or_else(|| prefix.to_vec());
    Caret::start_of(block).selection(doc)
}

fn insert_table(editor: &Editor, rows: usize, cols: usize, with_header_row: bool) -> Result<Transaction, String> {
    let row = |kind: &str| Node::element("table_row", Attrs::default(), (0..cols).map(|_| empty_cell(kind)).collect());
    let table = Node::element(
        "table",
        Attrs::default(),
        (0..rows)
            .map(|ix| row(if ix == 0 && with_header_row { "table_header" } else { "table_cell" }))
            .collect(),
    );
    let registry = editor.registry();
    let sel = editor.selection();
    edit_document(editor, |doc| {
        let (inserted, _) = insert_block_in(doc, registry, sel, table)?;
        Ok(caret_in(doc, registry, &inserted))
    })
}

fn delete_table(editor: &Editor) -> Result<Transaction, String> {
    let ctx = TableContext::at(editor.doc(), &editor.selection().focus.path)?;
    edit_document(editor, |doc| {
        let (ix, parent) = ctx.table.split_last().ok_or_else(|| "Table not found".to_string())?;
        let siblings = children_mut(doc, parent).ok_or_else(|| "Table not found".to_string())?;
        siblings[*ix] = Node::paragraph("");
        Ok(Caret::start_of(ctx.table.clone()).selection(doc))
    })
}

fn add_row(editor: &Editor, after: bool) -> Result<Transaction, String> {
    let ctx = TableContext::at(editor.doc(), &editor.selection().focus.path)?;
    let mut caret = Caret::of(editor.doc(), &editor.selection().focus);
    edit_document(editor, |doc| {
        let table = table_mut(doc, &ctx)?;
        let width = table.children.iter().filter_map(Node::as_element).map(row_width).max().unwrap_or(1);
        let reference = table
            .children
            .get(ctx.row)
            .and_then(Node::as_element)
            .ok_or_else(|| "Row not found".to_string())?;
        let header_row = is_header_row(reference);
        // A header column continues into the new row; a header row does not.
        let cells = (0..width)
            .map(|col| {
                let header = !header_row
                    && cell_at_column(reference, col)
                        .and_then(|(ix, _)| reference.children[ix].as_element())
                        .is_some_and(|el| el.kind == "table_header");
                empty_cell(if header { "table_header" } else { "table_cell" })
            })
            .collect();
        let at = if after { ctx.row + 1 } else { ctx.row };
        table.children.insert(at, Node::element("table_row", Attrs::default(), cells));
        if !after {
            caret.block[ctx.table.len()] += 1;
        }
        Ok(caret.selection(doc))
    })
}

fn add_column(editor: &Editor, after: bool) -> Result<Transaction, String> {
    let ctx = TableContext::at(editor.doc(), &editor.selection().focus.path)?;
    let mut caret = Caret::of(editor.doc(), &editor.selection().focus);
    let col = if after { ctx.col_start + ctx.col_span } else { ctx.col_start };
    edit_document(editor, |doc| {
        let table = table_mut(doc, &ctx)?;
        for row in rows_mut(table) {
            let kind = if is_header_row(row) { "table_header" } else { "table_cell" };
            match cell_at_column(row, col) {
                // The new column runs through a spanning cell, which widens instead.
                Some((ix, start)) if start < col => {
                    let width = span(&row.children[ix], "colspan");
                    set_span(&mut row.children[ix], "colspan", width + 1);
                }
                Some((ix, _)) => row.children.insert(ix, empty_cell(kind)),
                None => row.children.push(empty_cell(kind)),
            }
        }
        if !after {
            caret.block[ctx.table.len() + 1] += 1;
        }
        Ok(caret.selection(doc))
    })
}

fn delete_row(editor: &Editor) -> Result<Transaction, String> {
    let ctx = TableContext::at(editor.doc(), &editor.selection().focus.path)?;
    let row_count = element_at_path(editor.doc(), &ctx.table).map_or(0, |t| t.children.len());
    if row_count <= 1 {
        return delete_table(editor);
    }
    let registry = editor.registry();
    edit_document(editor, |doc| {
        let table = table_mut(doc, &ctx)?;
        table.children.remove(ctx.row);
        let row = ctx.row.min(table.children.len() - 1);
        Ok(caret_in(doc, registry, &ctx.row_path(row)))
    })
}

fn delete_column(editor: &Editor) -> Result<Transaction, String> {
    let ctx = TableContext::at(editor.doc(), &editor.selection().focus.path)?;
    let width = element_at_path(editor.doc(), &ctx.table)
        .map_or(0, |t| t.children.iter().filter_map(Node::as_element).map(row_width).max().unwrap_or(0));
    if width <= 1 {
        return delete_table(editor);
    }
    let registry = editor.registry();
    edit_document(editor, |doc| {
        let table = table_mut(doc, &ctx)?;
        for row in rows_mut(table) {
            if let Some((ix, _)) = cell_at_column(row, ctx.col_start) {
                let width = span(&row.children[ix], "colspan");
                if width > 1 {
                    set_span(&mut row.children[ix], "colspan", width - 1);
                } else {
                    row.children.remove(ix);
                }
            }
        }
        table.children.retain(|row| row.as_element().is_some_and(|el| !el.children.is_empty()));
        let cell = ctx.cell.saturating_sub(1);
        let row = ctx.row.min(table.children.len().saturating_sub(1));
        Ok(caret_in(doc, registry, &ctx.cell_path(row, cell)))
    })
}

fn block_has_content(node: &Node) -> bool {
    match node {
        Node::Element(el) if el.kind == "paragraph" => el.children.iter().any(|child| match child {
            Node::Text(t) => !t.text.is_empty(),
            _ => true,
        }),
        _ => true,
    }
}

fn merge_cells(editor: &Editor) -> Result<Transaction, String> {
    let sel = editor.selection();
    let anchor = TableContext::at(editor.doc(), &sel.anchor.path)?;
    let focus = TableContext::at(editor.doc(), &sel.focus.path)?;
    if anchor.table != focus.table || anchor.row != focus.row {
        return Err("Only cells of one row can be merged".into());
    }
    let (first, last) = (anchor.cell.min(focus.cell), anchor.cell.max(focus.cell));
    if first == last {
        return Err("Select more than one cell to merge".into());
    }
    let registry = editor.registry();
    edit_document(editor, |doc| {
        let row = element_mut(doc, &focus.row_path(focus.row)).ok_or_else(|| "Row not found".to_string())?;
        let merged: Vec<Node> = row.children.drain(first + 1..=last).collect();
        let width = span(&row.children[first], "colspan") + merged.iter().map(|c| span(c, "colspan")).sum::<usize>();
        let Node::Element(target) = &mut row.children[first] else {
            return Err("Cell not found".into());
        };
        for cell in merged {
            if let Node::Element(cell) = cell {
                target.children.extend(cell.children.into_iter().filter(block_has_content));
            }
        }
        if target.children.len() > 1 {
            let filled: Vec<Node> = target.children.drain(..).filter(block_has_content).collect();
            target.children = if filled.is_empty() { vec![Node::paragraph("")] } else { filled };
        }
        set_span(&mut row.children[first], "colspan", width);
        Ok(caret_in(doc, registry, &focus.cell_path(focus.row, first)))
    })
}

fn split_cell(editor: &Editor) -> Result<Transaction, String> {
    let ctx = TableContext::at(editor.doc(), &editor.selection().focus.path)?;
    let sel = editor.selection().clone();
    let cell_path = ctx.cell_path(ctx.row, ctx.cell);
    let cell = crate::tree::node_ref(editor.doc(), &cell_path).ok_or_else(|| "Cell not found".to_string())?;
    let cols = span(cell, "colspan");
    if cols == 1 && span(cell, "rowspan") == 1 {
        return Err("Cell is not merged".into());
    }
    let kind = cell.as_element().map_or("table_cell", |el| el.kind.as_str()).to_string();
    edit_document(editor, |doc| {
        let row = element_mut(doc, &ctx.row_path(ctx.row)).ok_or_else(|| "Row not found".to_string())?;
        set_span(&mut row.children[ctx.cell], "colspan", 1);
        // Rows below that lose a spanned cell are padded by normalization.
        set_span(&mut row.children[ctx.cell], "rowspan", 1);
        for offset in 1..cols {
            row.children.insert(ctx.cell + offset, empty_cell(&kind));
        }
        Ok(sel)
    })
}

enum HeaderScope {
    Row,
    Column,
    Cell,
}

fn toggle_header(editor: &Editor, scope: HeaderScope) -> Result<Transaction, String> {
    let ctx = TableContext::at(editor.doc(), &editor.selection().focus.path)?;
    let sel = editor.selection().clone();
    edit_document(editor, |doc| {
        let table = table_mut(doc, &ctx)?;
        let mut targets: Vec<&mut Node> = match scope {
            HeaderScope::Row => rows_mut(table).next().map(|row| row.children.iter_mut().collect()).unwrap_or_default(),
            HeaderScope::Column => rows_mut(table).filter_map(|row| row.children.first_mut()).collect(),
            HeaderScope::Cell => rows_mut(table)
                .nth(ctx.row)
                .and_then(|row| row.children.get_mut(ctx.cell))
                .into_iter()
                .collect(),
        };
        let all_headers = targets
            .iter()
            .all(|cell| cell.as_element().is_some_and(|el| el.kind == "table_header"));
        let kind = if all_headers { "table_cell" } else { "table_header" };
        for cell in &mut targets {
            if let Node::Element(el) = &mut **cell {
                el.kind = kind.to_string();
            }
        }
        Ok(sel)
    })
}

/// Pads short rows out to the table's grid width and gives empty cells a paragraph.
struct NormalizeTableStructure;

impl NormalizePass for NormalizeTableStructure {
    fn id(&self) -> &'static str {
        "table.normalize_structure"
    }

    fn run(&self, doc: &Document, _registry: &ExtensionRegistry) -> Vec<Op> {
        fn normalize_table(table: &ElementNode, path: &[usize], ops: &mut Vec<Op>) {
            let rows: Vec<&ElementNode> = table
                .children
                .iter()
                .filter_map(Node::as_element)
                .filter(|row| row.kind == "table_row")
                .collect();
            if rows.len() != table.children.len() {
                return;
            }

            // Columns a row loses to cells spanning down from the rows above.
            let mut carried = vec![0usize; rows.len()];
            for (row_ix, row) in rows.iter().enumerate() {
                for cell in &row.children {
                    let down = span(cell, "rowspan").min(rows.len() - row_ix);
                    for below in carried.iter_mut().skip(row_ix + 1).take(down - 1) {
                        *below += span(cell, "colspan");
                    }
                }
            }
            let widths: Vec<usize> = rows.iter().zip(&carried).map(|(row, c)| row_width(row) + c).collect();
            let grid = widths.iter().copied().max().unwrap_or(0);

            for (row_ix, row) in rows.iter().enumerate() {
                let mut row_path = path.to_vec();
                row_path.push(row_ix);
                for (cell_ix, cell) in row.children.iter().enumerate() {
                    if cell.as_element().is_some_and(|el| is_cell(el) && el.children.is_empty()) {
                        let mut para_path = row_path.clone();
                        para_path.extend([cell_ix, 0]);
                        ops.push(Op::InsertNode {
                            path: para_path,
                            node: Node::paragraph(""),
                        });
                    }
                }
                for col_ix in row.children.len()..row.children.len() + grid - widths[row_ix] {
                    let mut cell_path = row_path.clone();
                    cell_path.push(col_ix);
                    ops.push(Op::InsertNode {
                        path: cell_path,
                        node: empty_cell("table_cell"),
                    });
                }
            }
        }

        fn walk(nodes: &[Node], path: &mut Vec<usize>, ops: &mut Vec<Op>) {
            for (ix, node) in nodes.iter().enumerate() {
                let Node::Element(el) = node else {
                    continue;
                };
                path.push(ix);
                if el.kind == "table" {
                    normalize_table(el, path, ops);
                }
                walk(&el.children, path, ops);
                path.pop();
            }
        }

        let mut ops = Vec::new();
        walk(&doc.children, &mut Vec::new(), &mut ops);
        ops
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(spans: &[u64]) -> ElementNode {
        let children = spans
            .iter()
            .map(|&s| {
                let mut attrs = Attrs::default();
                if s > 1 {
                    attrs.insert("colspan".into(), json!(s));
                }
                Node::element("table_cell", attrs, vec![Node::paragraph("")])
            })
            .collect();
        ElementNode {
            kind: "table_row".into(),
            attrs: Attrs::default(),
            children,
        }
    }

    #[test]
    fn columns_resolve_through_colspans() {
        let row = row(&[1, 2, 1]);
        assert_eq!(row_width(&row), 4);
        assert_eq!(cell_at_column(&row, 0), Some((0, 0)));
        assert_eq!(cell_at_column(&row, 2), Some((1, 1)));
        assert_eq!(cell_at_column(&row, 3), Some((2, 3)));
        assert_eq!(cell_at_column(&row, 4), None);
    }

    #[test]
    fn short_rows_are_padded() {
        let doc = Document {
            children: vec![Node::element(
                "table",
                Attrs::default(),
                vec![Node::Element(row(&[1, 1, 1])), Node::Element(row(&[2]))],
            )],
        };
        let ops = NormalizeTableStructure.run(&doc, &ExtensionRegistry::wysiwyg());
        assert_eq!(
            ops,
            vec![Op::InsertNode {
                path: vec![0, 1, 1],
                node: empty_cell("table_cell"),
            }]
        );
    }
}
