use std::collections::BTreeMap;

use serde_json::json;

use super::{Caret, edit_document};
use crate::core::{Editor, Node};
use crate::extension::{CommandError, CommandSpec, Extension, QuerySpec, arg_bool, arg_str};
use crate::ops::{Path, Transaction};
use crate::search::SearchMatch;
use crate::tree::{element_mut, marks_at_global, splice_inline};

pub(super) struct SearchAndReplaceExtension;

impl Extension for SearchAndReplaceExtension {
    fn name(&self) -> &'static str {
        "search_and_replace"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("search.set_term", "Find", |editor, args| {
                let term = arg_str(args.as_ref(), "term").map_err(CommandError::new)?;
                editor.search.search_term = term;
                editor.search.result_index = 0;
                editor.refresh_search();
                editor.notify_state_change("command:search.set_term".into());
                Ok(())
            })
            .keywords(["find", "search"])
            .args_example(json!({ "term": "hello" })),
            CommandSpec::new("search.set_replace_term", "Replace with", |editor, args| {
                editor.search.replace_term = arg_str(args.as_ref(), "term").map_err(CommandError::new)?;
                editor.notify_state_change("command:search.set_replace_term".into());
                Ok(())
            }),
            CommandSpec::new("search.set_case_sensitive", "Match case", |editor, args| {
                editor.search.case_sensitive = arg_bool(args.as_ref(), "case_sensitive", false);
                editor.refresh_search();
                editor.notify_state_change("command:search.set_case_sensitive".into());
                Ok(())
            }),
            CommandSpec::new("search.next", "Next result", |editor, _args| step_result(editor, 1)),
            CommandSpec::new("search.previous", "Previous result", |editor, _args| step_result(editor, -1)),
            CommandSpec::transaction("search.replace", "Replace", |editor, _args| {
                let current = editor.search().current().cloned().ok_or_else(|| "No search results".to_string())?;
                replace_matches(editor, vec![current])
            })
            .keywords(["replace"]),
            CommandSpec::transaction("search.replace_all", "Replace all", |editor, _args| {
                let results = editor.search().results.clone();
                if results.is_empty() {
                    return Err("No search results".into());
                }
                replace_matches(editor, results)
            })
            .keywords(["replace"]),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![QuerySpec::new("search.status", |editor, _args| {
            let search = editor.search();
            let total = search.results.len();
            let index = if total == 0 { 0 } else { search.result_index + 1 };
            Ok(json!({ "total": total, "index": index }))
        })]
    }
}

/// Moves the current result, wrapping around at either end.
fn step_result(editor: &mut Editor, delta: isize) -> Result<(), CommandError> {
    let total = editor.search.results.len();
    if total == 0 {
        return Err(CommandError::new("No search results"));
    }
    let index = editor.search.result_index as isize + delta;
    editor.search.result_index = index.rem_euclid(total as isize) as usize;
    Ok(())
}

fn replace_matches(editor: &Editor, matches: Vec<SearchMatch>) -> Result<Transaction, String> {
    let replacement = editor.search().replace_term.clone();
    let caret = Caret::of(editor.doc(), &editor.selection().focus);

    let mut by_block: BTreeMap<Path, Vec<SearchMatch>> = BTreeMap::new();
    for m in matches {
        by_block.entry(m.block_path.clone()).or_default().push(m);
    }

    edit_document(editor, |doc| {
        for (block, mut hits) in by_block {
            let el = element_mut(doc, &block).ok_or_else(|| "Search result block not found".to_string())?;
            // Later hits first so earlier ranges stay valid.
            hits.sort_by_key(|m| std::cmp::Reverse(m.range.start));
            for hit in hits {
                let insert = if replacement.is_empty() {
                    Vec::new()
                } else {
                    vec![Node::text(replacement.clone(), marks_at_global(&el.children, hit.range.start))]
                };
                el.children = splice_inline(&el.children, hit.range.start, hit.range.end, insert);
            }
        }
        Ok(caret.selection(doc))
    })
}
