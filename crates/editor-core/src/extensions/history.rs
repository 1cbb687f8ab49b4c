use serde_json::Value;

use crate::extension::{CommandError, CommandSpec, Extension, QuerySpec};

pub(super) struct HistoryExtension;

impl Extension for HistoryExtension {
    fn name(&self) -> &'static str {
        "history"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("history.undo", "Undo", |editor, _args| {
                if editor.undo() {
                    Ok(())
                } else {
                    Err(CommandError::new("Nothing to undo"))
                }
            })
            .keywords(["undo", "history"]),
            CommandSpec::new("history.redo", "Redo", |editor, _args| {
                if editor.redo() {
                    Ok(())
                } else {
                    Err(CommandError::new("Nothing to redo"))
                }
            })
            .keywords(["redo", "history"]),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![
            QuerySpec::new("history.can_undo", |editor, _args| Ok(Value::Bool(editor.can_undo()))),
            QuerySpec::new("history.can_redo", |editor, _args| Ok(Value::Bool(editor.can_redo()))),
        ]
    }
}
