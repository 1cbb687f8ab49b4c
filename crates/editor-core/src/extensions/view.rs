use serde_json::{Value, json};

use crate::extension::{CommandError, CommandSpec, Extension, QuerySpec};

/// Display of paragraph marks and breaks; an option, not document content.
pub(super) struct InvisibleCharactersExtension;

impl Extension for InvisibleCharactersExtension {
    fn name(&self) -> &'static str {
        "invisible_characters"
    }

    fn default_options(&self) -> Option<Value> {
        Some(json!({ "enabled": false }))
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("invisible_characters.toggle", "Show invisible characters", |editor, _args| {
                let toggled = editor.configure_extension("invisible_characters", |options| {
                    let enabled = options.get("enabled").and_then(Value::as_bool).unwrap_or(false);
                    if let Some(options) = options.as_object_mut() {
                        options.insert("enabled".into(), Value::Bool(!enabled));
                    }
                });
                if !toggled {
                    return Err(CommandError::new("Invisible characters are not configured"));
                }
                Ok(())
            })
            .keywords(["invisible", "whitespace", "pilcrow"]),
        ]
    }
}

pub(super) struct CharacterCountExtension;

impl Extension for CharacterCountExtension {
    fn name(&self) -> &'static str {
        "character_count"
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![
            QuerySpec::new("character_count.characters", |editor, _args| Ok(json!(editor.character_count()))),
            QuerySpec::new("character_count.words", |editor, _args| Ok(json!(editor.word_count()))),
        ]
    }
}
