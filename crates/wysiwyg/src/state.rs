use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::config::TextStyleDefaults;
use crate::engine::EditingEngine;

pub const INVISIBLE_CHARACTERS: &str = "invisible_characters";

const ALIGNMENTS: [&str; 4] = ["left", "center", "right", "justify"];

/// Everything the toolbar, menubar and footer render, captured at one moment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorState {
    pub marks: MarksState,
    pub text_style: TextStyleState,
    pub formats: FormatsState,
    pub text_align: String,
    pub highlight: Option<String>,
    pub list: ListState,
    pub blockquote: bool,
    pub code_block: bool,
    pub invisible_characters: bool,
    pub cursor_position: String,
    pub words: String,
    pub search_result: SearchResult,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarksState {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strike: bool,
    pub superscript: bool,
    pub subscript: bool,
    pub code: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyleState {
    pub font_family: String,
    pub font_size: String,
    pub color: String,
    pub line_height: String,
}

/// At most one flag is set. List items and code blocks set none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatsState {
    pub paragraph: bool,
    pub heading1: bool,
    pub heading2: bool,
    pub heading3: bool,
    pub heading4: bool,
    pub heading5: bool,
    pub heading6: bool,
}

impl FormatsState {
    pub fn heading(&self, level: u8) -> bool {
        match level {
            1 => self.heading1,
            2 => self.heading2,
            3 => self.heading3,
            4 => self.heading4,
            5 => self.heading5,
            6 => self.heading6,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListState {
    pub ordered: bool,
    pub bullet: bool,
}

/// `index` is 1-based while there are results, 0 otherwise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub total: usize,
    pub index: usize,
}

pub fn words_label(count: usize) -> String {
    if count == 1 {
        "1 word".to_string()
    } else {
        format!("{count} words")
    }
}

impl EditorState {
    pub fn capture<E: EditingEngine + ?Sized>(engine: &E, defaults: &TextStyleDefaults) -> Self {
        Self {
            marks: MarksState {
                bold: engine.is_active("bold", None),
                italic: engine.is_active("italic", None),
                underline: engine.is_active("underline", None),
                strike: engine.is_active("strike", None),
                superscript: engine.is_active("superscript", None),
                subscript: engine.is_active("subscript", None),
                code: engine.is_active("code", None),
            },
            text_style: text_style(engine, defaults),
            formats: FormatsState {
                paragraph: engine.is_active("paragraph", None),
                heading1: heading_active(engine, 1),
                heading2: heading_active(engine, 2),
                heading3: heading_active(engine, 3),
                heading4: heading_active(engine, 4),
                heading5: heading_active(engine, 5),
                heading6: heading_active(engine, 6),
            },
            text_align: ALIGNMENTS
                .into_iter()
                .find(|align| engine.is_active("", Some(&json!({ "textAlign": align }))))
                .unwrap_or("left")
                .to_string(),
            highlight: attr_string(&engine.get_attributes("highlight"), "color")
                .filter(|color| !color.is_empty()),
            list: ListState {
                ordered: engine.is_active("orderedList", None),
                bullet: engine.is_active("bulletList", None),
            },
            blockquote: engine.is_active("blockquote", None),
            code_block: engine.is_active("codeBlock", None),
            invisible_characters: engine.extension_enabled(INVISIBLE_CHARACTERS),
            cursor_position: engine.cursor_breadcrumb(),
            words: words_label(engine.word_count()),
            search_result: engine.search_status(),
        }
    }
}

fn heading_active<E: EditingEngine + ?Sized>(engine: &E, level: u8) -> bool {
    engine.is_active("heading", Some(&json!({ "level": level })))
}

fn text_style<E: EditingEngine + ?Sized>(engine: &E, defaults: &TextStyleDefaults) -> TextStyleState {
    let marks = engine.get_attributes("textStyle");
    let line_height = ["paragraph", "heading", "listItem"]
        .into_iter()
        .find_map(|node| attr_string(&engine.get_attributes(node), "lineHeight"));

    TextStyleState {
        font_family: attr_string(&marks, "fontFamily").unwrap_or_else(|| defaults.font_family.clone()),
        font_size: attr_string(&marks, "fontSize").unwrap_or_else(|| defaults.font_size.clone()),
        color: attr_string(&marks, "color").unwrap_or_else(|| defaults.color.clone()),
        line_height: line_height.unwrap_or_else(|| defaults.line_height.clone()),
    }
}

fn attr_string(attrs: &Value, key: &str) -> Option<String> {
    match attrs.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_label_is_singular_for_one() {
        assert_eq!(words_label(0), "0 words");
        assert_eq!(words_label(1), "1 word");
        assert_eq!(words_label(12), "12 words");
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let value = serde_json::to_value(EditorState::default()).unwrap();

        assert!(value["textStyle"].get("fontFamily").is_some());
        assert!(value["formats"].get("heading1").is_some());
        assert_eq!(value["highlight"], Value::Null);
        assert_eq!(value["searchResult"], json!({ "total": 0, "index": 0 }));
        assert!(value.get("invisibleCharacters").is_some());
    }
}
