use serde_json::Value;

use crate::state::EditorState;
use crate::view::dom::{Dom, NodeId};
use crate::view::dropdown::UpdateableDropdown;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropdownBinding {
    pub key: &'static str,
    pub path: &'static str,
}

/// Toggles `active_class` on the element matching `selector`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonBinding {
    pub selector: &'static str,
    pub path: &'static str,
    pub active_class: &'static str,
}

impl ButtonBinding {
    pub const fn new(selector: &'static str, path: &'static str) -> Self {
        Self {
            selector,
            path,
            active_class: "active",
        }
    }

    pub const fn with_active_class(mut self, active_class: &'static str) -> Self {
        self.active_class = active_class;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextBinding {
    pub selector: &'static str,
    pub path: &'static str,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComponentBindings {
    pub dropdowns: &'static [DropdownBinding],
    pub buttons: &'static [ButtonBinding],
    pub text: &'static [TextBinding],
}

/// A view component that patches its DOM from a pair of snapshots.
pub trait UpdateableComponent {
    fn name(&self) -> &'static str;

    fn root(&self) -> NodeId;

    fn bindings(&self) -> ComponentBindings;

    fn dropdown_mut(&mut self, _key: &str) -> Option<&mut UpdateableDropdown> {
        None
    }

    /// Applies each binding whose value at `path` differs between the two
    /// snapshots, or all of them when there is no previous snapshot.
    fn update_ui(&mut self, dom: &mut Dom, state: &EditorState, previous: Option<&EditorState>) {
        let current = match serde_json::to_value(state) {
            Ok(value) => value,
            Err(err) => {
                tracing::error!(component = self.name(), error = %err, "snapshot not serializable");
                return;
            }
        };
        let previous = previous.and_then(|previous| serde_json::to_value(previous).ok());
        let bindings = self.bindings();
        let root = self.root();

        for binding in bindings.dropdowns {
            let Some(value) = changed(&current, previous.as_ref(), binding.path) else {
                continue;
            };
            let previous_value = previous.as_ref().and_then(|p| state_value(p, binding.path));
            match self.dropdown_mut(binding.key) {
                Some(dropdown) => dropdown.update(dom, value, previous_value),
                None => tracing::error!(component = self.name(), dropdown = binding.key, "dropdown not found"),
            }
        }

        for binding in bindings.buttons {
            let Some(value) = changed(&current, previous.as_ref(), binding.path) else {
                continue;
            };
            let Some(button) = dom.query(root, binding.selector) else {
                tracing::debug!(component = self.name(), selector = binding.selector, "button not found");
                continue;
            };
            dom.toggle_class(button, binding.active_class, Some(is_truthy(value)));
        }

        for binding in bindings.text {
            let Some(value) = changed(&current, previous.as_ref(), binding.path) else {
                continue;
            };
            let Some(node) = dom.query(root, binding.selector) else {
                tracing::debug!(component = self.name(), selector = binding.selector, "text target not found");
                continue;
            };
            dom.set_text(node, &display(value));
        }
    }
}

/// Looks up a dot separated path such as `textStyle.fontSize`.
pub fn state_value<'a>(state: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(state, |value, key| value.get(key))
}

fn changed<'a>(current: &'a Value, previous: Option<&Value>, path: &str) -> Option<&'a Value> {
    let value = state_value(current, path)?;
    match previous {
        Some(previous) if state_value(previous, path) == Some(value) => None,
        _ => Some(value),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn paths_walk_nested_objects() {
        let state = json!({ "textStyle": { "fontSize": "16px" }, "words": "1 word" });

        assert_eq!(state_value(&state, "textStyle.fontSize"), Some(&json!("16px")));
        assert_eq!(state_value(&state, "words"), Some(&json!("1 word")));
        assert_eq!(state_value(&state, "textStyle.missing"), None);
    }

    #[test]
    fn unchanged_values_are_skipped() {
        let current = json!({ "marks": { "bold": true, "italic": false } });
        let previous = json!({ "marks": { "bold": false, "italic": false } });

        assert_eq!(changed(&current, Some(&previous), "marks.bold"), Some(&json!(true)));
        assert_eq!(changed(&current, Some(&previous), "marks.italic"), None);
        assert_eq!(changed(&current, None, "marks.italic"), Some(&json!(false)));
    }
}
