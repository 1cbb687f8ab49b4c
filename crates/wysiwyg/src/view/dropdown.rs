use serde_json::Value;

use crate::view::dom::{Dom, NodeId};

pub const ICON_CHECK: &str = "icon-check";
pub const ICON_EMPTY: &str = "icon-empty";

const ALIGNMENTS: [&str; 4] = ["left", "center", "right", "justify"];

/// How a value dropdown reflects the current value on its label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropdownLabel {
    Text,
    /// Sets the `fill` attribute, used by the color swatches.
    Fill,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropdownKind {
    /// One string value, checked at its item; unknown values check `default`.
    Value { default: String, label: DropdownLabel },
    /// The `formats` object; every item is recomputed.
    Format,
    TextAlign,
}

impl DropdownKind {
    pub fn value(default: impl Into<String>, label: DropdownLabel) -> Self {
        DropdownKind::Value {
            default: default.into(),
            label,
        }
    }
}

/// A dropdown whose items carry a check indicator for the active value.
#[derive(Debug, Clone)]
pub struct UpdateableDropdown {
    root: NodeId,
    kind: DropdownKind,
    check_places: Vec<(String, NodeId)>,
    label: Option<NodeId>,
}

impl UpdateableDropdown {
    /// Collects the check places from the `.dropdown-item` elements under
    /// `root`. An item's value is read from the first attribute whose name
    /// contains `item_attribute`; its indicator is its last child element.
    pub fn new(dom: &Dom, root: NodeId, item_attribute: &str, label_id: Option<&str>, kind: DropdownKind) -> Self {
        let check_places: Vec<(String, NodeId)> = dom
            .query_all(root, ".dropdown-item")
            .into_iter()
            .filter_map(|item| {
                let key = dom.attr_names(item).find(|name| name.contains(item_attribute))?;
                let value = dom.attr(item, key).filter(|value| !value.is_empty())?;
                let check_place = dom.last_element_child(item).unwrap_or(item);
                Some((value.to_string(), check_place))
            })
            .collect();
        if check_places.is_empty() {
            tracing::error!(item_attribute, "dropdown has no check places");
        }

        let label = label_id.and_then(|id| {
            let label = dom.query(root, &format!("#{id}"));
            if label.is_none() {
                tracing::warn!(label = id, "dropdown label not found");
            }
            label
        });

        Self {
            root,
            kind,
            check_places,
            label,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn label(&self) -> Option<NodeId> {
        self.label
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.check_places.iter().map(|(value, _)| value.as_str())
    }

    pub fn check_place(&self, value: &str) -> Option<NodeId> {
        self.check_places
            .iter()
            .find(|(candidate, _)| candidate == value)
            .map(|(_, node)| *node)
    }

    pub fn update(&self, dom: &mut Dom, value: &Value, previous: Option<&Value>) {
        match &self.kind {
            DropdownKind::Format => self.update_formats(dom, value),
            DropdownKind::Value { default, label } => {
                // A cleared value (no highlight) leaves the indicator as is.
                let Some(current) = value.as_str() else {
                    return;
                };
                self.update_check_icon(dom, current, previous.and_then(Value::as_str), default);
                if let Some(node) = self.label {
                    match label {
                        DropdownLabel::Text => dom.set_text(node, current),
                        DropdownLabel::Fill => dom.set_attr(node, "fill", current),
                    }
                }
            }
            DropdownKind::TextAlign => {
                let Some(current) = value.as_str() else {
                    return;
                };
                self.update_check_icon(dom, current, previous.and_then(Value::as_str), "left");
                if let Some(node) = self.label.filter(|_| ALIGNMENTS.contains(&current)) {
                    for align in ALIGNMENTS {
                        if align != current && dom.has_class(node, &align_icon(align)) {
                            dom.toggle_class(node, &align_icon(align), Some(false));
                        }
                    }
                    dom.toggle_class(node, &align_icon(current), Some(true));
                }
            }
        }
    }

    fn update_check_icon(&self, dom: &mut Dom, current: &str, previous: Option<&str>, default: &str) {
        if let Some(node) = previous.and_then(|previous| self.resolve(previous, default)) {
            dom.toggle_class(node, ICON_CHECK, Some(false));
            dom.toggle_class(node, ICON_EMPTY, Some(true));
        }
        match self.resolve(current, default) {
            Some(node) => {
                dom.toggle_class(node, ICON_CHECK, Some(true));
                dom.toggle_class(node, ICON_EMPTY, Some(false));
            }
            None => tracing::warn!(value = current, "no dropdown item for value"),
        }
    }

    fn resolve(&self, value: &str, default: &str) -> Option<NodeId> {
        self.check_place(value).or_else(|| self.check_place(default))
    }

    fn update_formats(&self, dom: &mut Dom, formats: &Value) {
        let Some(formats) = formats.as_object() else {
            return;
        };
        for (format, node) in &self.check_places {
            let active = formats.get(format).and_then(Value::as_bool).unwrap_or(false);
            dom.toggle_class(*node, ICON_CHECK, Some(active));
            dom.toggle_class(*node, ICON_EMPTY, Some(!active));
        }

        let Some(label) = self.label else {
            return;
        };
        if let Some((format, _)) = formats.iter().find(|(_, active)| active.as_bool() == Some(true)) {
            dom.set_text(label, &format_display_name(format));
        }
    }
}

pub fn format_display_name(format: &str) -> String {
    match format.strip_prefix("heading") {
        Some(level) if !level.is_empty() => format!("Heading {level}"),
        _ if format == "paragraph" => "Paragraph".to_string(),
        _ => format.to_string(),
    }
}

fn align_icon(align: &str) -> String {
    format!("icon-text-align-{align}")
}
