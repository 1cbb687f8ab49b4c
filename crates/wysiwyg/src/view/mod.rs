//! View synchronization: components that patch an element tree from
//! `(state, previous)` snapshot pairs.

mod component;
mod dom;
mod dropdown;
mod editor_view;
mod footer;
mod menubar;
mod search_dialog;
mod toolbar;

pub use component::*;
pub use dom::*;
pub use dropdown::*;
pub use editor_view::*;
pub use footer::*;
pub use menubar::*;
pub use search_dialog::*;
pub use toolbar::*;

/// Prefix of the host's `data-*-param` and `data-action` attributes.
pub const CONTROLLER: &str = "wysiwyg";

pub(crate) fn param_attr(name: &str) -> String {
    format!("data-{CONTROLLER}-{name}-param")
}

pub(crate) fn action(event: &str, method: &str) -> String {
    format!("{event}->{CONTROLLER}#{method}")
}

/// A command button as the host binds it: `executeCommand` with the
/// camelCase command name as parameter.
pub(crate) fn command_button(id: &str, command: &str, icon: &str) -> El {
    El::new("button")
        .id(id)
        .class("btn btn-sm")
        .attr("type", "button")
        .attr("data-action", action("click", "executeCommand"))
        .attr(&param_attr("command"), command)
        .child(El::new("i").class(icon))
}

/// A `.dropdown-item` carrying `value` in `attribute`, with the label first
/// and the check indicator as last child.
pub(crate) fn dropdown_item(attribute: &str, value: &str, label: &str, method: &str, checked: bool) -> El {
    El::new("a")
        .class("dropdown-item")
        .attr("data-action", action("click", method))
        .attr(attribute, value)
        .child(El::new("span").text(label))
        .child(El::new("i").class(if checked { ICON_CHECK } else { ICON_EMPTY }))
}

pub(crate) fn dropdown(role: &str, toggle: El, items: impl IntoIterator<Item = El>) -> El {
    El::new("div")
        .class("dropdown")
        .attr("data-dropdown-role", role)
        .child(toggle.attr("data-bs-toggle", "dropdown"))
        .child(El::new("div").class("dropdown-menu").children(items))
}

pub(crate) fn mount_dropdown(
    dom: &Dom,
    scope: NodeId,
    role: &str,
    item_attribute: &str,
    label_id: Option<&str>,
    kind: DropdownKind,
) -> UpdateableDropdown {
    let root = dom
        .query(scope, &format!(r#"[data-dropdown-role="{role}"]"#))
        .unwrap_or_else(|| {
            tracing::error!(role, "dropdown container not found");
            scope
        });
    UpdateableDropdown::new(dom, root, item_attribute, label_id, kind)
}

pub(crate) const FORMATS: [(&str, &str); 7] = [
    ("paragraph", "Paragraph"),
    ("heading1", "Heading 1"),
    ("heading2", "Heading 2"),
    ("heading3", "Heading 3"),
    ("heading4", "Heading 4"),
    ("heading5", "Heading 5"),
    ("heading6", "Heading 6"),
];

pub(crate) const ALIGN_ITEMS: [(&str, &str); 4] = [
    ("left", "Left"),
    ("center", "Center"),
    ("right", "Right"),
    ("justify", "Justify"),
];

pub(crate) fn format_items() -> impl Iterator<Item = El> {
    FORMATS.into_iter().map(|(format, label)| {
        let method = if format == "paragraph" { "executeCommand" } else { "insertHeading" };
        let mut item = dropdown_item("data-item-role", format, label, method, format == "paragraph");
        if let Some(level) = format.strip_prefix("heading") {
            item = item.attr(&param_attr("level"), level);
        } else {
            item = item.attr(&param_attr("command"), "insertParagraph");
        }
        item
    })
}

pub(crate) fn align_items() -> impl Iterator<Item = El> {
    ALIGN_ITEMS.into_iter().map(|(align, label)| {
        dropdown_item(&param_attr("text-align"), align, label, "setTextAlign", align == "left")
    })
}

pub(crate) fn value_items<'a>(
    param: &'a str,
    method: &'a str,
    values: &'a [String],
    checked: &'a str,
) -> impl Iterator<Item = El> + 'a {
    values
        .iter()
        .map(move |value| dropdown_item(&param_attr(param), value, value, method, value == checked))
}
