use crate::config::WysiwygConfig;
use crate::view::component::{ButtonBinding, ComponentBindings, DropdownBinding, UpdateableComponent};
use crate::view::dom::{Dom, El, NodeId};
use crate::view::dropdown::{DropdownKind, DropdownLabel, UpdateableDropdown};
use crate::view::{action, align_items, dropdown, format_items, mount_dropdown, param_attr, value_items};

const BINDINGS: ComponentBindings = ComponentBindings {
    dropdowns: &[
        DropdownBinding { key: "fontFamily", path: "textStyle.fontFamily" },
        DropdownBinding { key: "fontSize", path: "textStyle.fontSize" },
        DropdownBinding { key: "textAlign", path: "textAlign" },
        DropdownBinding { key: "formats", path: "formats" },
        DropdownBinding { key: "textColor", path: "textStyle.color" },
        DropdownBinding { key: "highlight", path: "highlight" },
        DropdownBinding { key: "lineHeight", path: "textStyle.lineHeight" },
    ],
    buttons: &[
        ButtonBinding::new(r#"a[data-command="toggleInvisibleCharacters"]"#, "invisibleCharacters")
            .with_active_class("icon-check"),
    ],
    text: &[],
};

pub struct Menubar {
    root: NodeId,
    format: UpdateableDropdown,
    font_family: UpdateableDropdown,
    font_size: UpdateableDropdown,
    text_align: UpdateableDropdown,
    line_height: UpdateableDropdown,
    text_color: UpdateableDropdown,
    background_color: UpdateableDropdown,
}

impl Menubar {
    pub fn mount(dom: &mut Dom, parent: NodeId, config: &WysiwygConfig) -> Self {
        let root = dom.append(parent, markup(config));
        let defaults = &config.text_style;
        let value = |default: &str| DropdownKind::value(default, DropdownLabel::Text);
        let swatch = |default: &str| DropdownKind::value(default, DropdownLabel::Fill);

        Self {
            format: mount_dropdown(dom, root, "format", "data-item-role", None, DropdownKind::Format),
            font_family: mount_dropdown(dom, root, "font-family", "font-family-param", None, value(&defaults.font_family)),
            font_size: mount_dropdown(dom, root, "font-size", "font-size-param", None, value(&defaults.font_size)),
            text_align: mount_dropdown(dom, root, "text-align", "text-align-param", None, DropdownKind::TextAlign),
            line_height: mount_dropdown(dom, root, "line-height", "line-height-param", None, value(&defaults.line_height)),
            text_color: mount_dropdown(
                dom,
                root,
                "text-color",
                "color-param",
                Some("textCurrentColor"),
                swatch(&defaults.color),
            ),
            background_color: mount_dropdown(
                dom,
                root,
                "background-color",
                "color-param",
                Some("backgroundCurrentColor"),
                swatch(&defaults.color),
            ),
            root,
        }
    }

    pub fn destroy(&self, dom: &mut Dom) {
        dom.remove(self.root);
    }
}

impl UpdateableComponent for Menubar {
    fn name(&self) -> &'static str {
        "menubar"
    }

    fn root(&self) -> NodeId {
        self.root
    }

    fn bindings(&self) -> ComponentBindings {
        BINDINGS
    }

    fn dropdown_mut(&mut self, key: &str) -> Option<&mut UpdateableDropdown> {
        match key {
            "formats" => Some(&mut self.format),
            "fontFamily" => Some(&mut self.font_family),
            "fontSize" => Some(&mut self.font_size),
            "textAlign" => Some(&mut self.text_align),
            "lineHeight" => Some(&mut self.line_height),
            "textColor" => Some(&mut self.text_color),
            "highlight" => Some(&mut self.background_color),
            _ => None,
        }
    }
}

fn menu(title: &str, items: impl IntoIterator<Item = El>) -> El {
    El::new("div")
        .class("dropdown")
        .child(
            El::new("button")
                .class("btn btn-sm dropdown-toggle")
                .attr("data-bs-toggle", "dropdown")
                .text(title),
        )
        .child(El::new("div").class("dropdown-menu").children(items))
}

fn command_item(command: &str, label: &str) -> El {
    El::new("a")
        .class("menu-item")
        .attr("data-action", action("click", "executeCommand"))
        .attr(&param_attr("command"), command)
        .text(label)
}

fn submenu(role: &str, title: &str, label: Option<El>, items: impl IntoIterator<Item = El>) -> El {
    let mut toggle = El::new("a").class("menu-item dropdown-toggle").child(El::new("span").text(title));
    if let Some(label) = label {
        toggle = toggle.child(label);
    }
    dropdown(role, toggle, items)
}

fn swatch_label(id: &str, fill: &str) -> El {
    El::new("svg").id(id).attr("fill", fill)
}

fn markup(config: &WysiwygConfig) -> El {
    let defaults = &config.text_style;
    let view = &config.view;

    El::new("div")
        .id("menubar")
        .class("menubar")
        .child(menu("File", [command_item("newDocument", "New document")]))
        .child(menu(
            "Edit",
            [
                command_item("undo", "Undo"),
                command_item("redo", "Redo"),
                command_item("cut", "Cut"),
                command_item("copy", "Copy"),
                command_item("paste", "Paste"),
                command_item("selectAll", "Select all"),
                El::new("a")
                    .class("menu-item")
                    .attr("data-action", action("click", "toggleSearchAndReplaceDialog"))
                    .text("Find and replace"),
            ],
        ))
        .child(menu(
            "View",
            [El::new("a")
                .class("menu-item")
                .attr("data-command", "toggleInvisibleCharacters")
                .attr("data-action", action("click", "executeCommand"))
                .attr(&param_attr("command"), "toggleInvisibleCharacters")
                .text("Show invisible characters")],
        ))
        .child(menu(
            "Insert",
            [
                command_item("insertHorizontalRule", "Horizontal line"),
                command_item("insertNonbreakingSpace", "Nonbreaking space"),
            ],
        ))
        .child(menu(
            "Format",
            [
                command_item("toggleBold", "Bold"),
                command_item("toggleItalic", "Italic"),
                command_item("toggleUnderline", "Underline"),
                command_item("toggleStrike", "Strikethrough"),
                command_item("toggleSuperscript", "Superscript"),
                command_item("toggleSubscript", "Subscript"),
                command_item("toggleCode", "Code"),
                submenu("format", "Blocks", None, format_items()),
                submenu(
                    "font-family",
                    "Fonts",
                    None,
                    value_items("font-family", "setFontFamily", &view.font_families, &defaults.font_family),
                ),
                submenu(
                    "font-size",
                    "Font sizes",
                    None,
                    value_items("font-size", "setFontSize", &view.font_sizes, &defaults.font_size),
                ),
                submenu("text-align", "Align", None, align_items()),
                submenu(
                    "line-height",
                    "Line height",
                    None,
                    value_items("line-height", "setLineHeight", &view.line_heights, &defaults.line_height),
                ),
                submenu(
                    "text-color",
                    "Text color",
                    Some(swatch_label("textCurrentColor", &defaults.color)),
                    value_items("color", "setTextColor", &view.colors, &defaults.color),
                ),
                submenu(
                    "background-color",
                    "Background color",
                    Some(swatch_label("backgroundCurrentColor", "transparent")),
                    value_items("color", "setBackgroundColor", &view.colors, ""),
                ),
                command_item("clearFormatting", "Clear formatting"),
            ],
        ))
}
