use crate::config::WysiwygConfig;
use crate::view::component::{ButtonBinding, ComponentBindings, DropdownBinding, UpdateableComponent};
use crate::view::dom::{Dom, El, NodeId};
use crate::view::dropdown::{DropdownKind, DropdownLabel, UpdateableDropdown};
use crate::view::{
    action, align_items, command_button, dropdown, format_items, mount_dropdown, param_attr, value_items,
};

const BINDINGS: ComponentBindings = ComponentBindings {
    dropdowns: &[
        DropdownBinding { key: "fontFamily", path: "textStyle.fontFamily" },
        DropdownBinding { key: "fontSize", path: "textStyle.fontSize" },
        DropdownBinding { key: "textAlign", path: "textAlign" },
        DropdownBinding { key: "formats", path: "formats" },
    ],
    buttons: &[
        ButtonBinding::new("#boldButton", "marks.bold"),
        ButtonBinding::new("#italicButton", "marks.italic"),
        ButtonBinding::new("#underlineButton", "marks.underline"),
        ButtonBinding::new("#strikeButton", "marks.strike"),
        ButtonBinding::new("#superscriptButton", "marks.superscript"),
        ButtonBinding::new("#subscriptButton", "marks.subscript"),
        ButtonBinding::new("#codeButton", "marks.code"),
        ButtonBinding::new("#bulletListButton", "list.bullet"),
        ButtonBinding::new("#orderedListButton", "list.ordered"),
        ButtonBinding::new("#blockquoteButton", "blockquote"),
        ButtonBinding::new("#codeBlockButton", "codeBlock"),
        ButtonBinding::new(r#"button[data-command="toggleInvisibleCharacters"]"#, "invisibleCharacters"),
    ],
    text: &[],
};

const MARK_BUTTONS: [(&str, &str, &str); 7] = [
    ("boldButton", "toggleBold", "icon-bold"),
    ("italicButton", "toggleItalic", "icon-italic"),
    ("underlineButton", "toggleUnderline", "icon-underline"),
    ("strikeButton", "toggleStrike", "icon-strikethrough"),
    ("superscriptButton", "toggleSuperscript", "icon-superscript"),
    ("subscriptButton", "toggleSubscript", "icon-subscript"),
    ("codeButton", "toggleCode", "icon-code"),
];

const BLOCK_BUTTONS: [(&str, &str, &str); 4] = [
    ("bulletListButton", "toggleBulletList", "icon-list-bullet"),
    ("orderedListButton", "toggleOrderedList", "icon-list-ordered"),
    ("blockquoteButton", "toggleBlockquote", "icon-blockquote"),
    ("codeBlockButton", "toggleCodeBlock", "icon-code-block"),
];

pub struct Toolbar {
    root: NodeId,
    font_family: UpdateableDropdown,
    font_size: UpdateableDropdown,
    format: UpdateableDropdown,
    text_align: UpdateableDropdown,
}

impl Toolbar {
    pub fn mount(dom: &mut Dom, parent: NodeId, config: &WysiwygConfig) -> Self {
        let root = dom.append(parent, markup(config));
        let defaults = &config.text_style;

        Self {
            font_family: mount_dropdown(
                dom,
                root,
                "fontFamily",
                "font-family-param",
                Some("fontFamilySpan"),
                DropdownKind::value(&defaults.font_family, DropdownLabel::Text),
            ),
            font_size: mount_dropdown(
                dom,
                root,
                "font-size",
                "font-size-param",
                Some("fontSizeSpan"),
                DropdownKind::value(&defaults.font_size, DropdownLabel::Text),
            ),
            format: mount_dropdown(dom, root, "format", "data-item-role", Some("formatSpan"), DropdownKind::Format),
            text_align: mount_dropdown(
                dom,
                root,
                "text-align",
                "text-align-param",
                Some("textAlignButton"),
                DropdownKind::TextAlign,
            ),
            root,
        }
    }

    pub fn destroy(&self, dom: &mut Dom) {
        dom.remove(self.root);
    }
}

impl UpdateableComponent for Toolbar {
    fn name(&self) -> &'static str {
        "toolbar"
    }

    fn root(&self) -> NodeId {
        self.root
    }

    fn bindings(&self) -> ComponentBindings {
        BINDINGS
    }

    fn dropdown_mut(&mut self, key: &str) -> Option<&mut UpdateableDropdown> {
        match key {
            "fontFamily" => Some(&mut self.font_family),
            "fontSize" => Some(&mut self.font_size),
            "formats" => Some(&mut self.format),
            "textAlign" => Some(&mut self.text_align),
            _ => None,
        }
    }
}

fn markup(config: &WysiwygConfig) -> El {
    let defaults = &config.text_style;
    let view = &config.view;

    let button_group = |buttons: &[(&str, &str, &str)]| {
        El::new("div")
            .class("btn-group")
            .children(buttons.iter().map(|(id, command, icon)| command_button(id, command, icon)))
    };

    El::new("div")
        .id("toolbarButtons")
        .class("btn-toolbar")
        .child(button_group(&[
            ("undoButton", "undo", "icon-undo"),
            ("redoButton", "redo", "icon-redo"),
        ]))
        .child(dropdown(
            "format",
            El::new("button").class("btn btn-sm dropdown-toggle").child(El::new("span").id("formatSpan").text("Paragraph")),
            format_items(),
        ))
        .child(dropdown(
            "fontFamily",
            El::new("button")
                .class("btn btn-sm dropdown-toggle")
                .child(El::new("span").id("fontFamilySpan").text(defaults.font_family.as_str())),
            value_items("font-family", "setFontFamily", &view.font_families, &defaults.font_family),
        ))
        .child(dropdown(
            "font-size",
            El::new("button")
                .class("btn btn-sm dropdown-toggle")
                .child(El::new("span").id("fontSizeSpan").text(defaults.font_size.as_str())),
            value_items("font-size", "setFontSize", &view.font_sizes, &defaults.font_size),
        ))
        .child(button_group(&MARK_BUTTONS))
        .child(dropdown(
            "text-align",
            El::new("button").id("textAlignButton").class("btn btn-sm icon-text-align-left"),
            align_items(),
        ))
        .child(button_group(&BLOCK_BUTTONS))
        .child(
            El::new("div").class("btn-group").child(
                El::new("button")
                    .class("btn btn-sm")
                    .attr("data-command", "toggleInvisibleCharacters")
                    .attr("data-action", action("click", "executeCommand"))
                    .attr(&param_attr("command"), "toggleInvisibleCharacters")
                    .child(El::new("i").class("icon-invisible-characters")),
            ),
        )
}
