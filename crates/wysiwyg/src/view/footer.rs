use crate::view::component::{ComponentBindings, TextBinding, UpdateableComponent};
use crate::view::dom::{Dom, El, NodeId};

const BINDINGS: ComponentBindings = ComponentBindings {
    dropdowns: &[],
    buttons: &[],
    text: &[
        TextBinding { selector: "#cursorPosition", path: "cursorPosition" },
        TextBinding { selector: "#wordsCount", path: "words" },
    ],
};

pub struct Footer {
    root: NodeId,
}

impl Footer {
    pub fn mount(dom: &mut Dom, parent: NodeId) -> Self {
        let root = dom.append(
            parent,
            El::new("div")
                .class("editor-status")
                .child(El::new("span").id("cursorPosition").class("cursor-position"))
                .child(El::new("span").id("wordsCount").class("words-count").text("0 words")),
        );
        Self { root }
    }

    pub fn destroy(&self, dom: &mut Dom) {
        dom.remove(self.root);
    }
}

impl UpdateableComponent for Footer {
    fn name(&self) -> &'static str {
        "footer"
    }

    fn root(&self) -> NodeId {
        self.root
    }

    fn bindings(&self) -> ComponentBindings {
        BINDINGS
    }
}
