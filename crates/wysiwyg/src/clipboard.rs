use std::cell::RefCell;
use std::rc::Rc;

use crate::error::ClipboardError;

pub const TEXT_PLAIN: &str = "text/plain";
pub const TEXT_HTML: &str = "text/html";

/// One clipboard entry with its plain-text and HTML representations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClipboardItem {
    pub text: String,
    pub html: String,
}

impl ClipboardItem {
    pub fn new(text: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            html: html.into(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(text, String::new())
    }

    pub fn get(&self, mime: &str) -> Option<&str> {
        let value = match mime {
            TEXT_PLAIN => &self.text,
            TEXT_HTML => &self.html,
            _ => return None,
        };
        Some(value.as_str()).filter(|value| !value.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.html.is_empty()
    }
}

pub trait Clipboard {
    fn write(&mut self, item: ClipboardItem) -> Result<(), ClipboardError>;
    fn read(&mut self) -> Result<ClipboardItem, ClipboardError>;
}

/// Lets the host keep a handle on a clipboard it installed.
impl<C: Clipboard + ?Sized> Clipboard for Rc<RefCell<C>> {
    fn write(&mut self, item: ClipboardItem) -> Result<(), ClipboardError> {
        self.try_borrow_mut()
            .map_err(|_| ClipboardError::Access("clipboard is busy".into()))?
            .write(item)
    }

    fn read(&mut self) -> Result<ClipboardItem, ClipboardError> {
        self.try_borrow_mut()
            .map_err(|_| ClipboardError::Access("clipboard is busy".into()))?
            .read()
    }
}

/// Process-local clipboard. Reading before anything was written fails with
/// [`ClipboardError::Empty`].
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    item: Option<ClipboardItem>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_item(item: ClipboardItem) -> Self {
        Self { item: Some(item) }
    }

    pub fn contents(&self) -> Option<&ClipboardItem> {
        self.item.as_ref()
    }
}

impl Clipboard for MemoryClipboard {
    fn write(&mut self, item: ClipboardItem) -> Result<(), ClipboardError> {
        self.item = Some(item);
        Ok(())
    }

    fn read(&mut self) -> Result<ClipboardItem, ClipboardError> {
        self.item.clone().ok_or(ClipboardError::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_skips_empty_representations() {
        let item = ClipboardItem::text("plain");
        assert_eq!(item.get(TEXT_PLAIN), Some("plain"));
        assert_eq!(item.get(TEXT_HTML), None);
        assert_eq!(item.get("image/png"), None);
    }

    #[test]
    fn memory_clipboard_starts_empty() {
        let mut clipboard = MemoryClipboard::new();
        assert_eq!(clipboard.read(), Err(ClipboardError::Empty));

        clipboard.write(ClipboardItem::new("a", "<p>a</p>")).unwrap();
        assert_eq!(clipboard.read().unwrap().html, "<p>a</p>");
    }
}
