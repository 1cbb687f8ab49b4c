//! HTML round-tripping for documents.
//!
//! Serialization produces the markup the host form posts back; parsing is
//! lenient about structure (implicit closes, stray end tags) but rejects
//! markup that cannot be tokenized at all.

mod convert;
mod parse;
mod serialize;

use crate::core::Document;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HtmlError {
    #[error("unterminated tag starting at byte {position}")]
    UnterminatedTag { position: usize },
    #[error("unterminated attribute value starting at byte {position}")]
    UnterminatedAttribute { position: usize },
    #[error("unterminated comment starting at byte {position}")]
    UnterminatedComment { position: usize },
}

pub fn parse_html(html: &str) -> Result<Document, HtmlError> {
    let tree = parse::parse_tree(html)?;
    Ok(convert::document_from_tree(&tree))
}

pub fn serialize_document(doc: &Document) -> String {
    serialize::blocks_to_html(&doc.children)
}
