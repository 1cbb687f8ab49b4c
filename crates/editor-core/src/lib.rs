mod core;
mod events;
mod extension;
mod extensions;
mod html;
mod ops;
mod query;
mod search;
mod tree;

pub use crate::core::*;
pub use crate::events::*;
pub use crate::extension::*;
pub use crate::extensions::{core_extensions, wysiwyg_extensions, youtube_embed_url};
pub use crate::html::{HtmlError, parse_html, serialize_document};
pub use crate::ops::*;
pub use crate::query::*;
pub use crate::search::{SearchMatch, SearchState};
pub use crate::tree::{PathError, node_at_path};
