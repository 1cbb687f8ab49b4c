mod clipboard;
mod clock;
mod commands;
mod config;
mod controller;
mod engine;
mod error;
mod form;
mod model;
mod state;
mod state_manager;
mod timing;
mod upload;
pub mod view;

pub use crate::clipboard::*;
pub use crate::clock::*;
pub use crate::commands::*;
pub use crate::config::*;
pub use crate::controller::*;
pub use crate::engine::*;
pub use crate::error::*;
pub use crate::form::*;
pub use crate::model::*;
pub use crate::state::*;
pub use crate::state_manager::*;
pub use crate::timing::*;
pub use crate::upload::*;
pub use crate::view::EditorView;
