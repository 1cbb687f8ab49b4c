use raytha_editor_core::HtmlError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("{0} is not implemented")]
    NotImplemented(&'static str),
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("invalid content: {0}")]
    InvalidContent(#[from] HtmlError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClipboardError {
    #[error("no clipboard is installed")]
    Unavailable,
    #[error("clipboard is empty")]
    Empty,
    #[error("clipboard access failed: {0}")]
    Access(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    #[error("{name} is {size} bytes, the limit is {max} bytes")]
    FileTooLarge { name: String, size: u64, max: u64 },
    #[error("{name}: {content_type} files are not allowed")]
    TypeNotAllowed { name: String, content_type: String },
    #[error("upload response did not include an object key")]
    MissingObjectKey,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse editor config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid editor config: {0}")]
    Invalid(String),
}
