//! Media upload plumbing shared with the host page.
//!
//! The crate performs no HTTP itself. It knows the endpoint layout, the
//! JSON bodies exchanged with it, the host's file restrictions, and how a
//! finished upload turns into an image insertion.

use serde::{Deserialize, Serialize};

use crate::error::UploadError;

/// Body returned by `POST {path_base}/raytha/media-items/upload`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub fields: UploadFields,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub object_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignRequest {
    pub filename: String,
    pub content_type: String,
    pub extension: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignResponse {
    pub url: String,
    pub fields: UploadFields,
}

/// Registers a direct-to-cloud upload with the media library once the PUT finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAfterUpload {
    pub filename: String,
    pub content_type: String,
    pub extension: String,
    pub id: Option<String>,
    pub object_key: String,
    pub length: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub content_type: String,
    pub size: u64,
    pub alt_text: Option<String>,
}

impl UploadFile {
    /// Guesses the content type from the file name.
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        let name = name.into();
        let content_type = mime_guess::from_path(&name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Self {
            name,
            content_type,
            size,
            alt_text: None,
        }
    }

    pub fn with_alt_text(mut self, alt_text: impl Into<String>) -> Self {
        self.alt_text = Some(alt_text.into());
        self
    }

    /// Lower-cased, without the dot. Empty when the name has none.
    pub fn extension(&self) -> String {
        self.name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default()
    }
}

/// A finished upload, ready to be inserted as an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadCompletion {
    pub url: String,
    pub alt_text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MediaUploadConfig {
    pub path_base: String,
    pub use_direct_upload_to_cloud: bool,
    /// Allowed types: exact MIME types, `type/*` wildcards, or `.ext` suffixes.
    pub mime_types: Vec<String>,
    pub max_file_size: Option<u64>,
}

impl MediaUploadConfig {
    /// Builds the config from the host's data attributes. `mime_types` is a
    /// comma separated list; a zero `max_file_size` means unlimited.
    pub fn from_host_values(
        path_base: impl Into<String>,
        use_direct_upload_to_cloud: bool,
        mime_types: &str,
        max_file_size: u64,
    ) -> Self {
        Self {
            path_base: path_base.into().trim_end_matches('/').to_string(),
            use_direct_upload_to_cloud,
            mime_types: mime_types
                .split(',')
                .map(str::trim)
                .filter(|mime| !mime.is_empty())
                .map(String::from)
                .collect(),
            max_file_size: (max_file_size > 0).then_some(max_file_size),
        }
    }

    pub fn upload_endpoint(&self) -> String {
        format!("{}/raytha/media-items/upload", self.path_base)
    }

    pub fn presign_endpoint(&self) -> String {
        format!("{}/raytha/media-items/presign", self.path_base)
    }

    pub fn create_after_upload_endpoint(&self) -> String {
        format!("{}/raytha/media-items/create-after-upload", self.path_base)
    }

    pub fn object_url(&self, object_key: &str) -> String {
        format!("{}/raytha/media-items/objectkey/{object_key}", self.path_base)
    }

    pub fn validate(&self, file: &UploadFile) -> Result<(), UploadError> {
        if let Some(max) = self.max_file_size {
            if file.size > max {
                return Err(UploadError::FileTooLarge {
                    name: file.name.clone(),
                    size: file.size,
                    max,
                });
            }
        }

        if self.mime_types.is_empty() || self.mime_types.iter().any(|allowed| type_matches(allowed, file)) {
            Ok(())
        } else {
            Err(UploadError::TypeNotAllowed {
                name: file.name.clone(),
                content_type: file.content_type.clone(),
            })
        }
    }

    pub fn presign_request(&self, file: &UploadFile) -> PresignRequest {
        PresignRequest {
            filename: file.name.clone(),
            content_type: file.content_type.clone(),
            extension: file.extension(),
        }
    }

    pub fn create_after_upload(&self, file: &UploadFile, presign: &PresignResponse) -> CreateAfterUpload {
        CreateAfterUpload {
            filename: file.name.clone(),
            content_type: file.content_type.clone(),
            extension: file.extension(),
            id: presign.fields.id.clone(),
            object_key: presign.fields.object_key.clone(),
            length: file.size,
        }
    }

    pub fn completion(&self, object_key: &str, alt_text: Option<String>) -> Result<UploadCompletion, UploadError> {
        if object_key.is_empty() {
            return Err(UploadError::MissingObjectKey);
        }
        Ok(UploadCompletion {
            url: self.object_url(object_key),
            alt_text,
        })
    }

    /// Completion for an upload that went through the media endpoint.
    pub fn completion_from_response(
        &self,
        response: &UploadResponse,
        file: &UploadFile,
    ) -> Result<UploadCompletion, UploadError> {
        self.completion(&response.fields.object_key, file.alt_text.clone())
    }
}

fn type_matches(allowed: &str, file: &UploadFile) -> bool {
    let allowed = allowed.to_ascii_lowercase();
    let content_type = file.content_type.to_ascii_lowercase();

    if let Some(ext) = allowed.strip_prefix('.') {
        return file.extension() == ext;
    }
    if let Some(prefix) = allowed.strip_suffix("/*") {
        return content_type
            .split_once('/')
            .is_some_and(|(kind, _)| kind == prefix);
    }
    content_type == allowed
}
