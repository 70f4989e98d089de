//! Request payloads and the few response shapes the client reads itself.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One job for the batch downloader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentDownload {
    /// LeanKit attachment id.
    pub id: u64,
    /// Destination, relative to the working directory unless absolute.
    pub path: PathBuf,
}

impl AttachmentDownload {
    /// Creates a download job.
    #[must_use]
    pub fn new(id: u64, path: impl Into<PathBuf>) -> Self {
        Self {
            id,
            path: path.into(),
        }
    }
}

/// Attachment metadata as listed by `getAttachments`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Attachment {
    /// Attachment id.
    pub id: u64,
    /// Original file name.
    pub file_name: String,
    /// Description given at upload.
    #[serde(default)]
    pub description: Option<String>,
    /// Size in bytes.
    #[serde(default)]
    pub attachment_size: Option<u64>,
    /// Card the attachment belongs to.
    #[serde(default)]
    pub card_id: Option<u64>,
    /// Uploader display name.
    #[serde(default)]
    pub created_by_full_name: Option<String>,
}

impl Attachment {
    /// Reads attachments out of a `getAttachments` payload, which may be a
    /// single object or a list.
    ///
    /// # Errors
    ///
    /// Returns the deserialization error when the shape does not match.
    pub fn list_from_value(value: Value) -> Result<Vec<Self>, serde_json::Error> {
        match value {
            Value::Null => Ok(Vec::new()),
            Value::Array(_) => serde_json::from_value(value),
            other => serde_json::from_value(other).map(|one| vec![one]),
        }
    }
}

/// Body of `saveComment`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentRequest<'a> {
    /// Comment text (HTML allowed).
    #[serde(rename = "Text")]
    pub text: &'a str,
}

/// Body of `AssignUserLite`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AssignUserRequest<'a> {
    /// Card to assign.
    pub card_id: u64,
    /// User to assign.
    pub user_id: u64,
    /// Required by LeanKit when the assignment breaks a WIP limit.
    pub override_comment: Option<&'a str>,
}

/// Body of `UnassignUserLite`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UnassignUserRequest {
    /// Card to unassign.
    pub card_id: u64,
    /// User to remove.
    pub user_id: u64,
}
