//! GitHub contents API request and response bodies.
//!
//! Only the fields the catalogue needs are modelled.
//!
//! See: <https://docs.github.com/en/rest/repos/contents>

use serde::{Deserialize, Serialize};

/// Encoding GitHub reports for inline file content.
pub const BASE64_ENCODING: &str = "base64";

/// Response to `GET /repos/{owner}/{repo}/contents/{path}` for a file.
#[derive(Debug, Deserialize)]
pub struct ContentsResponse {
    /// Blob SHA identifying the current revision.
    pub sha: String,

    /// File content, base64 with embedded line breaks.
    ///
    /// Empty when the file is too large to be returned inline.
    #[serde(default)]
    pub content: String,

    /// Encoding of `content`; `"none"` for oversized files.
    #[serde(default)]
    pub encoding: Option<String>,
}

impl ContentsResponse {
    /// Whether the content is inline and base64-encoded.
    #[must_use]
    pub fn has_inline_content(&self) -> bool {
        self.encoding.as_deref().is_none_or(|enc| enc == BASE64_ENCODING)
    }
}

/// Body of `PUT /repos/{owner}/{repo}/contents/{path}`.
#[derive(Debug, Serialize)]
pub struct PutContentsRequest<'a> {
    /// Commit message.
    pub message: &'a str,
    /// New content, base64-encoded.
    pub content: &'a str,
    /// SHA of the blob being replaced; omitted when creating the file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<&'a str>,
}

/// Error body returned with non-success statuses.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    /// Human-readable reason.
    pub message: String,
}
