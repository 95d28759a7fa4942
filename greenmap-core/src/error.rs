//! Errors surfaced by the catalogue store.
//!
//! Most failures never reach callers: cache and remote-save problems are
//! logged and turned into a status change. Only an explicit remote load and
//! an import return these errors.

use thiserror::Error;

use crate::RemoteError;

/// Errors raised when a payload cannot be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The text is not valid JSON for the expected document.
    #[error("malformed catalogue document: {message}")]
    Json {
        /// Decoder error description.
        message: String,
    },
    /// The document has no `objects` sequence.
    #[error("document does not contain an objects array")]
    MissingObjects,
    /// The transport encoding could not be removed.
    #[error("invalid transport encoding: {message}")]
    Transport {
        /// Decoder error description.
        message: String,
    },
}

impl From<serde_json::Error> for ParseError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json {
            message: err.to_string(),
        }
    }
}

/// Errors returned by [`crate::CatalogStore`] operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The operation needs a remote credential that is not configured.
    #[error("remote store is not configured: missing access credential")]
    Configuration,
    /// Talking to the remote store failed.
    #[error(transparent)]
    Remote(#[from] RemoteError),
    /// A payload could not be decoded.
    #[error(transparent)]
    Parse(#[from] ParseError),
}
