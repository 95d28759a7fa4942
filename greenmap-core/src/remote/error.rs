use thiserror::Error;

/// Errors raised while talking to a [`crate::RemoteStore`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// No access credential is configured.
    #[error("remote access credential is not configured")]
    MissingCredential,
    /// The configured credential cannot be sent, e.g. it contains a newline.
    #[error("remote access credential is not a valid header value")]
    InvalidCredential,
    /// The document does not exist yet.
    #[error("remote document {url} does not exist")]
    NotFound {
        /// Requested URL.
        url: String,
    },
    /// The store answered with a non-success status.
    #[error("request to {url} failed with status {status}: {message}")]
    Http {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Message supplied by the store, if any.
        message: String,
    },
    /// The request did not complete in time.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout {
        /// Requested URL.
        url: String,
        /// Configured timeout in seconds.
        timeout_secs: u64,
    },
    /// The request failed below the HTTP layer.
    #[error("network error contacting {url}: {message}")]
    Network {
        /// Requested URL.
        url: String,
        /// Transport error description.
        message: String,
    },
    /// The response body could not be understood.
    #[error("unexpected response from {url}: {message}")]
    InvalidResponse {
        /// Requested URL.
        url: String,
        /// Decoder error description.
        message: String,
    },
}

impl RemoteError {
    /// Whether the store rejected a write because the version token was stale.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Http { status: 409, .. })
    }
}
