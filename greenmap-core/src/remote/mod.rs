//! Contract of the remote single-document store.
//!
//! The remote side holds one JSON document whose content travels
//! base64-encoded (see [`transport`]) and whose revisions are identified by
//! an opaque [`VersionToken`]. Writes carry the last token read so the store
//! can reject a write based on a stale revision.

mod error;
pub mod transport;

use async_trait::async_trait;

pub use error::RemoteError;

/// Opaque identifier of one revision of the remote document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionToken(String);

impl VersionToken {
    /// Wrap a token received from the remote store.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for VersionToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for VersionToken {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// The remote document as fetched, still transport-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDocument {
    /// Revision of the fetched content.
    pub version: VersionToken,
    /// Base64 content exactly as received.
    pub encoded_content: String,
}

/// A conditional write of the whole document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutRequest {
    /// Human-readable changelog message.
    pub message: String,
    /// Base64-encoded new content.
    pub encoded_content: String,
    /// Revision the write is based on; `None` creates the document.
    pub version: Option<VersionToken>,
}

/// Remote single-document store.
///
/// Implementations authenticate with a single static credential.
/// [`RemoteStore::is_configured`] reports whether one is present; the store
/// never issues requests without it.
#[async_trait(?Send)]
pub trait RemoteStore {
    /// Whether an access credential is configured.
    fn is_configured(&self) -> bool;

    /// Fetch the current document.
    ///
    /// A missing document is reported as [`RemoteError::NotFound`].
    async fn fetch_document(&self) -> Result<RemoteDocument, RemoteError>;

    /// Write the whole document, conditional on `request.version`.
    async fn put_document(&self, request: PutRequest) -> Result<(), RemoteError>;
}

#[async_trait(?Send)]
impl<T: RemoteStore + ?Sized> RemoteStore for &T {
    fn is_configured(&self) -> bool {
        (**self).is_configured()
    }

    async fn fetch_document(&self) -> Result<RemoteDocument, RemoteError> {
        (**self).fetch_document().await
    }

    async fn put_document(&self, request: PutRequest) -> Result<(), RemoteError> {
        (**self).put_document(request).await
    }
}

/// An absent remote store: never configured, every request fails with
/// [`RemoteError::MissingCredential`].
#[async_trait(?Send)]
impl<T: RemoteStore> RemoteStore for Option<T> {
    fn is_configured(&self) -> bool {
        self.as_ref().is_some_and(RemoteStore::is_configured)
    }

    async fn fetch_document(&self) -> Result<RemoteDocument, RemoteError> {
        match self {
            Some(remote) => remote.fetch_document().await,
            None => Err(RemoteError::MissingCredential),
        }
    }

    async fn put_document(&self, request: PutRequest) -> Result<(), RemoteError> {
        match self {
            Some(remote) => remote.put_document(request).await,
            None => Err(RemoteError::MissingCredential),
        }
    }
}
