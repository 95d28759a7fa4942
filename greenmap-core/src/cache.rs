//! Local durable cache holding the whole catalogue as plain JSON text.
//!
//! The cache is addressed by a single fixed key. Reads and writes are
//! synchronous; failures are reported as [`CacheError`] and the store treats
//! every one of them as non-fatal.

use thiserror::Error;

/// Key under which the catalogue is cached.
pub const CACHE_KEY: &str = "biysk-green-backup";

/// Key receiving a copy of a cached catalogue that could not be decoded.
pub const UNREADABLE_CACHE_KEY: &str = "biysk-green-backup-unreadable";

/// Errors raised by a [`LocalCache`].
#[derive(Debug, Error)]
pub enum CacheError {
    /// Reading or writing the backing storage failed.
    #[error("cache I/O failed for key {key}: {source}")]
    Io {
        /// Key being accessed.
        key: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The value does not fit in the configured quota.
    #[error("cache quota exceeded for key {key}: {needed} bytes needed, {limit} allowed")]
    QuotaExceeded {
        /// Key being written.
        key: String,
        /// Size of the rejected value in bytes.
        needed: usize,
        /// Configured limit in bytes.
        limit: usize,
    },
}

/// Key-value durable storage scoped to one client.
///
/// # Examples
///
/// ```
/// use greenmap_core::{CACHE_KEY, LocalCache};
/// use greenmap_core::test_support::MemoryCache;
///
/// let cache = MemoryCache::default();
/// cache.store(CACHE_KEY, "{}")?;
/// assert_eq!(cache.load(CACHE_KEY)?.as_deref(), Some("{}"));
/// # Ok::<(), greenmap_core::CacheError>(())
/// ```
pub trait LocalCache {
    /// Return the text stored under `key`, or `None` when nothing is stored.
    fn load(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Replace the text stored under `key`.
    fn store(&self, key: &str, value: &str) -> Result<(), CacheError>;
}

impl<T: LocalCache + ?Sized> LocalCache for &T {
    fn load(&self, key: &str) -> Result<Option<String>, CacheError> {
        (**self).load(key)
    }

    fn store(&self, key: &str, value: &str) -> Result<(), CacheError> {
        (**self).store(key, value)
    }
}
