//! File-backed [`LocalCache`] storing each key as `<key>.json`.

use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::fs_utf8::Dir;
use greenmap_core::{CacheError, LocalCache};
use greenmap_fs::{ensure_dir, read_optional, write_atomic};
use log::debug;

/// Extension appended to cache keys.
const CACHE_EXTENSION: &str = "json";

/// Local cache rooted at a directory.
///
/// Writes replace the file atomically. An optional quota rejects values
/// larger than the limit, leaving the previous value in place.
///
/// # Examples
///
/// ```
/// use greenmap_core::{CACHE_KEY, LocalCache};
/// use greenmap_data::FileCache;
///
/// let temp = tempfile::tempdir()?;
/// let root = camino::Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
/// let cache = FileCache::open(root.join("cache"))?;
/// cache.store(CACHE_KEY, "{\"objects\":[]}")?;
/// assert!(root.join("cache/biysk-green-backup.json").is_file());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct FileCache {
    root: Utf8PathBuf,
    dir: Dir,
    quota: Option<usize>,
}

impl FileCache {
    /// Open (creating if needed) the cache directory at `root`.
    ///
    /// # Errors
    ///
    /// Returns the I/O error raised while creating or opening the directory.
    pub fn open(root: impl Into<Utf8PathBuf>) -> io::Result<Self> {
        let root = root.into();
        let dir = ensure_dir(&root)?;
        debug!("opened local cache at {root}");
        Ok(Self {
            root,
            dir,
            quota: None,
        })
    }

    /// Reject values larger than `limit` bytes.
    #[must_use]
    pub fn with_quota(mut self, limit: usize) -> Self {
        self.quota = Some(limit);
        self
    }

    /// Directory holding the cache files.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn file_name(key: &str) -> Result<String, CacheError> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && !key.contains(['/', '\\'])
            && Utf8Path::new(key).file_name() == Some(key);
        if valid {
            Ok(format!("{key}.{CACHE_EXTENSION}"))
        } else {
            Err(CacheError::Io {
                key: key.to_owned(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "invalid cache key"),
            })
        }
    }
}

impl LocalCache for FileCache {
    fn load(&self, key: &str) -> Result<Option<String>, CacheError> {
        let name = Self::file_name(key)?;
        read_optional(&self.dir, &name).map_err(|source| CacheError::Io {
            key: key.to_owned(),
            source,
        })
    }

    fn store(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let name = Self::file_name(key)?;
        if let Some(limit) = self.quota
            && value.len() > limit
        {
            return Err(CacheError::QuotaExceeded {
                key: key.to_owned(),
                needed: value.len(),
                limit,
            });
        }
        write_atomic(&self.dir, &name, value).map_err(|source| CacheError::Io {
            key: key.to_owned(),
            source,
        })
    }
}
