//! Facade crate for the greenmap green-space catalogue.
//!
//! This crate re-exports the catalogue model and store from `greenmap-core`
//! and, behind the `data` feature, the file cache and GitHub adapters.

#![forbid(unsafe_code)]

pub use greenmap_core::{
    CACHE_KEY, CacheError, Catalog, CatalogDocument, CatalogStore, Clock, Coords, DEFAULT_CITY,
    GreenKind, GreenObject, ImportPolicy, KindCounts, LocalCache, MergeOutcome, Metadata,
    MetadataPatch, NewObject, ObjectId, ObjectPatch, ParseError, PutRequest, RemoteDocument,
    RemoteError, RemoteStore, SaveOutcome, Statistics, StatusReporter, StatusUpdate, StoreError,
    SyncStatus, SystemClock, UNREADABLE_CACHE_KEY, VersionToken,
};

#[cfg(feature = "data")]
pub use greenmap_data::{
    DEFAULT_API_BASE, DEFAULT_DOCUMENT_PATH, DEFAULT_USER_AGENT, FileCache, GithubContentsStore,
    GithubStoreConfig, RemoteBuildError,
};
