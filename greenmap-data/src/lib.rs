//! Storage adapters for the green-space catalogue.
//!
//! Responsibilities:
//! - Persist the catalogue on local disk ([`FileCache`]).
//! - Read and write the shared remote copy through GitHub
//!   ([`GithubContentsStore`]).
//!
//! Boundaries:
//! - Merge, import and sync policy live in `greenmap-core`; adapters only
//!   move text and version tokens.
//! - Adapters never decode the catalogue themselves.

mod cache;
pub mod github;

pub use cache::FileCache;
pub use github::{
    DEFAULT_API_BASE, DEFAULT_DOCUMENT_PATH, DEFAULT_USER_AGENT, GithubContentsStore,
    GithubStoreConfig, RemoteBuildError,
};
