//! Remote catalogue storage in a GitHub repository.
//!
//! The catalogue lives in a single JSON file. [`GithubContentsStore`] reads
//! it with `GET /repos/{owner}/{repo}/contents/{path}` and replaces it with a
//! `PUT` to the same endpoint, passing the blob SHA of the revision it read.
//! GitHub answers `409 Conflict` when that SHA is stale.
//!
//! # Example
//!
//! ```no_run
//! use greenmap_core::{RemoteStore, remote::transport};
//! use greenmap_data::{GithubContentsStore, GithubStoreConfig};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GithubStoreConfig::new("city-greens", "biysk-map").with_token("ghp_example");
//! let store = GithubContentsStore::new(config)?;
//!
//! let document = store.fetch_document().await?;
//! println!("{}", transport::decode(&document.encoded_content)?);
//! # Ok(())
//! # }
//! ```

mod config;
mod contents;
mod store;

pub use config::{DEFAULT_API_BASE, DEFAULT_DOCUMENT_PATH, DEFAULT_USER_AGENT, GithubStoreConfig};
pub use store::{GithubContentsStore, RemoteBuildError};
