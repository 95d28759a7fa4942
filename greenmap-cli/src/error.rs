//! Error types emitted by the greenmap CLI.
//!
//! Cache and remote-save problems are not errors here: the store logs them
//! and keeps working from memory. Only configuration, explicit I/O and
//! rejected operations surface as [`CliError`].

use std::sync::Arc;

use camino::Utf8PathBuf;
use greenmap_core::StoreError;
use greenmap_data::RemoteBuildError;
use thiserror::Error;

/// Errors emitted by the greenmap CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// The cache directory could not be created or opened.
    #[error("failed to open cache directory {path:?}: {source}")]
    OpenCache {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Constructing the GitHub store failed.
    #[error(transparent)]
    BuildRemote(#[from] RemoteBuildError),
    /// Building the async runtime failed.
    #[error("failed to build Tokio runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// No object carries the requested identifier.
    #[error("object {id} not found")]
    NotFound { id: String },
    /// `update` was given nothing to change.
    #[error("nothing to update for object {id}")]
    EmptyUpdate { id: String },
    /// A store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Reading the import file failed.
    #[error("failed to read import file {path:?}: {source}")]
    ReadImport {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Writing the export file failed.
    #[error("failed to write export file {path:?}: {source}")]
    WriteExport {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Serialising command output failed.
    #[error("failed to serialise output: {0}")]
    Serialize(#[source] serde_json::Error),
    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    Output(#[source] std::io::Error),
}
