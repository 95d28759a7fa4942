//! Layered connection settings shared by every subcommand.

use camino::Utf8PathBuf;
use clap::Parser;
use greenmap_core::DEFAULT_CITY;
use greenmap_data::{FileCache, GithubContentsStore, GithubStoreConfig};
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::CliError;

pub(crate) const ARG_OWNER: &str = "owner";
pub(crate) const ARG_REPO: &str = "repo";
pub(crate) const ENV_OWNER: &str = "GREENMAP_CMDS_GREENMAP_OWNER";
pub(crate) const ENV_REPO: &str = "GREENMAP_CMDS_GREENMAP_REPO";

/// Cache directory used when none is configured.
pub(crate) const DEFAULT_CACHE_DIR: &str = ".greenmap";

/// Connection and cache settings. Values can come from CLI flags,
/// configuration files, or environment variables.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(name = "greenmap")]
#[ortho_config(prefix = "GREENMAP")]
pub(crate) struct ConnectionArgs {
    /// Owner of the GitHub repository holding the catalogue.
    #[arg(long = ARG_OWNER, value_name = "owner", global = true)]
    #[serde(default)]
    pub(crate) owner: Option<String>,
    /// Name of the GitHub repository holding the catalogue.
    #[arg(long = ARG_REPO, value_name = "repo", global = true)]
    #[serde(default)]
    pub(crate) repo: Option<String>,
    /// Personal access token; without one the catalogue stays local.
    #[arg(long, value_name = "token", global = true)]
    #[serde(default)]
    pub(crate) token: Option<String>,
    /// Path of the catalogue file inside the repository.
    #[arg(long, value_name = "path", global = true)]
    #[serde(default)]
    pub(crate) path: Option<String>,
    /// GitHub API root, for GitHub Enterprise installations.
    #[arg(long = "api-base", value_name = "url", global = true)]
    #[serde(default)]
    pub(crate) api_base: Option<String>,
    /// Directory holding the local cache.
    #[arg(long = "cache-dir", value_name = "dir", global = true)]
    #[serde(default)]
    pub(crate) cache_dir: Option<Utf8PathBuf>,
    /// City recorded in a new catalogue.
    #[arg(long, value_name = "name", global = true)]
    #[serde(default)]
    pub(crate) city: Option<String>,
    /// Never contact the remote store.
    #[arg(
        long,
        global = true,
        num_args = 0..=1,
        default_missing_value = "true",
        value_name = "bool"
    )]
    #[serde(default)]
    pub(crate) offline: Option<bool>,
}

impl ConnectionArgs {
    pub(crate) fn into_config(self) -> Result<CatalogConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        CatalogConfig::try_from(merged)
    }
}

/// Resolved connection settings.
#[derive(Debug, Clone)]
pub(crate) struct CatalogConfig {
    pub(crate) cache_dir: Utf8PathBuf,
    pub(crate) city: String,
    pub(crate) offline: bool,
    /// `None` when no token is configured.
    pub(crate) remote: Option<GithubStoreConfig>,
}

impl CatalogConfig {
    pub(crate) fn open_cache(&self) -> Result<FileCache, CliError> {
        FileCache::open(self.cache_dir.clone()).map_err(|source| CliError::OpenCache {
            path: self.cache_dir.clone(),
            source,
        })
    }

    pub(crate) fn build_remote(&self) -> Result<Option<GithubContentsStore>, CliError> {
        self.remote
            .clone()
            .map(GithubContentsStore::new)
            .transpose()
            .map_err(CliError::from)
    }
}

impl TryFrom<ConnectionArgs> for CatalogConfig {
    type Error = CliError;

    fn try_from(args: ConnectionArgs) -> Result<Self, Self::Error> {
        let token = args.token.filter(|token| !token.trim().is_empty());
        let remote = match token {
            Some(token) => {
                let owner = args.owner.ok_or(CliError::MissingArgument {
                    field: ARG_OWNER,
                    env: ENV_OWNER,
                })?;
                let repo = args.repo.ok_or(CliError::MissingArgument {
                    field: ARG_REPO,
                    env: ENV_REPO,
                })?;
                let mut config = GithubStoreConfig::new(owner, repo).with_token(token);
                if let Some(path) = args.path {
                    config = config.with_path(path);
                }
                if let Some(api_base) = args.api_base {
                    config = config.with_api_base(api_base);
                }
                Some(config)
            }
            None => {
                info!("no access token configured; the catalogue stays local");
                None
            }
        };

        Ok(Self {
            cache_dir: args
                .cache_dir
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_CACHE_DIR)),
            city: args.city.unwrap_or_else(|| DEFAULT_CITY.to_owned()),
            offline: args.offline.unwrap_or(false),
            remote,
        })
    }
}
