//! Command-line interface for the green-space catalogue.
#![forbid(unsafe_code)]

use std::io::{self, Write};

use clap::Parser;
use greenmap_core::CatalogStore;
use greenmap_data::{FileCache, GithubContentsStore};
use log::info;

mod commands;
mod config;
mod error;

use commands::{Command, execute};
use config::{CatalogConfig, ConnectionArgs};
pub use error::CliError;

/// Store driven by the CLI. `None` as the remote means no access token.
type CliStore = CatalogStore<FileCache, Option<GithubContentsStore>>;

/// Run the greenmap CLI with the current process arguments and environment.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    let config = cli.connection.into_config()?;
    let stdout = io::stdout();
    run_with(&config, cli.command, &mut stdout.lock())
}

fn run_with<W: Write>(config: &CatalogConfig, command: Command, out: &mut W) -> Result<(), CliError> {
    let mut store = open_store(config)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    runtime.block_on(async {
        store.init().await;
        execute(&mut store, command, out).await
    })?;

    if let Some(update) = store.last_status() {
        info!("{}: {}", update.status, update.message);
    }
    Ok(())
}

fn open_store(config: &CatalogConfig) -> Result<CliStore, CliError> {
    let cache = config.open_cache()?;
    let remote = config.build_remote()?;
    Ok(CatalogStore::new(cache, remote)
        .with_city(config.city.clone())
        .with_online(!config.offline))
}

#[derive(Debug, Parser)]
#[command(
    name = "greenmap",
    about = "Catalogue trees, lawns and bushes with a GitHub-hosted copy",
    version
)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,
    #[command(subcommand)]
    command: Command,
}

#[cfg(test)]
mod tests;
