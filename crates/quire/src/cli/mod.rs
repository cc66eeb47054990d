//! Command dispatch.

mod args;
mod commands;

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use quire_core::backend::BackendRegistry;
use quire_core::storage::FileStore;
use quire_core::{CmsConfig, Engine, QuireError};
use thiserror::Error;
use tracing::{debug, error};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use args::{Cli, Command};

/// Errors reported by the command line.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] QuireError),

    #[error("{0}")]
    Usage(String),

    #[error("could not write output: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type CliResult<T> = Result<T, CliError>;

pub fn run_cli() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quire=info,quire_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut stdout = std::io::stdout().lock();
    match runtime.block_on(run(cli, &mut stdout)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Run one command, writing its output to `out`.
pub async fn run(cli: Cli, out: &mut dyn Write) -> CliResult<()> {
    let engine = Arc::new(build_engine(&cli).await?);
    commands::dispatch(engine, cli.command, out).await
}

fn backup_dir(cli: &Cli) -> PathBuf {
    cli.backups.clone().unwrap_or_else(|| {
        dirs::data_dir()
            .map(|dir| dir.join("quire").join("backups"))
            .unwrap_or_else(|| PathBuf::from(".quire/backups"))
    })
}

async fn build_engine(cli: &Cli) -> CliResult<Engine> {
    let mut config = CmsConfig::load(&cli.config)?;
    if let Some(root) = &cli.root {
        config.backend.root = Some(root.clone());
    } else if config.backend.name == "local" && config.backend.root.is_none() {
        // Paths in the configuration are relative to the file's folder.
        let base = cli.config.parent().map(PathBuf::from).unwrap_or_default();
        config.backend.root = Some(base);
    }
    let backups = backup_dir(cli);
    debug!(config = %cli.config.display(), backups = %backups.display(), "building engine");
    Ok(Engine::builder(config)
        .registry(BackendRegistry::with_builtins())
        .store(Arc::new(FileStore::new(backups)))
        .build()
        .await?)
}
