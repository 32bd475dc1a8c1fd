pub mod cli;
pub mod config;
pub mod error;
pub mod execution;
pub mod index;
pub mod planning;
pub mod plugins;
pub mod proposal;
pub mod provider;
pub mod session;

#[cfg(test)]
mod test_support;

pub use config::{Config, ProviderConfig};
pub use error::{ConfigError, ReorgError, Result};
pub use execution::{ConflictPolicy, ExecutionReport, ReorganizationExecutor, UndoStore};
pub use index::{FileInventory, PathIndex, TreeSnapshot};
pub use planning::{AllowedExtensions, MoveOperation, MovePlan, MovePlanner};
pub use plugins::{PluginKind, PluginRecord, PluginRegistry};
pub use proposal::{ProposalBuilder, ProposedStructure, StructureEdit};
pub use provider::SuggestionProvider;
pub use session::{Analysis, CycleReport, ReorgEvent, ReorgSession};

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Entry point for the `folder-reorg` binary
pub async fn run() -> ExitCode {
    // Keys may live in a .env next to the working directory
    let _ = dotenvy::dotenv();

    let cli = cli::Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            init_tracing("info");
            tracing::error!(error = %e, "Failed to load config");
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config.log_level);

    match cli::execute(cli, config).await {
        Ok(code) => code,
        Err(e) => {
            tracing::debug!(error = ?e, "Command failed");
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// RUST_LOG wins; otherwise warn for dependencies and `level` for this crate.
/// Logs go to stderr so `--json` output stays parseable.
fn init_tracing(level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("warn,folder_reorg={}", level))),
        )
        .with_writer(std::io::stderr)
        .try_init();
}
