//! Error taxonomy for the reorganization engine.
//!
//! Structural failures (missing root, empty undo log, malformed plan) are
//! returned as `ReorgError`. Per-item problems during planning, execution and
//! plugin loading are collected into reports instead and never surface here.

use std::path::PathBuf;
use thiserror::Error;

use crate::plugins::PluginError;
use crate::provider::ProviderError;

/// Top-level error for engine and session operations
#[derive(Debug, Error)]
pub enum ReorgError {
    #[error("The directory '{}' does not exist.", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Invalid move plan: {0}")]
    InvalidPlan(String),

    #[error("Structure edit rejected: {0}")]
    EditRejected(String),

    #[error("Reorganization cancelled before any file was moved")]
    Cancelled,

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Plugin(#[from] PluginError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Background task failed: {0}")]
    Task(String),
}

/// Errors raised while loading configuration or selecting collaborators
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unknown suggestion provider mode: {0}")]
    UnknownProvider(String),

    #[error("Provider '{mode}' requires {what}")]
    MissingSetting { mode: String, what: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

pub type Result<T, E = ReorgError> = std::result::Result<T, E>;
