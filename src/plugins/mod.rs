//! Plugin system
//!
//! Plugins are discovered from JSON manifests in a plugin directory or
//! registered from compiled-in factories. Each has a kind that decides which
//! hook dispatches it:
//! - `generic`: only invoked by name
//! - `post_reorganization`: after a successful execute
//! - `post_undo`: after an undo

mod command;
mod manifest;
mod record;
mod registry;

pub use command::CommandPlugin;
pub use manifest::{load_manifest, PluginManifest};
pub use record::{PluginExecute, PluginInfo, PluginKind, PluginRecord};
pub use registry::{LoadFailure, LoadReport, PluginFactory, PluginRegistry};

/// Plugin errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum PluginError {
    #[error("Plugin load failed ({origin}): {reason}")]
    LoadFailed { origin: String, reason: String },

    #[error("Plugin '{name}' execution failed: {reason}")]
    ExecutionFailed { name: String, reason: String },
}
