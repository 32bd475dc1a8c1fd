//! Application configuration
//!
//! Loaded from a JSON file (default `<config dir>/folder-reorg/config.json`),
//! then overridden by `REORG_*` environment variables. A missing default
//! file means defaults. API keys are never stored here; providers read them
//! from the environment.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::execution::{ConflictPolicy, UndoStore};
use crate::planning::AllowedExtensions;

pub const ENV_PROVIDER: &str = "REORG_PROVIDER";
pub const ENV_ALLOWED_EXTENSIONS: &str = "REORG_ALLOWED_EXTENSIONS";
pub const ENV_PLUGIN_DIR: &str = "REORG_PLUGIN_DIR";
pub const ENV_LOG_LEVEL: &str = "REORG_LOG_LEVEL";

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: ProviderConfig,
    /// Extensions the planner admits; empty admits nothing
    pub allowed_extensions: AllowedExtensions,
    pub plugin_dir: PathBuf,
    pub log_level: String,
    pub on_destination_exists: ConflictPolicy,
    /// Where the last reorganization is persisted for undo
    pub undo_store: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            allowed_extensions: AllowedExtensions::default(),
            plugin_dir: default_plugin_dir(),
            log_level: default_log_level(),
            on_destination_exists: ConflictPolicy::default(),
            undo_store: None,
        }
    }
}

fn default_plugin_dir() -> PathBuf {
    PathBuf::from("plugins")
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Suggestion provider selection and tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// openai / perplexity / bing / local / huggingface / anthropic / static
    pub mode: String,
    pub model: Option<String>,
    pub endpoint: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
    /// Text returned by the `static` provider
    pub static_text: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            model: None,
            endpoint: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
            static_text: default_static_text(),
        }
    }
}

fn default_mode() -> String {
    "static".to_string()
}

fn default_max_tokens() -> u32 {
    512
}

fn default_temperature() -> f32 {
    0.7
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_static_text() -> String {
    "group by type".to_string()
}

impl Config {
    /// `<config dir>/folder-reorg/config.json`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("folder-reorg")
            .join("config.json")
    }

    /// Load the file, then apply environment overrides.
    ///
    /// An explicit path must exist; the default path may be absent.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default = Self::default_path();
                if default.exists() {
                    Self::from_file(&default)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `REORG_*` overrides read through `lookup`
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(mode) = lookup(ENV_PROVIDER) {
            self.provider.mode = mode.trim().to_lowercase();
        }
        if let Some(list) = lookup(ENV_ALLOWED_EXTENSIONS) {
            self.allowed_extensions = AllowedExtensions::parse_list(&list);
        }
        if let Some(dir) = lookup(ENV_PLUGIN_DIR) {
            self.plugin_dir = PathBuf::from(dir);
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            let level = level.trim().to_lowercase();
            if !LOG_LEVELS.contains(&level.as_str()) {
                return Err(ConfigError::InvalidValue {
                    key: ENV_LOG_LEVEL.to_string(),
                    value: level,
                });
            }
            self.log_level = level;
        }
        Ok(())
    }

    pub fn undo_store_path(&self) -> PathBuf {
        self.undo_store
            .clone()
            .unwrap_or_else(UndoStore::default_path)
    }
}
