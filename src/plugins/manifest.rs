//! JSON plugin manifests
//!
//! ```json
//! { "name": "notify", "kind": "post_reorganization",
//!   "program": "notify-send", "args": ["Reorganized {root}"] }
//! ```

use serde::Deserialize;
use std::fs;
use std::path::Path;

use super::command::CommandPlugin;
use super::record::{PluginKind, PluginRecord};
use super::PluginError;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PluginManifest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub kind: PluginKind,
    #[serde(default)]
    pub program: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
}

impl PluginManifest {
    /// Validate and turn into a registrable record
    pub fn into_record(self) -> Result<PluginRecord, String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err("plugin name must not be empty".to_string());
        }

        let mut record = PluginRecord::new(name, self.kind).with_description(self.description);
        match self.program {
            Some(program) if program.trim().is_empty() => {
                return Err("program must not be empty".to_string());
            }
            Some(program) => {
                record = record.with_execute(CommandPlugin::new(name, program, self.args));
            }
            None if !self.args.is_empty() => {
                return Err("args given without a program".to_string());
            }
            None => {}
        }
        Ok(record)
    }
}

/// Read, parse and validate one manifest file
pub fn load_manifest(path: &Path) -> Result<PluginRecord, PluginError> {
    let failed = |reason: String| PluginError::LoadFailed {
        origin: path.display().to_string(),
        reason,
    };

    let content = fs::read_to_string(path).map_err(|e| failed(e.to_string()))?;
    let manifest: PluginManifest =
        serde_json::from_str(&content).map_err(|e| failed(e.to_string()))?;
    manifest.into_record().map_err(failed)
}
