//! Plugin registry
//!
//! Discovers plugins from a manifest directory and from compiled-in
//! factories, keeps them in load order keyed by unique name, and dispatches
//! calls to them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::manifest::load_manifest;
use super::record::{PluginKind, PluginRecord};
use super::PluginError;

/// Zero-argument registration function for a compiled-in plugin
pub type PluginFactory = fn() -> Result<PluginRecord, PluginError>;

/// One plugin that could not be loaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadFailure {
    pub origin: String,
    pub reason: String,
}

/// Outcome of a `load` or `load_factories` pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadReport {
    /// Names registered, in load order
    pub loaded: Vec<String>,
    pub failures: Vec<LoadFailure>,
}

impl LoadReport {
    fn record_failure(&mut self, err: PluginError) {
        tracing::error!(error = %err, "Failed to load plugin");
        let failure = match err {
            PluginError::LoadFailed { origin, reason } => LoadFailure { origin, reason },
            other => LoadFailure {
                origin: String::new(),
                reason: other.to_string(),
            },
        };
        self.failures.push(failure);
    }
}

#[derive(Debug, Default)]
pub struct PluginRegistry {
    records: Vec<PluginRecord>,
    index: HashMap<String, usize>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `*.json` manifest in `dir`, in file-name order.
    ///
    /// The directory is created if missing. A manifest that fails to load is
    /// logged and reported; the rest still load.
    pub fn load(&mut self, dir: &Path) -> LoadReport {
        let mut report = LoadReport::default();

        if let Err(e) = fs::create_dir_all(dir) {
            report.record_failure(PluginError::LoadFailed {
                origin: dir.display().to_string(),
                reason: e.to_string(),
            });
            return report;
        }

        let manifests = match manifest_paths(dir) {
            Ok(paths) => paths,
            Err(e) => {
                report.record_failure(PluginError::LoadFailed {
                    origin: dir.display().to_string(),
                    reason: e.to_string(),
                });
                return report;
            }
        };

        for path in manifests {
            match load_manifest(&path) {
                Ok(record) => {
                    report.loaded.push(record.name.clone());
                    self.register(record);
                }
                Err(e) => report.record_failure(e),
            }
        }

        tracing::info!(
            dir = %dir.display(),
            loaded = report.loaded.len(),
            failed = report.failures.len(),
            "Loaded plugins"
        );
        report
    }

    /// Run one compiled-in registration function
    pub fn register_factory(&mut self, factory: PluginFactory) -> Result<(), PluginError> {
        let record = factory()?;
        self.register(record);
        Ok(())
    }

    /// Run several registration functions; failures are contained per factory
    pub fn load_factories(&mut self, factories: &[PluginFactory]) -> LoadReport {
        let mut report = LoadReport::default();
        for factory in factories {
            match factory() {
                Ok(record) => {
                    report.loaded.push(record.name.clone());
                    self.register(record);
                }
                Err(e) => report.record_failure(e),
            }
        }
        report
    }

    /// Add a record. A name already present is replaced in its original
    /// position.
    pub fn register(&mut self, record: PluginRecord) {
        match self.index.get(&record.name) {
            Some(&position) => {
                tracing::warn!(plugin = %record.name, "Plugin name already registered, replacing");
                self.records[position] = record;
            }
            None => {
                tracing::info!(plugin = %record.name, kind = %record.kind, "Registered plugin");
                self.index.insert(record.name.clone(), self.records.len());
                self.records.push(record);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&PluginRecord> {
        self.index.get(name).map(|&position| &self.records[position])
    }

    /// Records of one kind, in load order
    pub fn of_kind(&self, kind: PluginKind) -> impl Iterator<Item = &PluginRecord> {
        self.records.iter().filter(move |r| r.kind == kind)
    }

    /// All records in load order
    pub fn iter(&self) -> std::slice::Iter<'_, PluginRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Invoke a plugin by name.
    ///
    /// Unknown or non-executable plugins yield `Ok(None)`. Errors raised by
    /// the plugin are returned to the caller.
    pub fn dispatch(&self, name: &str, args: &[String]) -> Result<Option<String>, PluginError> {
        let Some(record) = self.get(name) else {
            tracing::warn!(plugin = %name, "Dispatch to unknown plugin");
            return Ok(None);
        };
        let Some(capability) = record.capability() else {
            tracing::debug!(plugin = %name, "Plugin has nothing to execute");
            return Ok(None);
        };

        capability.execute(args).map_err(|e| match e {
            PluginError::ExecutionFailed { .. } => e,
            other => PluginError::ExecutionFailed {
                name: name.to_string(),
                reason: other.to_string(),
            },
        })
    }
}

fn manifest_paths(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_manifest = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_manifest && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::CapturedLogs;
    use tempfile::TempDir;

    fn echo_factory() -> Result<PluginRecord, PluginError> {
        Ok(PluginRecord::new("echo", PluginKind::Generic)
            .with_execute(|args: &[String]| -> Result<Option<String>, PluginError> {
                Ok(Some(args.join(" ")))
            }))
    }

    fn failing_factory() -> Result<PluginRecord, PluginError> {
        Err(PluginError::LoadFailed {
            origin: "failing_factory".to_string(),
            reason: "not today".to_string(),
        })
    }

    fn broken_factory() -> Result<PluginRecord, PluginError> {
        Ok(PluginRecord::new("broken", PluginKind::PostReorganization).with_execute(
            |_: &[String]| -> Result<Option<String>, PluginError> {
                Err(PluginError::ExecutionFailed {
                    name: "broken".to_string(),
                    reason: "disk on fire".to_string(),
                })
            },
        ))
    }

    #[test]
    fn test_failed_manifest_does_not_block_others() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("01-first.json"), r#"{ "name": "first" }"#).unwrap();
        fs::write(dir.path().join("02-second.json"), r#"{ "name": "#).unwrap();
        fs::write(
            dir.path().join("03-third.json"),
            r#"{ "name": "third", "kind": "post_undo" }"#,
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let logs = CapturedLogs::default();
        let mut registry = PluginRegistry::new();
        let report = logs.capture(|| registry.load(dir.path()));

        assert_eq!(report.loaded, vec!["first".to_string(), "third".to_string()]);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].origin.ends_with("02-second.json"));

        assert!(registry.get("first").is_some());
        assert!(registry.get("third").is_some());
        assert_eq!(registry.len(), 2);

        let output = logs.contents();
        assert!(output.contains("ERROR"));
        assert!(output.contains("Failed to load plugin"));
        assert!(output.contains("02-second.json"));
    }

    #[test]
    fn test_load_creates_missing_dir() {
        let dir = TempDir::new().unwrap();
        let plugin_dir = dir.path().join("plugins");

        let report = PluginRegistry::new().load(&plugin_dir);

        assert!(plugin_dir.is_dir());
        assert_eq!(report, LoadReport::default());
    }

    #[test]
    fn test_last_loaded_wins_in_place() {
        let mut registry = PluginRegistry::new();
        registry.register(PluginRecord::new("a", PluginKind::Generic).with_description("old"));
        registry.register(PluginRecord::new("b", PluginKind::Generic));
        registry.register(PluginRecord::new("a", PluginKind::PostUndo).with_description("new"));

        let names: Vec<_> = registry.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(registry.get("a").unwrap().description, "new");
        assert_eq!(registry.get("a").unwrap().kind, PluginKind::PostUndo);
    }

    #[test]
    fn test_factories() {
        let mut registry = PluginRegistry::new();
        let report = registry.load_factories(&[echo_factory, failing_factory, broken_factory]);

        assert_eq!(report.loaded, vec!["echo".to_string(), "broken".to_string()]);
        assert_eq!(report.failures[0].origin, "failing_factory");

        assert!(registry.register_factory(failing_factory).is_err());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_dispatch() {
        let mut registry = PluginRegistry::new();
        registry.register_factory(echo_factory).unwrap();
        registry.register(PluginRecord::new("inert", PluginKind::Generic));

        let args = vec!["x".to_string(), "y".to_string()];
        assert_eq!(registry.dispatch("echo", &args).unwrap(), Some("x y".to_string()));
        assert_eq!(registry.dispatch("inert", &args).unwrap(), None);
        assert_eq!(registry.dispatch("nobody", &args).unwrap(), None);
    }

    #[test]
    fn test_dispatch_error_propagates_and_registry_survives() {
        let mut registry = PluginRegistry::new();
        registry.register_factory(broken_factory).unwrap();

        let err = registry.dispatch("broken", &[]).unwrap_err();
        assert!(matches!(err, PluginError::ExecutionFailed { .. }));
        assert!(err.to_string().contains("disk on fire"));
        assert!(registry.get("broken").is_some());
    }

    #[test]
    fn test_of_kind_in_load_order() {
        let mut registry = PluginRegistry::new();
        registry.register(PluginRecord::new("z", PluginKind::PostReorganization));
        registry.register(PluginRecord::new("m", PluginKind::Generic));
        registry.register(PluginRecord::new("a", PluginKind::PostReorganization));

        let names: Vec<_> = registry
            .of_kind(PluginKind::PostReorganization)
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(names, vec!["z", "a"]);
    }
}
