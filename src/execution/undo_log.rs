//! Undo log and its on-disk store
//!
//! The log holds the successful moves of the most recent run. The store is
//! a single JSON file written atomically under an exclusive lock so a later
//! process can undo the previous run.

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::planning::MoveOperation;

/// Persisted form of the undo log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoRecord {
    pub run_id: Uuid,
    pub executed_at: DateTime<Utc>,
    pub moves: Vec<MoveOperation>,
}

/// Applied moves of the last run, in the order performed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UndoLog {
    run: Option<(Uuid, DateTime<Utc>)>,
    moves: Vec<MoveOperation>,
}

impl UndoLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new undo boundary, discarding whatever was recorded
    pub fn begin(&mut self, run_id: Uuid, executed_at: DateTime<Utc>) {
        self.run = Some((run_id, executed_at));
        self.moves.clear();
    }

    pub fn record(&mut self, operation: MoveOperation) {
        self.moves.push(operation);
    }

    pub fn clear(&mut self) {
        self.run = None;
        self.moves.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn moves(&self) -> &[MoveOperation] {
        &self.moves
    }

    /// Run that produced the log, if any
    pub fn run_id(&self) -> Option<Uuid> {
        self.run.map(|(id, _)| id)
    }

    pub fn to_record(&self) -> Option<UndoRecord> {
        self.run.map(|(run_id, executed_at)| UndoRecord {
            run_id,
            executed_at,
            moves: self.moves.clone(),
        })
    }

    pub fn from_record(record: UndoRecord) -> Self {
        Self {
            run: Some((record.run_id, record.executed_at)),
            moves: record.moves,
        }
    }
}

/// JSON file holding the last `UndoRecord`
#[derive(Debug, Clone)]
pub struct UndoStore {
    path: PathBuf,
}

impl UndoStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/folder-reorg/last_reorganization.json`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("folder-reorg")
            .join("last_reorganization.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored record. A missing file is `Ok(None)`.
    pub fn load(&self) -> io::Result<Option<UndoRecord>> {
        let _lock = self.acquire_lock()?;
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Write the record atomically (temp file, then rename)
    pub fn save(&self, record: &UndoRecord) -> io::Result<()> {
        let _lock = self.acquire_lock()?;
        let json = serde_json::to_string_pretty(record)?;
        let temp_path = self.sibling("tmp");

        fs::write(&temp_path, json)?;
        if let Err(e) = fs::rename(&temp_path, &self.path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }
        Ok(())
    }

    /// Remove the stored record
    pub fn clear(&self) -> io::Result<()> {
        let _lock = self.acquire_lock()?;
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".");
        name.push(suffix);
        PathBuf::from(name)
    }

    /// Held for the duration of a read or write; released on drop.
    fn acquire_lock(&self) -> io::Result<File> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.sibling("lock"))?;
        lock_file.lock_exclusive()?;
        Ok(lock_file)
    }
}
