//! Directory scanner
//!
//! Walks an analysis root with walkdir and produces both the nested
//! `TreeSnapshot` and the flat `FileInventory` from the same traversal.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::WalkDir;

use super::snapshot::{FileInventory, TreeSnapshot};
use crate::error::{ReorgError, Result};

/// Configuration for the path index
#[derive(Debug, Clone, Default)]
pub struct PathIndex {
    /// Maximum depth to scan (0 = unlimited)
    max_depth: usize,
}

/// Statistics from a scan operation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanStats {
    /// Total number of files found
    pub total_files: usize,

    /// Total number of directories found (root excluded)
    pub total_dirs: usize,

    /// Time taken to scan in milliseconds
    pub scan_duration_ms: u64,

    /// Number of entries skipped due to errors
    pub errors: usize,
}

/// Both views of one traversal
#[derive(Debug, Clone)]
pub struct Scan {
    pub snapshot: TreeSnapshot,
    pub inventory: FileInventory,
    pub stats: ScanStats,
}

impl PathIndex {
    /// Create a new index with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum scan depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Structural snapshot of `root`
    pub fn snapshot(&self, root: &Path) -> Result<TreeSnapshot> {
        Ok(self.scan(root)?.snapshot)
    }

    /// Every file under `root` as a sorted list of absolute paths
    pub fn inventory(&self, root: &Path) -> Result<FileInventory> {
        Ok(self.scan(root)?.inventory)
    }

    /// Walk `root` once and return the snapshot, the inventory and stats.
    ///
    /// Symlinks are not followed; a symlink entry is listed as a file.
    /// Entries that cannot be read, and entries whose path below `root` is
    /// not valid UTF-8 (with everything beneath them), are logged and
    /// counted in `errors`, not fatal. Neither view lists them.
    pub fn scan(&self, root: &Path) -> Result<Scan> {
        let start = Instant::now();
        let root = resolve_root(root)?;

        let mut snapshot = TreeSnapshot::new();
        let mut files = Vec::new();
        let mut stats = ScanStats::default();

        let mut walker = WalkDir::new(&root).follow_links(false).sort_by_file_name();
        if self.max_depth > 0 {
            walker = walker.max_depth(self.max_depth);
        }

        let mut entries = walker.into_iter();
        while let Some(entry_result) = entries.next() {
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unreadable entry");
                    stats.errors += 1;
                    continue;
                }
            };

            // The root itself is the snapshot node
            if entry.depth() == 0 {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(&root) else {
                stats.errors += 1;
                continue;
            };

            // Snapshot names are strings; keep both views on the same file set
            if relative.to_str().is_none() {
                tracing::warn!(path = %entry.path().display(), "Skipping non-UTF-8 entry");
                stats.errors += 1;
                if entry.file_type().is_dir() {
                    entries.skip_current_dir();
                }
                continue;
            }

            if entry.file_type().is_dir() {
                snapshot.ensure_dir(relative);
                stats.total_dirs += 1;
            } else {
                let parent = relative.parent().unwrap_or_else(|| Path::new(""));
                snapshot
                    .ensure_dir(parent)
                    .push_file(entry.file_name().to_string_lossy().into_owned());
                files.push(entry.path().to_path_buf());
                stats.total_files += 1;
            }
        }

        snapshot.sort_files();
        stats.scan_duration_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            root = %root.display(),
            files = stats.total_files,
            dirs = stats.total_dirs,
            errors = stats.errors,
            duration_ms = stats.scan_duration_ms,
            "Scanned directory"
        );

        Ok(Scan {
            snapshot,
            inventory: FileInventory::new(root, files),
            stats,
        })
    }
}

/// Validate the analysis root and make it absolute
fn resolve_root(root: &Path) -> Result<PathBuf> {
    if !root.is_dir() {
        return Err(ReorgError::DirectoryNotFound(root.to_path_buf()));
    }
    root.canonicalize()
        .map_err(|_| ReorgError::DirectoryNotFound(root.to_path_buf()))
}
