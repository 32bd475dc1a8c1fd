//! Filesystem primitives used by the executor

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Policy for handling destination conflicts during execution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Leave both files alone and record a failure
    #[default]
    Fail,
    /// Generate unique name (_1, _2, etc.) and proceed
    AutoRename,
}

/// Why a single move failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum MoveErrorKind {
    SourceMissing,
    DestinationExists,
    PermissionDenied,
    CrossDevice,
    Io(String),
}

impl std::fmt::Display for MoveErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SourceMissing => write!(f, "source file does not exist"),
            Self::DestinationExists => write!(f, "destination already exists"),
            Self::PermissionDenied => write!(f, "permission denied"),
            Self::CrossDevice => write!(f, "source and destination are on different devices"),
            Self::Io(message) => write!(f, "{}", message),
        }
    }
}

impl From<io::Error> for MoveErrorKind {
    fn from(err: io::Error) -> Self {
        if is_cross_device(&err) {
            return Self::CrossDevice;
        }
        match err.kind() {
            io::ErrorKind::NotFound => Self::SourceMissing,
            io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            io::ErrorKind::AlreadyExists => Self::DestinationExists,
            _ => Self::Io(err.to_string()),
        }
    }
}

#[cfg(unix)]
fn is_cross_device(err: &io::Error) -> bool {
    // EXDEV
    err.raw_os_error() == Some(18)
}

#[cfg(windows)]
fn is_cross_device(err: &io::Error) -> bool {
    // ERROR_NOT_SAME_DEVICE
    err.raw_os_error() == Some(17)
}

#[cfg(not(any(unix, windows)))]
fn is_cross_device(_err: &io::Error) -> bool {
    false
}

/// Attempts at a fresh `AutoRename` name when another writer takes it first
const RENAME_ATTEMPTS: usize = 3;

/// Move `source` to `destination` without ever replacing a file.
///
/// Parent directories of the destination are created. An existing
/// destination is never overwritten; with `AutoRename` a free sibling name is
/// used instead. Returns the path the file actually landed at.
pub(crate) fn move_file(
    source: &Path,
    destination: &Path,
    policy: ConflictPolicy,
) -> Result<PathBuf, MoveErrorKind> {
    if fs::symlink_metadata(source).is_err() {
        return Err(MoveErrorKind::SourceMissing);
    }

    let mut target = if fs::symlink_metadata(destination).is_ok() {
        match policy {
            ConflictPolicy::Fail => return Err(MoveErrorKind::DestinationExists),
            ConflictPolicy::AutoRename => generate_unique_path(destination),
        }
    } else {
        destination.to_path_buf()
    };

    if let Some(parent) = target.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut attempts = 0;
    loop {
        match place_exclusive(source, &target) {
            Ok(()) => return Ok(target),
            Err(e)
                if e.kind() == io::ErrorKind::AlreadyExists
                    && policy == ConflictPolicy::AutoRename
                    && attempts < RENAME_ATTEMPTS =>
            {
                attempts += 1;
                target = generate_unique_path(destination);
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Link `source` at `target`, then unlink the source.
///
/// Linking fails with `AlreadyExists` if `target` appeared after the
/// destination check, where a rename would silently replace it. Filesystems
/// without hard links fall back to a rename.
fn place_exclusive(source: &Path, target: &Path) -> io::Result<()> {
    match fs::hard_link(source, target) {
        Ok(()) => {
            if let Err(e) = fs::remove_file(source) {
                let _ = fs::remove_file(target);
                return Err(e);
            }
            Ok(())
        }
        Err(e)
            if matches!(
                e.kind(),
                io::ErrorKind::AlreadyExists | io::ErrorKind::NotFound
            ) || is_cross_device(&e) =>
        {
            Err(e)
        }
        Err(e) => {
            tracing::debug!(
                source = %source.display(),
                error = %e,
                "Hard link unavailable, renaming"
            );
            fs::rename(source, target)
        }
    }
}

/// First free `{stem}_{n}{ext}` next to `original`
pub(crate) fn generate_unique_path(original: &Path) -> PathBuf {
    let parent = original.parent().unwrap_or(Path::new("."));
    let stem = original
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "file".to_string());
    let ext = original
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut counter = 1;
    loop {
        let candidate = parent.join(format!("{}_{}{}", stem, counter, ext));
        if fs::symlink_metadata(&candidate).is_err() {
            return candidate;
        }
        counter += 1;
        if counter > 1000 {
            return parent.join(format!("{}_{}{}", stem, uuid::Uuid::new_v4(), ext));
        }
    }
}
