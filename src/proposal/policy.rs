//! Grouping policies
//!
//! A policy decides which target folder files of a given extension belong
//! in. The planner and the builder share it so proposals and plans agree.

use std::path::Path;

/// Maps a normalized extension (lowercase, no dot) to a target folder name.
///
/// Returning `None` leaves files of that extension where they are.
pub trait GroupingPolicy: Send + Sync {
    fn folder_for_extension(&self, extension: &str) -> Option<String>;
}

/// Baseline policy: one `"{EXT} Files"` folder per extension
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtensionGrouping;

impl GroupingPolicy for ExtensionGrouping {
    fn folder_for_extension(&self, extension: &str) -> Option<String> {
        Some(default_folder_name(extension))
    }
}

/// `"{EXT_UPPER} Files"`
pub fn default_folder_name(extension: &str) -> String {
    format!("{} Files", extension.to_uppercase())
}

/// Lowercased extension of a file name without the dot.
///
/// Dot-files (`.bashrc`) and trailing dots (`notes.`) have no extension.
pub fn extension_of(file_name: impl AsRef<Path>) -> Option<String> {
    let ext = file_name.as_ref().extension()?.to_string_lossy().to_lowercase();
    if ext.is_empty() {
        None
    } else {
        Some(ext)
    }
}
