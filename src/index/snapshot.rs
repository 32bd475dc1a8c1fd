//! Snapshot types
//!
//! `TreeSnapshot` is the read-only structural view of an analysis root and
//! `FileInventory` the flat list of absolute file paths under it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

/// A directory node relative to the analysis root.
///
/// Folder names are unique within a node (map keys) and kept in name order,
/// so two snapshots of the same tree compare equal regardless of the order
/// the filesystem returned entries in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeSnapshot {
    children: BTreeMap<String, TreeSnapshot>,
    files: Vec<String>,
}

impl TreeSnapshot {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from paths relative to the root.
    ///
    /// Every path is treated as a file; its parent components become folders.
    pub fn from_relative_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut snapshot = Self::new();
        for path in paths {
            let path = path.as_ref();
            let Some(name) = path.file_name() else {
                continue;
            };
            let parent = path.parent().unwrap_or_else(|| Path::new(""));
            snapshot
                .ensure_dir(parent)
                .push_file(name.to_string_lossy().into_owned());
        }
        snapshot.sort_files();
        snapshot
    }

    /// Subfolders of this node, keyed by folder name
    pub fn children(&self) -> &BTreeMap<String, TreeSnapshot> {
        &self.children
    }

    /// Immediate file names of this node
    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// True when the node has neither files nor folders
    pub fn is_empty(&self) -> bool {
        self.children.is_empty() && self.files.is_empty()
    }

    /// Look up the node at a relative path (empty path is this node)
    pub fn node(&self, relative: &Path) -> Option<&TreeSnapshot> {
        let mut current = self;
        for name in normal_components(relative) {
            current = current.children.get(&name)?;
        }
        Some(current)
    }

    /// Total number of files in this node and all descendants
    pub fn file_count(&self) -> usize {
        self.files.len()
            + self
                .children
                .values()
                .map(TreeSnapshot::file_count)
                .sum::<usize>()
    }

    /// Every file under this node as a path relative to it, sorted
    pub fn relative_files(&self) -> Vec<PathBuf> {
        let mut out = Vec::with_capacity(self.file_count());
        self.collect_files(PathBuf::new(), &mut out);
        out.sort();
        out
    }

    /// Visit every file name under this node, depth first
    pub fn walk_file_names<'a>(&'a self, visit: &mut dyn FnMut(&'a str)) {
        for file in &self.files {
            visit(file);
        }
        for child in self.children.values() {
            child.walk_file_names(visit);
        }
    }

    fn collect_files(&self, prefix: PathBuf, out: &mut Vec<PathBuf>) {
        for file in &self.files {
            out.push(prefix.join(file));
        }
        for (name, child) in &self.children {
            child.collect_files(prefix.join(name), out);
        }
    }

    /// Get or create the node at a relative path
    pub(crate) fn ensure_dir(&mut self, relative: &Path) -> &mut TreeSnapshot {
        let mut current = self;
        for name in normal_components(relative) {
            current = current.children.entry(name).or_default();
        }
        current
    }

    pub(crate) fn push_file(&mut self, name: String) {
        self.files.push(name);
    }

    pub(crate) fn sort_files(&mut self) {
        self.files.sort();
        for child in self.children.values_mut() {
            child.sort_files();
        }
    }
}

fn normal_components(path: &Path) -> impl Iterator<Item = String> + '_ {
    path.components().filter_map(|c| match c {
        Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
        _ => None,
    })
}

/// Absolute paths of every file under an analysis root, sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInventory {
    root: PathBuf,
    files: Vec<PathBuf>,
}

impl FileInventory {
    /// Create an inventory; paths are sorted so the result is deterministic
    pub fn new(root: PathBuf, mut files: Vec<PathBuf>) -> Self {
        files.sort();
        Self { root, files }
    }

    /// The analysis root the inventory was taken from
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PathBuf> {
        self.files.iter()
    }

    /// Paths rendered as strings, the shape suggestion providers consume
    pub fn to_strings(&self) -> Vec<String> {
        self.files
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect()
    }
}

impl<'a> IntoIterator for &'a FileInventory {
    type Item = &'a PathBuf;
    type IntoIter = std::slice::Iter<'a, PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}
