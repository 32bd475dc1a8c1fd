//! Proposed structure
//!
//! The editable target layout. Kept separate from `TreeSnapshot` so a
//! proposal can be edited by a reviewer without touching the snapshot it was
//! derived from.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::policy::default_folder_name;
use crate::error::{ReorgError, Result};
use crate::index::TreeSnapshot;

/// Where a folder in the proposal came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FolderOrigin {
    /// Present in the snapshot
    Existing,
    /// Added by the grouping policy
    Synthesized,
    /// Synthesized, then renamed by a reviewer
    Renamed,
}

/// Where files of one extension should go
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "folder", rename_all = "snake_case")]
pub enum Target {
    /// Move into this folder inside the file's containing directory
    Folder(String),
    /// Leave the file where it is
    Stay,
}

/// A reviewer edit applied on top of the generated proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StructureEdit {
    RenameFolder { from: String, to: String },
    RemoveFolder { name: String },
}

/// A folder node in the proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedFolder {
    pub origin: FolderOrigin,
    pub children: BTreeMap<String, ProposedFolder>,
    pub files: Vec<String>,
}

impl ProposedFolder {
    pub(crate) fn synthesized() -> Self {
        Self {
            origin: FolderOrigin::Synthesized,
            children: BTreeMap::new(),
            files: Vec::new(),
        }
    }

    pub(crate) fn from_snapshot(snapshot: &TreeSnapshot) -> Self {
        Self {
            origin: FolderOrigin::Existing,
            children: snapshot
                .children()
                .iter()
                .map(|(name, child)| (name.clone(), Self::from_snapshot(child)))
                .collect(),
            files: snapshot.files().to_vec(),
        }
    }

    fn is_generated(&self) -> bool {
        matches!(self.origin, FolderOrigin::Synthesized | FolderOrigin::Renamed)
    }

    fn collect_paths(&self, prefix: &Path, dirs: &mut Vec<PathBuf>, files: &mut Vec<PathBuf>) {
        for file in &self.files {
            files.push(prefix.join(file));
        }
        for (name, child) in &self.children {
            let path = prefix.join(name);
            dirs.push(path.clone());
            child.collect_paths(&path, dirs, files);
        }
    }
}

/// Target layout for one analysis root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposedStructure {
    root: ProposedFolder,
    annotation: String,
    targets: BTreeMap<String, Target>,
    edits: Vec<StructureEdit>,
}

impl ProposedStructure {
    pub(crate) fn new(
        root: ProposedFolder,
        annotation: String,
        targets: BTreeMap<String, Target>,
    ) -> Self {
        Self {
            root,
            annotation,
            targets,
            edits: Vec::new(),
        }
    }

    /// Root folder of the proposal
    pub fn root(&self) -> &ProposedFolder {
        &self.root
    }

    /// Provider text the proposal was built with
    pub fn annotation(&self) -> &str {
        &self.annotation
    }

    /// Extension to target mapping decided at proposal time
    pub fn targets(&self) -> &BTreeMap<String, Target> {
        &self.targets
    }

    /// Reviewer edits applied so far, in order
    pub fn edits(&self) -> &[StructureEdit] {
        &self.edits
    }

    /// Names of the top-level folders the policy added (or their renames)
    pub fn synthesized_folders(&self) -> Vec<&str> {
        self.root
            .children
            .iter()
            .filter(|(_, folder)| folder.is_generated())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Folder that files with `extension` should move into, if any.
    ///
    /// Extensions unseen at proposal time fall back to `"{EXT} Files"`.
    pub fn folder_for_extension(&self, extension: &str) -> Option<String> {
        match self.targets.get(extension) {
            Some(Target::Folder(name)) => Some(name.clone()),
            Some(Target::Stay) => None,
            None => Some(default_folder_name(extension)),
        }
    }

    /// Apply a reviewer edit. Only generated top-level folders may be edited.
    pub fn apply_edit(&mut self, edit: StructureEdit) -> Result<()> {
        match &edit {
            StructureEdit::RenameFolder { from, to } => {
                validate_folder_name(to)?;
                self.require_generated(from)?;
                if self.root.children.contains_key(to) {
                    return Err(ReorgError::EditRejected(format!(
                        "a folder named '{}' already exists",
                        to
                    )));
                }
                if let Some(mut folder) = self.root.children.remove(from) {
                    folder.origin = FolderOrigin::Renamed;
                    self.root.children.insert(to.clone(), folder);
                }
                for target in self.targets.values_mut() {
                    if matches!(target, Target::Folder(name) if name == from) {
                        *target = Target::Folder(to.clone());
                    }
                }
            }
            StructureEdit::RemoveFolder { name } => {
                self.require_generated(name)?;
                self.root.children.remove(name);
                for target in self.targets.values_mut() {
                    if matches!(target, Target::Folder(folder) if folder == name) {
                        *target = Target::Stay;
                    }
                }
            }
        }

        tracing::debug!(edit = ?edit, "Applied structure edit");
        self.edits.push(edit);
        Ok(())
    }

    fn require_generated(&self, name: &str) -> Result<()> {
        match self.root.children.get(name) {
            Some(folder) if folder.is_generated() => Ok(()),
            Some(_) => Err(ReorgError::EditRejected(format!(
                "'{}' is an existing folder and cannot be edited",
                name
            ))),
            None => Err(ReorgError::EditRejected(format!(
                "no proposed folder named '{}'",
                name
            ))),
        }
    }

    /// Re-read the proposal as a snapshot, as if it had been laid out on disk
    pub fn to_snapshot(&self) -> TreeSnapshot {
        let mut dirs = Vec::new();
        let mut files = Vec::new();
        self.root.collect_paths(Path::new(""), &mut dirs, &mut files);

        let mut snapshot = TreeSnapshot::from_relative_paths(&files);
        for dir in &dirs {
            snapshot.ensure_dir(dir);
        }
        snapshot
    }
}

fn validate_folder_name(name: &str) -> Result<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed == "." || trimmed == ".." || name.contains(['/', '\\']) {
        return Err(ReorgError::EditRejected(format!(
            "'{}' is not a valid folder name",
            name
        )));
    }
    Ok(())
}
