//! Move planner
//!
//! Converts a proposal plus an inventory into concrete moves. Pure: the
//! filesystem is never touched.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::allowed::AllowedExtensions;
use crate::index::FileInventory;
use crate::proposal::{extension_of, ProposedStructure};

/// A single file relocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveOperation {
    pub source: PathBuf,
    pub destination: PathBuf,
}

impl MoveOperation {
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }

    /// Source and destination are the same path
    pub fn is_noop(&self) -> bool {
        self.source == self.destination
    }

    /// Same move in the other direction
    pub fn inverse(&self) -> Self {
        Self {
            source: self.destination.clone(),
            destination: self.source.clone(),
        }
    }

    /// Human-readable description of the move
    pub fn description(&self) -> String {
        format!("{} -> {}", self.source.display(), self.destination.display())
    }
}

/// Ordered moves, one per admitted file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovePlan {
    operations: Vec<MoveOperation>,
}

impl MovePlan {
    pub fn new(operations: Vec<MoveOperation>) -> Self {
        Self { operations }
    }

    pub fn operations(&self) -> &[MoveOperation] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MoveOperation> {
        self.operations.iter()
    }

    /// Operations that actually relocate something
    pub fn effective_moves(&self) -> usize {
        self.operations.iter().filter(|op| !op.is_noop()).count()
    }
}

impl From<Vec<MoveOperation>> for MovePlan {
    fn from(operations: Vec<MoveOperation>) -> Self {
        Self::new(operations)
    }
}

impl<'a> IntoIterator for &'a MovePlan {
    type Item = &'a MoveOperation;
    type IntoIter = std::slice::Iter<'a, MoveOperation>;

    fn into_iter(self) -> Self::IntoIter {
        self.operations.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanningFailureReason {
    /// Extension not in the allowed set
    InvalidFileType,
}

impl std::fmt::Display for PlanningFailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidFileType => write!(f, "invalid file type"),
        }
    }
}

/// A file excluded from the plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanningFailure {
    pub path: PathBuf,
    pub reason: PlanningFailureReason,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MovePlanner;

impl MovePlanner {
    pub fn new() -> Self {
        Self
    }

    /// Plan one move per inventory file admitted by `allowed`.
    ///
    /// Destinations follow `{containing dir}/{target folder}/{file name}`.
    /// Files without an extension, or whose target folder was removed from
    /// the proposal, keep their path and become no-op moves.
    pub fn plan(
        &self,
        inventory: &FileInventory,
        proposed: &ProposedStructure,
        allowed: &AllowedExtensions,
    ) -> (MovePlan, Vec<PlanningFailure>) {
        let mut operations = Vec::with_capacity(inventory.len());
        let mut failures = Vec::new();

        for path in inventory {
            if !allowed.permits(path) {
                failures.push(PlanningFailure {
                    path: path.clone(),
                    reason: PlanningFailureReason::InvalidFileType,
                });
                continue;
            }

            let destination = destination_for(path, proposed);
            operations.push(MoveOperation::new(path.clone(), destination));
        }

        tracing::debug!(
            operations = operations.len(),
            failures = failures.len(),
            "Planned moves"
        );

        (MovePlan::new(operations), failures)
    }
}

fn destination_for(path: &Path, proposed: &ProposedStructure) -> PathBuf {
    let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
        return path.to_path_buf();
    };

    match extension_of(path).and_then(|ext| proposed.folder_for_extension(&ext)) {
        Some(folder) => parent.join(folder).join(name),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::TreeSnapshot;
    use crate::proposal::{ProposalBuilder, StructureEdit};

    fn fixture() -> (FileInventory, ProposedStructure) {
        let relative = ["a.txt", "b.jpg", "c/d.txt", "notes", "e.exe"];
        let root = PathBuf::from("/data/root");
        let inventory = FileInventory::new(
            root.clone(),
            relative.iter().map(|p| root.join(p)).collect(),
        );
        let proposed =
            ProposalBuilder::new().propose(&TreeSnapshot::from_relative_paths(relative), "group by type");
        (inventory, proposed)
    }

    #[test]
    fn test_plan_by_extension() {
        let (inventory, proposed) = fixture();
        let allowed = AllowedExtensions::new([".txt", ".jpg"]);

        let (plan, failures) = MovePlanner::new().plan(&inventory, &proposed, &allowed);

        assert_eq!(
            plan.operations(),
            &[
                MoveOperation::new("/data/root/a.txt", "/data/root/TXT Files/a.txt"),
                MoveOperation::new("/data/root/b.jpg", "/data/root/JPG Files/b.jpg"),
                MoveOperation::new("/data/root/c/d.txt", "/data/root/c/TXT Files/d.txt"),
            ]
        );
        assert_eq!(
            failures,
            vec![
                PlanningFailure {
                    path: PathBuf::from("/data/root/e.exe"),
                    reason: PlanningFailureReason::InvalidFileType,
                },
                PlanningFailure {
                    path: PathBuf::from("/data/root/notes"),
                    reason: PlanningFailureReason::InvalidFileType,
                },
            ]
        );
    }

    #[test]
    fn test_empty_allowed_set_rejects_everything() {
        let (inventory, proposed) = fixture();
        let (plan, failures) =
            MovePlanner::new().plan(&inventory, &proposed, &AllowedExtensions::default());

        assert!(plan.is_empty());
        assert_eq!(failures.len(), inventory.len());
    }

    #[test]
    fn test_extensionless_file_is_noop() {
        let (inventory, proposed) = fixture();
        let allowed = AllowedExtensions::new([""]);

        let (plan, _) = MovePlanner::new().plan(&inventory, &proposed, &allowed);

        assert_eq!(plan.len(), 1);
        assert!(plan.operations()[0].is_noop());
        assert_eq!(plan.effective_moves(), 0);
    }

    #[test]
    fn test_plan_is_deterministic() {
        let (inventory, proposed) = fixture();
        let allowed = AllowedExtensions::new([".txt", ".jpg", ".exe"]);
        let planner = MovePlanner::new();

        assert_eq!(
            planner.plan(&inventory, &proposed, &allowed),
            planner.plan(&inventory, &proposed, &allowed)
        );
    }

    #[test]
    fn test_edits_redirect_plan() {
        let (inventory, mut proposed) = fixture();
        proposed
            .apply_edit(StructureEdit::RenameFolder {
                from: "JPG Files".to_string(),
                to: "Photos".to_string(),
            })
            .unwrap();
        proposed
            .apply_edit(StructureEdit::RemoveFolder {
                name: "TXT Files".to_string(),
            })
            .unwrap();

        let allowed = AllowedExtensions::new([".txt", ".jpg"]);
        let (plan, _) = MovePlanner::new().plan(&inventory, &proposed, &allowed);

        assert_eq!(
            plan.operations(),
            &[
                MoveOperation::new("/data/root/a.txt", "/data/root/a.txt"),
                MoveOperation::new("/data/root/b.jpg", "/data/root/Photos/b.jpg"),
                MoveOperation::new("/data/root/c/d.txt", "/data/root/c/d.txt"),
            ]
        );
    }

    #[test]
    fn test_operation_helpers() {
        let op = MoveOperation::new("/a/x.txt", "/a/TXT Files/x.txt");
        assert_eq!(op.inverse().source, PathBuf::from("/a/TXT Files/x.txt"));
        assert_eq!(op.description(), "/a/x.txt -> /a/TXT Files/x.txt");
        assert!(!op.is_noop());
    }
}
