//! Proposal builder
//!
//! Derives a `ProposedStructure` from a snapshot. Pure: no I/O.

use std::collections::{BTreeMap, BTreeSet};

use super::policy::{extension_of, ExtensionGrouping, GroupingPolicy};
use super::structure::{ProposedFolder, ProposedStructure, Target};
use crate::index::TreeSnapshot;

/// Builds proposals with a pluggable grouping policy
pub struct ProposalBuilder {
    policy: Box<dyn GroupingPolicy>,
}

impl Default for ProposalBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProposalBuilder {
    /// Builder using `ExtensionGrouping`
    pub fn new() -> Self {
        Self {
            policy: Box::new(ExtensionGrouping),
        }
    }

    /// Replace the grouping policy
    pub fn with_policy(mut self, policy: Box<dyn GroupingPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Propose a target layout for `snapshot`.
    ///
    /// Every existing folder is kept. One top-level folder is added per
    /// distinct extension found anywhere in the tree, unless a top-level
    /// folder of that name already exists, in which case it is reused.
    /// The annotation is stored verbatim and does not change the layout.
    pub fn propose(&self, snapshot: &TreeSnapshot, annotation: &str) -> ProposedStructure {
        let mut extensions = BTreeSet::new();
        snapshot.walk_file_names(&mut |name| {
            if let Some(ext) = extension_of(name) {
                extensions.insert(ext);
            }
        });

        let mut root = ProposedFolder::from_snapshot(snapshot);
        let mut targets = BTreeMap::new();

        for ext in extensions {
            match self.policy.folder_for_extension(&ext) {
                Some(folder) => {
                    root.children
                        .entry(folder.clone())
                        .or_insert_with(ProposedFolder::synthesized);
                    targets.insert(ext, Target::Folder(folder));
                }
                None => {
                    targets.insert(ext, Target::Stay);
                }
            }
        }

        tracing::debug!(
            extensions = targets.len(),
            folders = root.children.len(),
            "Built proposal"
        );

        ProposedStructure::new(root, annotation.to_string(), targets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReorgError;
    use crate::proposal::{FolderOrigin, StructureEdit};

    fn sample() -> TreeSnapshot {
        TreeSnapshot::from_relative_paths(["a.txt", "b.jpg", "c/d.TXT", "c/README", ".bashrc"])
    }

    #[test]
    fn test_propose_synthesizes_one_folder_per_extension() {
        let proposed = ProposalBuilder::new().propose(&sample(), "group by type");

        assert_eq!(proposed.synthesized_folders(), vec!["JPG Files", "TXT Files"]);
        assert_eq!(proposed.annotation(), "group by type");
        assert_eq!(proposed.root().children["c"].origin, FolderOrigin::Existing);
        assert!(proposed.root().children["TXT Files"].files.is_empty());
        // Files are left where they were in the structure
        assert_eq!(
            proposed.root().files,
            vec![".bashrc".to_string(), "a.txt".to_string(), "b.jpg".to_string()]
        );
    }

    #[test]
    fn test_empty_snapshot_gives_empty_structure() {
        let proposed = ProposalBuilder::new().propose(&TreeSnapshot::new(), "");
        assert!(proposed.synthesized_folders().is_empty());
        assert!(proposed.root().children.is_empty());
        assert!(proposed.targets().is_empty());
    }

    #[test]
    fn test_existing_folder_reused_as_target() {
        let snapshot = TreeSnapshot::from_relative_paths(["TXT Files/old.txt", "new.txt"]);
        let proposed = ProposalBuilder::new().propose(&snapshot, "");

        assert!(proposed.synthesized_folders().is_empty());
        let folder = &proposed.root().children["TXT Files"];
        assert_eq!(folder.origin, FolderOrigin::Existing);
        assert_eq!(folder.files, vec!["old.txt".to_string()]);
        assert_eq!(proposed.folder_for_extension("txt"), Some("TXT Files".to_string()));
    }

    #[test]
    fn test_propose_is_idempotent() {
        let builder = ProposalBuilder::new();
        let first = builder.propose(&sample(), "x");
        let second = builder.propose(&first.to_snapshot(), "x");

        assert_eq!(
            first.root().children.keys().collect::<Vec<_>>(),
            second.root().children.keys().collect::<Vec<_>>()
        );
        assert_eq!(first.to_snapshot(), second.to_snapshot());
    }

    #[test]
    fn test_custom_policy() {
        struct ImagesOnly;
        impl GroupingPolicy for ImagesOnly {
            fn folder_for_extension(&self, extension: &str) -> Option<String> {
                matches!(extension, "jpg" | "png").then(|| "Images".to_string())
            }
        }

        let proposed = ProposalBuilder::new()
            .with_policy(Box::new(ImagesOnly))
            .propose(&sample(), "");

        assert_eq!(proposed.synthesized_folders(), vec!["Images"]);
        assert_eq!(proposed.folder_for_extension("jpg"), Some("Images".to_string()));
        assert_eq!(proposed.folder_for_extension("txt"), None);
    }

    #[test]
    fn test_rename_edit_redirects_target() {
        let mut proposed = ProposalBuilder::new().propose(&sample(), "");
        proposed
            .apply_edit(StructureEdit::RenameFolder {
                from: "JPG Files".to_string(),
                to: "Photos".to_string(),
            })
            .unwrap();

        assert_eq!(proposed.folder_for_extension("jpg"), Some("Photos".to_string()));
        assert_eq!(proposed.root().children["Photos"].origin, FolderOrigin::Renamed);
        assert!(!proposed.root().children.contains_key("JPG Files"));
        assert_eq!(proposed.edits().len(), 1);
    }

    #[test]
    fn test_remove_edit_keeps_files_in_place() {
        let mut proposed = ProposalBuilder::new().propose(&sample(), "");
        proposed
            .apply_edit(StructureEdit::RemoveFolder {
                name: "TXT Files".to_string(),
            })
            .unwrap();

        assert_eq!(proposed.folder_for_extension("txt"), None);
        assert_eq!(proposed.synthesized_folders(), vec!["JPG Files"]);
    }

    #[test]
    fn test_edits_rejected() {
        let mut proposed = ProposalBuilder::new().propose(&sample(), "");

        let existing = proposed.apply_edit(StructureEdit::RemoveFolder {
            name: "c".to_string(),
        });
        assert!(matches!(existing, Err(ReorgError::EditRejected(_))));

        let unknown = proposed.apply_edit(StructureEdit::RemoveFolder {
            name: "PDF Files".to_string(),
        });
        assert!(matches!(unknown, Err(ReorgError::EditRejected(_))));

        let clash = proposed.apply_edit(StructureEdit::RenameFolder {
            from: "TXT Files".to_string(),
            to: "c".to_string(),
        });
        assert!(matches!(clash, Err(ReorgError::EditRejected(_))));

        let bad_name = proposed.apply_edit(StructureEdit::RenameFolder {
            from: "TXT Files".to_string(),
            to: "a/b".to_string(),
        });
        assert!(matches!(bad_name, Err(ReorgError::EditRejected(_))));

        assert!(proposed.edits().is_empty());
    }
}
