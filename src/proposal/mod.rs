//! Proposal generation
//!
//! Turns a `TreeSnapshot` plus a suggestion annotation into an editable
//! `ProposedStructure`.

mod builder;
mod policy;
mod structure;

pub use builder::ProposalBuilder;
pub use policy::{default_folder_name, extension_of, ExtensionGrouping, GroupingPolicy};
pub use structure::{FolderOrigin, ProposedFolder, ProposedStructure, StructureEdit, Target};
