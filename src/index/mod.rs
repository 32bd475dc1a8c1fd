//! Path index
//!
//! Point-in-time reads of an analysis root: a nested `TreeSnapshot` and a
//! flat, sorted `FileInventory`, both produced by `PathIndex`.

mod scanner;
mod snapshot;

pub use scanner::{PathIndex, Scan, ScanStats};
pub use snapshot::{FileInventory, TreeSnapshot};
