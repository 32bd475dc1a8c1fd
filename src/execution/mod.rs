//! Execution
//!
//! Applies move plans to disk with per-item failure isolation and keeps the
//! single-level undo log.

mod executor;
mod fs_ops;
mod undo_log;

pub use executor::{ExecutionReport, FailedMove, ProgressCallback, ReorganizationExecutor};
pub use fs_ops::{ConflictPolicy, MoveErrorKind};
pub use undo_log::{UndoLog, UndoRecord, UndoStore};
