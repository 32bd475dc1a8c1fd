//! Reorganization executor
//!
//! Applies a move plan to disk one operation at a time and owns the undo log
//! of the last run. A failed move is recorded and the run continues.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::fs_ops::{move_file, ConflictPolicy, MoveErrorKind};
use super::undo_log::{UndoLog, UndoStore};
use crate::error::{ReorgError, Result};
use crate::planning::{MoveOperation, MovePlan};

/// Progress callback, called with (done, total) after each operation
pub type ProgressCallback = Box<dyn Fn(usize, usize) + Send + Sync>;

/// An operation that could not be applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedMove {
    pub operation: MoveOperation,
    pub kind: MoveErrorKind,
}

/// Result of an execute or undo run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Moves applied, with the destination actually used
    pub succeeded: Vec<MoveOperation>,
    pub failed: Vec<FailedMove>,
    /// Operations whose source already equals the destination
    pub skipped: Vec<MoveOperation>,
}

impl ExecutionReport {
    fn start(run_id: Uuid, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id,
            started_at,
            finished_at: started_at,
            succeeded: Vec::new(),
            failed: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// Whether every attempted move succeeded
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Executes move plans and reverses the most recent one
#[derive(Default)]
pub struct ReorganizationExecutor {
    log: UndoLog,
    store: Option<UndoStore>,
    conflict_policy: ConflictPolicy,
}

impl ReorganizationExecutor {
    /// Executor with an in-memory undo log only
    pub fn new() -> Self {
        Self::default()
    }

    /// Executor backed by a persisted undo log, loaded now.
    ///
    /// A store that cannot be read leaves the log empty.
    pub fn with_store(store: UndoStore) -> Self {
        let log = match store.load() {
            Ok(Some(record)) => {
                tracing::info!(
                    run_id = %record.run_id,
                    moves = record.moves.len(),
                    "Loaded persisted undo log"
                );
                UndoLog::from_record(record)
            }
            Ok(None) => UndoLog::new(),
            Err(e) => {
                tracing::warn!(path = %store.path().display(), error = %e, "Failed to load undo log");
                UndoLog::new()
            }
        };

        Self {
            log,
            store: Some(store),
            conflict_policy: ConflictPolicy::default(),
        }
    }

    /// Set how an existing destination is handled during `execute`
    pub fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.conflict_policy = policy;
        self
    }

    pub fn undo_log(&self) -> &UndoLog {
        &self.log
    }

    pub fn can_undo(&self) -> bool {
        !self.log.is_empty()
    }

    /// Apply `plan` in order
    pub fn execute(&mut self, plan: &MovePlan) -> Result<ExecutionReport> {
        self.execute_with_progress(plan, None)
    }

    /// Apply `plan` in order, reporting progress after each operation.
    ///
    /// The undo log is reset before the first move and afterwards holds
    /// exactly the moves that succeeded. With a store, the log is written
    /// after every successful move so an interrupted run can still be
    /// undone by a later process.
    pub fn execute_with_progress(
        &mut self,
        plan: &MovePlan,
        progress: Option<&ProgressCallback>,
    ) -> Result<ExecutionReport> {
        validate_plan(plan)?;

        let mut report = ExecutionReport::start(Uuid::new_v4(), Utc::now());
        self.log.begin(report.run_id, report.started_at);
        self.persist();

        let total = plan.len();
        for (index, operation) in plan.iter().enumerate() {
            if operation.is_noop() {
                report.skipped.push(operation.clone());
            } else {
                match move_file(&operation.source, &operation.destination, self.conflict_policy) {
                    Ok(landed) => {
                        let applied = MoveOperation::new(operation.source.clone(), landed);
                        tracing::debug!(operation = %applied.description(), "Moved file");
                        self.log.record(applied.clone());
                        self.persist();
                        report.succeeded.push(applied);
                    }
                    Err(kind) => {
                        tracing::debug!(
                            operation = %operation.description(),
                            error = %kind,
                            "Move failed"
                        );
                        report.failed.push(FailedMove {
                            operation: operation.clone(),
                            kind,
                        });
                    }
                }
            }

            if let Some(callback) = progress {
                callback(index + 1, total);
            }
        }

        self.persist();
        report.finished_at = Utc::now();

        tracing::info!(
            run_id = %report.run_id,
            moved = report.succeeded.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            "Reorganization finished"
        );

        Ok(report)
    }

    /// Reverse the last run, most recent move first.
    ///
    /// The log is cleared afterwards even if some moves could not be
    /// reversed, so a second call fails with `NothingToUndo`.
    pub fn undo(&mut self) -> Result<ExecutionReport> {
        if self.log.is_empty() {
            return Err(ReorgError::NothingToUndo);
        }

        let mut report = ExecutionReport::start(Uuid::new_v4(), Utc::now());

        for applied in self.log.moves().iter().rev() {
            let reverse = applied.inverse();
            match move_file(&reverse.source, &reverse.destination, ConflictPolicy::Fail) {
                Ok(_) => {
                    tracing::debug!(operation = %reverse.description(), "Restored file");
                    report.succeeded.push(reverse);
                }
                Err(kind) => {
                    tracing::warn!(
                        operation = %reverse.description(),
                        error = %kind,
                        "Failed to restore file"
                    );
                    report.failed.push(FailedMove {
                        operation: reverse,
                        kind,
                    });
                }
            }
        }

        self.log.clear();
        self.persist();
        report.finished_at = Utc::now();

        tracing::info!(
            restored = report.succeeded.len(),
            failed = report.failed.len(),
            "Undo finished"
        );

        Ok(report)
    }

    /// Mirror the log into the store. Failures never fail the run.
    fn persist(&self) {
        let Some(store) = &self.store else {
            return;
        };

        let result = match self.log.to_record() {
            Some(record) => store.save(&record),
            None => store.clear(),
        };

        if let Err(e) = result {
            tracing::warn!(path = %store.path().display(), error = %e, "Failed to persist undo log");
        }
    }
}

fn validate_plan(plan: &MovePlan) -> Result<()> {
    for (index, operation) in plan.iter().enumerate() {
        if !operation.source.is_absolute() || !operation.destination.is_absolute() {
            return Err(ReorgError::InvalidPlan(format!(
                "operation {} is not absolute: {}",
                index,
                operation.description()
            )));
        }
    }
    Ok(())
}
