//! Session progress events

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

/// Stage of a reorganization cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Analyze,
    Execute,
    Undo,
    Hooks,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ReorgEvent {
    PhaseStarted(Phase),
    ProgressUpdated { phase: Phase, percent: u8 },
    PhaseCompleted { phase: Phase, summary: String },
}

/// Optional event channel. Sends never fail the caller.
#[derive(Debug, Clone, Default)]
pub(crate) struct EventSink(Option<UnboundedSender<ReorgEvent>>);

impl EventSink {
    pub(crate) fn new(sender: UnboundedSender<ReorgEvent>) -> Self {
        Self(Some(sender))
    }

    pub(crate) fn emit(&self, event: ReorgEvent) {
        if let Some(sender) = &self.0 {
            // Receiver may be gone
            let _ = sender.send(event);
        }
    }

    pub(crate) fn started(&self, phase: Phase) {
        self.emit(ReorgEvent::PhaseStarted(phase));
    }

    pub(crate) fn progress(&self, phase: Phase, percent: u8) {
        self.emit(ReorgEvent::ProgressUpdated { phase, percent });
    }

    pub(crate) fn completed(&self, phase: Phase, summary: impl Into<String>) {
        self.emit(ReorgEvent::PhaseCompleted {
            phase,
            summary: summary.into(),
        });
    }
}

/// Whole-number percentage of `done` over `total`
pub(crate) fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done.min(total) * 100) / total) as u8
}
