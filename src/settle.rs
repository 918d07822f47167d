// Settlement hook fired when a draft completes.
//
// Fire-and-forget: the orchestrator spawns the notification and never waits
// on it, so a failing settlement collaborator cannot roll back or stall a
// completed draft.

use std::sync::Mutex;

use async_trait::async_trait;
use tracing::info;

use crate::draft::seat::Roster;

/// Completion payload delivered once per human entry.
#[derive(Debug, Clone)]
pub struct CompletionNotice {
    pub entry_id: String,
    pub roster: Roster,
    pub total_spent: u32,
    pub duration_ms: u64,
}

#[async_trait]
pub trait Settlement: Send + Sync + 'static {
    async fn draft_completed(&self, notice: CompletionNotice);
}

/// Default collaborator: logs the completion for downstream reconciliation.
#[derive(Default)]
pub struct LoggingSettlement;

#[async_trait]
impl Settlement for LoggingSettlement {
    async fn draft_completed(&self, notice: CompletionNotice) {
        info!(
            entry_id = %notice.entry_id,
            total_spent = notice.total_spent,
            duration_ms = notice.duration_ms,
            filled = notice.roster.filled_count(),
            "draft completed"
        );
    }
}

/// Test double that records every notice it receives.
#[derive(Default)]
pub struct RecordingSettlement {
    notices: Mutex<Vec<CompletionNotice>>,
}

impl RecordingSettlement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<CompletionNotice> {
        self.notices.lock().expect("notices mutex poisoned").clone()
    }
}

#[async_trait]
impl Settlement for RecordingSettlement {
    async fn draft_completed(&self, notice: CompletionNotice) {
        self.notices
            .lock()
            .expect("notices mutex poisoned")
            .push(notice);
    }
}
