//! Where finished sync runs are reported.

use tracing::{info, warn};

use crate::sync::SyncReport;

/// Receives the report of every completed drain, for user-facing
/// notification. Called once per run, after the queue bookkeeping is done.
pub trait NotificationSink: Send + Sync {
    fn sync_finished(&self, report: &SyncReport);
}

/// Reports to the tracing log. The default sink.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn sync_finished(&self, report: &SyncReport) {
        info!(
            committed = report.committed.len(),
            failed = report.failed.len(),
            "sync finished: {}",
            report.summary()
        );
        for failure in &report.failed {
            warn!(id = %failure.id, kind = %failure.kind, reason = %failure.reason, "service record not committed");
        }
    }
}
