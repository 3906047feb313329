//! Draining the offline queue into the remote service-record store.
//!
//! A run takes a snapshot of the queued ids and upserts them one at a time.
//! Confirmed commits are removed from the queue; anything else stays queued
//! with its failure recorded, and the run moves on to the next record.
//! Failed records are retried by the next run, never within the same one.

mod connectivity;
mod notify;

pub use connectivity::spawn_reconnect_sync;
pub use notify::{LogSink, NotificationSink};

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::{PoolDayError, PoolDayResult};
use crate::queue::{FailureKind, OfflineQueue, QueuedServiceRecord};
use crate::remote::ServiceRecordStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Idle,
    Draining,
    /// The last run left at least one record in the queue
    PartiallyFailed,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncState::Idle => write!(f, "idle"),
            SyncState::Draining => write!(f, "draining"),
            SyncState::PartiallyFailed => write!(f, "partially failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedRecord {
    pub id: String,
    pub kind: FailureKind,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Ids committed and removed from the queue, in queue order
    pub committed: Vec<String>,
    /// Ids left in the queue, in queue order
    pub failed: Vec<FailedRecord>,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn rejected(&self) -> impl Iterator<Item = &FailedRecord> {
        self.failed
            .iter()
            .filter(|f| f.kind == FailureKind::Rejected)
    }

    /// One line for a notification, e.g. "2 committed, 1 failed".
    pub fn summary(&self) -> String {
        if self.committed.is_empty() && self.failed.is_empty() {
            return "nothing to sync".to_string();
        }
        let mut summary = format!("{} committed", self.committed.len());
        if !self.failed.is_empty() {
            summary.push_str(&format!(", {} failed", self.failed.len()));
            let rejected = self.rejected().count();
            if rejected > 0 {
                summary.push_str(&format!(" ({} rejected)", rejected));
            }
        }
        summary
    }
}

/// Outcome of a sync trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncRun {
    Drained(SyncReport),
    /// Another run was already draining; this trigger was a no-op
    Coalesced,
}

pub struct SyncCoordinator<S> {
    queue: Arc<OfflineQueue>,
    store: Arc<S>,
    sink: Arc<dyn NotificationSink>,
    upsert_timeout: Duration,
    state: Mutex<SyncState>,
}

impl<S: ServiceRecordStore> SyncCoordinator<S> {
    /// `upsert_timeout` bounds each remote upsert; a timeout fails that
    /// record only.
    pub fn new(queue: Arc<OfflineQueue>, store: Arc<S>, upsert_timeout: Duration) -> Self {
        SyncCoordinator {
            queue,
            store,
            sink: Arc::new(LogSink),
            upsert_timeout,
            state: Mutex::new(SyncState::Idle),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn queue(&self) -> &OfflineQueue {
        &self.queue
    }

    pub fn state(&self) -> SyncState {
        *self.lock_state()
    }

    /// Drain the queue once.
    ///
    /// Returns `Coalesced` without touching the queue if a run is already in
    /// progress. Per-record failures are in the report; `Err` means the run
    /// could not start (the queue could not be read).
    pub async fn sync(&self) -> PoolDayResult<SyncRun> {
        let Some(guard) = self.begin() else {
            debug!("sync already draining, coalescing trigger");
            return Ok(SyncRun::Coalesced);
        };

        let started_at = Utc::now();
        let snapshot = self.queue.list()?;
        debug!(records = snapshot.len(), "draining offline queue");

        let mut committed = Vec::new();
        let mut failed = Vec::new();

        for record in snapshot {
            match self.deliver(&record).await {
                Ok(()) => committed.push(record.id),
                Err(failure) => failed.push(failure),
            }
        }

        let report = SyncReport {
            started_at,
            finished_at: Utc::now(),
            committed,
            failed,
        };

        guard.finish(if report.is_clean() {
            SyncState::Idle
        } else {
            SyncState::PartiallyFailed
        });

        info!(
            committed = report.committed.len(),
            failed = report.failed.len(),
            "offline queue drained"
        );
        self.sink.sync_finished(&report);

        Ok(SyncRun::Drained(report))
    }

    /// Upsert one record and settle its queue entry.
    async fn deliver(&self, record: &QueuedServiceRecord) -> Result<(), FailedRecord> {
        let attempt = timeout(
            self.upsert_timeout,
            self.store
                .upsert_service_record(&record.id, &record.payload),
        )
        .await;

        let failure = match attempt {
            Ok(Ok(receipt)) if receipt.committed => {
                // Committed remotely; a leftover entry is replayed next run and
                // the upsert absorbs it.
                if let Err(e) = self.queue.remove(&record.id) {
                    warn!(id = %record.id, error = %e, "committed record could not be removed from queue");
                }
                debug!(id = %record.id, "service record committed");
                return Ok(());
            }
            Ok(Ok(_)) => (
                FailureKind::Unavailable,
                "store did not confirm the commit".to_string(),
            ),
            Ok(Err(e @ PoolDayError::RemoteRejected(_))) => (FailureKind::Rejected, e.to_string()),
            Ok(Err(e)) => (FailureKind::Unavailable, e.to_string()),
            Err(_) => (
                FailureKind::Unavailable,
                PoolDayError::RemoteTimeout(self.upsert_timeout).to_string(),
            ),
        };

        let (kind, reason) = failure;
        warn!(id = %record.id, %kind, %reason, "service record upsert failed");
        if let Err(e) = self.queue.mark_failed(&record.id, kind, &reason) {
            warn!(id = %record.id, error = %e, "could not record upsert failure in queue");
        }

        Err(FailedRecord {
            id: record.id.clone(),
            kind,
            reason,
        })
    }

    /// Move to `Draining` unless a run already holds it.
    fn begin(&self) -> Option<DrainGuard<'_>> {
        let mut state = self.lock_state();
        if *state == SyncState::Draining {
            return None;
        }
        *state = SyncState::Draining;
        Some(DrainGuard {
            state: &self.state,
            finished: false,
        })
    }

    fn lock_state(&self) -> MutexGuard<'_, SyncState> {
        lock_state(&self.state)
    }
}

fn lock_state(state: &Mutex<SyncState>) -> MutexGuard<'_, SyncState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Holds `Draining` for one run. If the run is dropped midway (an error, or
/// the future is cancelled) the state falls back to `Idle` so later triggers
/// are not coalesced forever.
struct DrainGuard<'a> {
    state: &'a Mutex<SyncState>,
    finished: bool,
}

impl DrainGuard<'_> {
    fn finish(mut self, outcome: SyncState) {
        *lock_state(self.state) = outcome;
        self.finished = true;
    }
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            *lock_state(self.state) = SyncState::Idle;
        }
    }
}
