//! Durable offline queue of service-record submissions.
//!
//! Each record is one JSON file in the queue directory, written to a temp
//! file, fsynced and renamed into place, so a record is either fully on disk
//! or absent. The directory is locked for the lifetime of the queue so only
//! one process on the device owns it, and every operation runs under a
//! single in-process mutex so a submission made while a sync is draining
//! cannot interleave with the drain's bookkeeping.

mod record;

pub use record::{
    AttachmentRef, DeliveryState, FailureKind, QueuedServiceRecord, ServiceRecordPayload,
};

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use fs2::FileExt;
use tracing::{debug, warn};

use crate::error::{PoolDayError, PoolDayResult};

const LOCK_FILE: &str = ".lock";
const RECORD_EXTENSION: &str = "json";

pub struct OfflineQueue {
    dir: PathBuf,
    guard: Mutex<()>,
    _lock: File,
}

impl OfflineQueue {
    /// Open (creating if needed) the queue stored in `dir`.
    ///
    /// Fails with `QueueLocked` if another process already owns it.
    pub fn open(dir: impl Into<PathBuf>) -> PoolDayResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        restrict_dir(&dir)?;

        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(dir.join(LOCK_FILE))?;
        lock.try_lock_exclusive()
            .map_err(|_| PoolDayError::QueueLocked(dir.clone()))?;

        debug!(dir = %dir.display(), "opened offline queue");

        Ok(OfflineQueue {
            dir,
            guard: Mutex::new(()),
            _lock: lock,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Record a submission. It is on disk before this returns.
    pub fn enqueue(&self, payload: ServiceRecordPayload) -> PoolDayResult<QueuedServiceRecord> {
        let _guard = self.lock();

        let record = QueuedServiceRecord::new(payload, Utc::now());
        self.write_record(&record)?;

        debug!(id = %record.id, customer_id = %record.payload.customer_id, "queued service record");
        Ok(record)
    }

    /// All queued records, oldest first.
    pub fn list(&self) -> PoolDayResult<Vec<QueuedServiceRecord>> {
        let _guard = self.lock();
        self.read_all()
    }

    pub fn get(&self, id: &str) -> PoolDayResult<Option<QueuedServiceRecord>> {
        let _guard = self.lock();
        self.read_record(id)
    }

    pub fn len(&self) -> PoolDayResult<usize> {
        Ok(self.list()?.len())
    }

    pub fn is_empty(&self) -> PoolDayResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Delete a record. Removing an id that is already gone is a no-op.
    pub fn remove(&self, id: &str) -> PoolDayResult<()> {
        let _guard = self.lock();

        let Some(path) = self.record_path(id) else {
            return Ok(());
        };

        match fs::remove_file(&path) {
            Ok(()) => {
                sync_dir(&self.dir)?;
                debug!(id, "removed service record from queue");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Record a failed delivery attempt. Returns the updated record, or
    /// `None` if it is no longer queued.
    pub fn mark_failed(
        &self,
        id: &str,
        kind: FailureKind,
        reason: &str,
    ) -> PoolDayResult<Option<QueuedServiceRecord>> {
        let _guard = self.lock();

        let Some(mut record) = self.read_record(id)? else {
            return Ok(None);
        };

        record.state = DeliveryState::Failed {
            kind,
            reason: reason.to_string(),
        };
        record.attempts = record.attempts.saturating_add(1);
        record.last_attempt_at = Some(Utc::now());
        self.write_record(&record)?;

        Ok(Some(record))
    }

    /// Remove every record. Only for tests and resets.
    pub fn clear(&self) -> PoolDayResult<()> {
        let _guard = self.lock();

        for path in self.record_files()? {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        sync_dir(&self.dir)?;
        Ok(())
    }

    // The guarded value is `()`, so a poisoned lock carries no broken state.
    fn lock(&self) -> MutexGuard<'_, ()> {
        self.guard.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Path for a record id, or `None` for ids that cannot be ours.
    fn record_path(&self, id: &str) -> Option<PathBuf> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        valid.then(|| self.dir.join(format!("{}.{}", id, RECORD_EXTENSION)))
    }

    fn record_files(&self) -> PoolDayResult<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.dir)?;

        Ok(entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|e| e == RECORD_EXTENSION))
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| !n.starts_with('.'))
            })
            .collect())
    }

    fn read_all(&self) -> PoolDayResult<Vec<QueuedServiceRecord>> {
        let mut records: Vec<QueuedServiceRecord> = self
            .record_files()?
            .into_iter()
            .filter_map(|path| match read_record_file(&path) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable queue entry");
                    None
                }
            })
            .collect();

        records.sort_by(|a, b| a.queued_at.cmp(&b.queued_at).then_with(|| a.id.cmp(&b.id)));
        Ok(records)
    }

    fn read_record(&self, id: &str) -> PoolDayResult<Option<QueuedServiceRecord>> {
        let Some(path) = self.record_path(id) else {
            return Ok(None);
        };

        match read_record_file(&path) {
            Ok(record) => Ok(Some(record)),
            Err(PoolDayError::Io(e)) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write_record(&self, record: &QueuedServiceRecord) -> PoolDayResult<()> {
        let path = self
            .record_path(&record.id)
            .ok_or_else(|| PoolDayError::Queue(format!("invalid record id '{}'", record.id)))?;
        let temp = self.dir.join(format!(".{}.{}.tmp", record.id, RECORD_EXTENSION));

        let content = serde_json::to_vec_pretty(record)
            .map_err(|e| PoolDayError::Serialization(e.to_string()))?;

        {
            let mut file = open_private(&temp)?;
            file.write_all(&content)?;
            file.sync_all()?;
        }
        fs::rename(&temp, &path)?;
        sync_dir(&self.dir)?;
        Ok(())
    }
}

fn read_record_file(path: &Path) -> PoolDayResult<QueuedServiceRecord> {
    let content = fs::read(path)?;
    serde_json::from_slice(&content).map_err(|e| PoolDayError::Serialization(e.to_string()))
}

fn open_private(path: &Path) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}

#[cfg(unix)]
fn restrict_dir(dir: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(dir, fs::Permissions::from_mode(0o700))
}

#[cfg(not(unix))]
fn restrict_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

/// Persist directory entries (creates, renames, removes).
#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn make_test_payload(customer: &str) -> ServiceRecordPayload {
        let mut readings = BTreeMap::new();
        readings.insert("ph".to_string(), 7.4);
        readings.insert("chlorine".to_string(), 3.0);

        ServiceRecordPayload {
            appointment_id: Some("appt-1".to_string()),
            customer_id: customer.to_string(),
            technician_id: Some("tech-7".to_string()),
            performed_at: Utc.with_ymd_and_hms(2024, 5, 1, 15, 30, 0).unwrap(),
            services: vec!["skim".to_string(), "brush".to_string()],
            readings,
            notes: Some("pump humming".to_string()),
            attachments: vec![AttachmentRef {
                id: "att-1".to_string(),
                file_name: "filter.jpg".to_string(),
                content_type: "image/jpeg".to_string(),
            }],
        }
    }

    #[test]
    fn test_enqueue_survives_restart() {
        let tmp = TempDir::new().unwrap();
        let mut payload = make_test_payload("cust-1");
        // Computed readings use all 17 significant digits
        payload.readings.insert("cya_avg".to_string(), 0.21850000100000005);
        payload.readings.insert("salt_kg".to_string(), 1.7334582370718161);
        payload.readings.insert("temp_c".to_string(), (81.3 - 32.0) * 5.0 / 9.0);

        let record = {
            let queue = OfflineQueue::open(tmp.path()).unwrap();
            queue.enqueue(payload).unwrap()
        };

        let reopened = OfflineQueue::open(tmp.path()).unwrap();
        assert_eq!(reopened.list().unwrap(), vec![record]);
    }

    #[test]
    fn test_list_is_ordered_by_queue_time() {
        let tmp = TempDir::new().unwrap();
        let queue = OfflineQueue::open(tmp.path()).unwrap();

        let first = queue.enqueue(make_test_payload("a")).unwrap();
        let second = queue.enqueue(make_test_payload("b")).unwrap();
        let third = queue.enqueue(make_test_payload("c")).unwrap();

        let ids: Vec<_> = queue.list().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![first.id, second.id, third.id]);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let queue = OfflineQueue::open(tmp.path()).unwrap();
        let record = queue.enqueue(make_test_payload("a")).unwrap();

        queue.remove(&record.id).unwrap();
        queue.remove(&record.id).unwrap();
        queue.remove("../../etc/passwd").unwrap();

        assert!(queue.is_empty().unwrap());
    }

    #[test]
    fn test_mark_failed_persists_reason() {
        let tmp = TempDir::new().unwrap();
        let queue = OfflineQueue::open(tmp.path()).unwrap();
        let record = queue.enqueue(make_test_payload("a")).unwrap();

        let updated = queue
            .mark_failed(&record.id, FailureKind::Rejected, "missing customer")
            .unwrap()
            .unwrap();
        assert_eq!(updated.attempts, 1);

        let stored = queue.get(&record.id).unwrap().unwrap();
        assert_eq!(
            stored.state,
            DeliveryState::Failed {
                kind: FailureKind::Rejected,
                reason: "missing customer".to_string()
            }
        );
        assert!(queue.mark_failed("gone", FailureKind::Unavailable, "x").unwrap().is_none());
    }

    #[test]
    fn test_clear_removes_everything() {
        let tmp = TempDir::new().unwrap();
        let queue = OfflineQueue::open(tmp.path()).unwrap();
        queue.enqueue(make_test_payload("a")).unwrap();
        queue.enqueue(make_test_payload("b")).unwrap();

        queue.clear().unwrap();
        assert_eq!(queue.len().unwrap(), 0);
    }

    #[test]
    fn test_corrupt_entry_is_skipped_not_deleted() {
        let tmp = TempDir::new().unwrap();
        let queue = OfflineQueue::open(tmp.path()).unwrap();
        queue.enqueue(make_test_payload("a")).unwrap();
        let corrupt = tmp.path().join("broken.json");
        fs::write(&corrupt, "{ not json").unwrap();

        assert_eq!(queue.list().unwrap().len(), 1);
        assert!(corrupt.exists());
    }

    #[test]
    fn test_second_owner_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let _queue = OfflineQueue::open(tmp.path()).unwrap();

        let err = OfflineQueue::open(tmp.path()).err().unwrap();
        assert!(matches!(err, PoolDayError::QueueLocked(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_records_are_private_to_owner() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("queue");
        let queue = OfflineQueue::open(&dir).unwrap();
        let record = queue.enqueue(make_test_payload("a")).unwrap();

        let dir_mode = fs::metadata(&dir).unwrap().permissions().mode() & 0o777;
        let file_mode = fs::metadata(dir.join(format!("{}.json", record.id)))
            .unwrap()
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(dir_mode, 0o700);
        assert_eq!(file_mode, 0o600);
    }
}
