//! Queued service records.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reference to a photo or document captured with a service record.
/// The bytes themselves live in attachment storage, not in the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    pub id: String,
    pub file_name: String,
    pub content_type: String,
}

/// What a technician recorded at a visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRecordPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appointment_id: Option<String>,
    pub customer_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technician_id: Option<String>,
    pub performed_at: DateTime<Utc>,
    /// Work performed, e.g. "skim", "brush", "filter-clean"
    #[serde(default)]
    pub services: Vec<String>,
    /// Water chemistry readings by name, e.g. "ph" -> 7.4
    #[serde(default)]
    pub readings: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub attachments: Vec<AttachmentRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Transient; the next sync retries it
    Unavailable,
    /// The store refused the payload; needs the technician's attention
    Rejected,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Unavailable => write!(f, "unavailable"),
            FailureKind::Rejected => write!(f, "rejected"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DeliveryState {
    Pending,
    Committed,
    Failed { kind: FailureKind, reason: String },
}

impl fmt::Display for DeliveryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryState::Pending => write!(f, "pending"),
            DeliveryState::Committed => write!(f, "committed"),
            DeliveryState::Failed { kind, reason } => write!(f, "failed ({}): {}", kind, reason),
        }
    }
}

/// One pending submission, owned by this device until the store commits it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedServiceRecord {
    /// Client-generated, stable across retries; the remote upsert key
    pub id: String,
    pub payload: ServiceRecordPayload,
    pub queued_at: DateTime<Utc>,
    pub state: DeliveryState,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_attempt_at: Option<DateTime<Utc>>,
}

impl QueuedServiceRecord {
    pub fn new(payload: ServiceRecordPayload, queued_at: DateTime<Utc>) -> Self {
        QueuedServiceRecord {
            id: uuid::Uuid::new_v4().to_string(),
            payload,
            queued_at,
            state: DeliveryState::Pending,
            attempts: 0,
            last_attempt_at: None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state, DeliveryState::Failed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_failed_state_serializes_with_tag() {
        let state = DeliveryState::Failed {
            kind: FailureKind::Rejected,
            reason: "ph reading out of range".to_string(),
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["state"], "failed");
        assert_eq!(json["kind"], "rejected");
    }

    #[test]
    fn test_new_record_is_pending_with_fresh_id() {
        let payload = ServiceRecordPayload {
            appointment_id: None,
            customer_id: "cust-1".to_string(),
            technician_id: None,
            performed_at: Utc.with_ymd_and_hms(2024, 5, 1, 15, 0, 0).unwrap(),
            services: vec!["skim".to_string()],
            readings: BTreeMap::new(),
            notes: None,
            attachments: vec![],
        };
        let a = QueuedServiceRecord::new(payload.clone(), payload.performed_at);
        let b = QueuedServiceRecord::new(payload.clone(), payload.performed_at);

        assert_eq!(a.state, DeliveryState::Pending);
        assert_ne!(a.id, b.id);
        assert!(!a.is_failed());
    }
}
