use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Row for `security_audit_log`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub org_id: Uuid,
    pub user_id: Option<Uuid>,
    pub event_type: String,
    pub details: Value,
    pub created_at: DateTime<Utc>,
}

impl SecurityEvent {
    pub fn new(org_id: Uuid, user_id: Option<Uuid>, event_type: &str, details: Value) -> Self {
        Self {
            org_id,
            user_id,
            event_type: event_type.to_string(),
            details,
            created_at: Utc::now(),
        }
    }
}
