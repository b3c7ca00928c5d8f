use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::database::models::SecurityEvent;
use crate::database::Store;

/// Writes `security_audit_log` rows. Failures are logged and swallowed.
#[derive(Clone)]
pub struct AuditLog {
    store: Arc<dyn Store>,
    enabled: bool,
}

impl AuditLog {
    pub fn new(store: Arc<dyn Store>, enabled: bool) -> Self {
        Self { store, enabled }
    }

    /// Routine events, written only when audit logging is switched on.
    pub async fn record(&self, org_id: Uuid, user_id: Option<Uuid>, event_type: &str, details: Value) {
        if self.enabled {
            self.record_always(org_id, user_id, event_type, details).await;
        }
    }

    /// Security-relevant events that are written regardless of the switch.
    pub async fn record_always(&self, org_id: Uuid, user_id: Option<Uuid>, event_type: &str, details: Value) {
        let event = SecurityEvent::new(org_id, user_id, event_type, details);
        if let Err(e) = self.store.record_security_event(event).await {
            tracing::warn!("Failed to record '{}' audit event for org {}: {}", event_type, org_id, e);
        }
    }
}
