use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    /// Sessions issued before this instant are no longer trusted.
    pub force_logout_after: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Organization {
    pub fn session_revoked(&self, issued_at: DateTime<Utc>) -> bool {
        self.force_logout_after
            .map(|cutoff| issued_at < cutoff)
            .unwrap_or(false)
    }
}
