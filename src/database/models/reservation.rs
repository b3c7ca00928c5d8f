use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Temporary hold on a subdomain between signup and email verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct SubdomainReservation {
    pub id: Uuid,
    pub subdomain: String,
    pub email: String,
    pub expires_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl SubdomainReservation {
    /// Unconfirmed and not yet expired.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.confirmed_at.is_none() && self.expires_at > now
    }

    pub fn held_by(&self, email: &str) -> bool {
        self.email.eq_ignore_ascii_case(email.trim())
    }
}
