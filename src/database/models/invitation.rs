use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::authz::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
}

impl InvitationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Approved => "approved",
            InvitationStatus::Rejected => "rejected",
            InvitationStatus::Expired => "expired",
        }
    }

    /// No transition leaves a terminal state.
    pub fn is_terminal(self) -> bool {
        !matches!(self, InvitationStatus::Pending)
    }
}

impl fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvitationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(InvitationStatus::Pending),
            "approved" => Ok(InvitationStatus::Approved),
            "rejected" => Ok(InvitationStatus::Rejected),
            "expired" => Ok(InvitationStatus::Expired),
            other => Err(format!("unknown invitation status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingInvitation {
    pub id: Uuid,
    pub email: String,
    pub proposed_role: Role,
    pub invited_by: Uuid,
    pub org_id: Uuid,
    pub status: InvitationStatus,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<Uuid>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

impl PendingInvitation {
    pub fn is_past_expiry(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Stored status, except that a pending row past its expiry reads as expired.
    pub fn effective_status(&self, now: DateTime<Utc>) -> InvitationStatus {
        match self.status {
            InvitationStatus::Pending if self.is_past_expiry(now) => InvitationStatus::Expired,
            status => status,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewInvitation {
    pub email: String,
    pub proposed_role: Role,
    pub invited_by: Uuid,
    pub org_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn invitation(expires_in: Duration) -> PendingInvitation {
        let now = Utc::now();
        PendingInvitation {
            id: Uuid::new_v4(),
            email: "new@acme.test".into(),
            proposed_role: Role::Member,
            invited_by: Uuid::new_v4(),
            org_id: Uuid::new_v4(),
            status: InvitationStatus::Pending,
            expires_at: now + expires_in,
            created_at: now,
            approved_by: None,
            approved_at: None,
            rejected_by: None,
            rejected_at: None,
            rejection_reason: None,
        }
    }

    #[test]
    fn pending_past_expiry_reads_as_expired() {
        let now = Utc::now();
        assert_eq!(invitation(Duration::hours(-1)).effective_status(now), InvitationStatus::Expired);
        assert_eq!(invitation(Duration::hours(1)).effective_status(now), InvitationStatus::Pending);
    }

    #[test]
    fn terminal_states_stay_as_stored() {
        let mut inv = invitation(Duration::hours(-1));
        inv.status = InvitationStatus::Approved;
        assert_eq!(inv.effective_status(Utc::now()), InvitationStatus::Approved);
        assert!(InvitationStatus::Rejected.is_terminal());
        assert!(!InvitationStatus::Pending.is_terminal());
    }
}
