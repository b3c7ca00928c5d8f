//! Store traits over the backend's relations.
//!
//! Every mutation is a single-row conditional write; nothing here assumes a
//! transaction spanning several calls.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::manager::DatabaseError;
use super::models::{
    InvitationStatus, NewInvitation, NewTenant, Organization, PendingInvitation, SecurityEvent,
    SubdomainReservation, Subscription, SubscriptionTier, TeamSettings, TeamSettingsPatch, Tenant,
    TierName, UserProfile,
};
use crate::authz::{CapabilityKey, CapabilityOverride, Role};

#[async_trait]
pub trait OrganizationStore: Send + Sync {
    async fn find_organization(&self, org_id: Uuid) -> Result<Option<Organization>, DatabaseError>;

    async fn set_force_logout_after(&self, org_id: Uuid, at: DateTime<Utc>) -> Result<bool, DatabaseError>;

    async fn find_tenant_by_subdomain(&self, subdomain: &str) -> Result<Option<Tenant>, DatabaseError>;

    async fn find_tenant_by_org(&self, org_id: Uuid) -> Result<Option<Tenant>, DatabaseError>;

    async fn insert_tenant(&self, tenant: NewTenant) -> Result<Tenant, DatabaseError>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn find_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, DatabaseError>;

    async fn count_profiles(&self, org_id: Uuid) -> Result<i64, DatabaseError>;
}

#[async_trait]
pub trait CapabilityStore: Send + Sync {
    async fn capability_overrides(&self, org_id: Uuid) -> Result<Vec<CapabilityOverride>, DatabaseError>;

    /// Insert or replace the row for (org, role, capability).
    async fn upsert_capability_override(
        &self,
        org_id: Uuid,
        row: CapabilityOverride,
    ) -> Result<(), DatabaseError>;

    async fn delete_capability_override(
        &self,
        org_id: Uuid,
        role: Role,
        capability: &CapabilityKey,
    ) -> Result<bool, DatabaseError>;
}

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn active_subscription(&self, org_id: Uuid) -> Result<Option<Subscription>, DatabaseError>;

    async fn find_tier(&self, name: &TierName) -> Result<Option<SubscriptionTier>, DatabaseError>;

    /// Live count of non-archived projects.
    async fn count_active_projects(&self, org_id: Uuid) -> Result<i64, DatabaseError>;
}

#[async_trait]
pub trait InvitationStore: Send + Sync {
    async fn insert_invitation(&self, invitation: NewInvitation) -> Result<PendingInvitation, DatabaseError>;

    async fn find_invitation(&self, id: Uuid) -> Result<Option<PendingInvitation>, DatabaseError>;

    async fn list_invitations(
        &self,
        org_id: Uuid,
        status: Option<InvitationStatus>,
    ) -> Result<Vec<PendingInvitation>, DatabaseError>;

    /// `pending -> expired`; false when the row was no longer pending.
    async fn mark_invitation_expired(&self, id: Uuid) -> Result<bool, DatabaseError>;

    /// `pending -> approved`; false when the row was no longer pending.
    async fn mark_invitation_approved(
        &self,
        id: Uuid,
        approved_by: Uuid,
        approved_at: DateTime<Utc>,
    ) -> Result<bool, DatabaseError>;

    /// `pending -> rejected`; false when the row was no longer pending.
    async fn mark_invitation_rejected(
        &self,
        id: Uuid,
        rejected_by: Uuid,
        rejected_at: DateTime<Utc>,
        reason: Option<String>,
    ) -> Result<bool, DatabaseError>;
}

#[async_trait]
pub trait TeamSettingsStore: Send + Sync {
    async fn find_team_settings(&self, org_id: Uuid) -> Result<Option<TeamSettings>, DatabaseError>;

    /// Insert unless a row already exists, then return whatever is stored.
    async fn insert_team_settings(&self, settings: TeamSettings) -> Result<TeamSettings, DatabaseError>;

    async fn update_team_settings(
        &self,
        org_id: Uuid,
        patch: &TeamSettingsPatch,
    ) -> Result<TeamSettings, DatabaseError>;
}

#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Unconfirmed, unexpired reservation for the subdomain, if any.
    async fn live_reservation(
        &self,
        subdomain: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<SubdomainReservation>, DatabaseError>;

    async fn insert_reservation(
        &self,
        subdomain: &str,
        email: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<SubdomainReservation, DatabaseError>;

    async fn set_reservation_expiry(&self, id: Uuid, expires_at: DateTime<Utc>) -> Result<bool, DatabaseError>;

    async fn confirm_reservation(&self, id: Uuid, confirmed_at: DateTime<Utc>) -> Result<bool, DatabaseError>;
}

#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn record_security_event(&self, event: SecurityEvent) -> Result<(), DatabaseError>;
}

#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn health_check(&self) -> Result<(), DatabaseError>;
}

/// Everything the authorization layer reads or writes.
pub trait Store:
    StoreHealth
    + OrganizationStore
    + ProfileStore
    + CapabilityStore
    + SubscriptionStore
    + InvitationStore
    + TeamSettingsStore
    + ReservationStore
    + AuditStore
{
}

impl<T> Store for T where
    T: StoreHealth
        + OrganizationStore
        + ProfileStore
        + CapabilityStore
        + SubscriptionStore
        + InvitationStore
        + TeamSettingsStore
        + ReservationStore
        + AuditStore
{
}
