//! In-process `Store` for tests and `gatectl --memory`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::manager::DatabaseError;
use super::models::{
    InvitationStatus, NewInvitation, NewTenant, Organization, PendingInvitation, SecurityEvent,
    SubdomainReservation, Subscription, SubscriptionTier, TeamSettings, TeamSettingsPatch, Tenant,
    TierName, UserProfile,
};
use super::store::{
    AuditStore, CapabilityStore, InvitationStore, OrganizationStore, ProfileStore, ReservationStore,
    StoreHealth, SubscriptionStore, TeamSettingsStore,
};
use crate::authz::{CapabilityKey, CapabilityOverride, Role};

#[derive(Debug, Clone)]
struct Project {
    org_id: Uuid,
    archived: bool,
}

#[derive(Default)]
struct Tables {
    organizations: HashMap<Uuid, Organization>,
    tenants: Vec<Tenant>,
    profiles: HashMap<Uuid, UserProfile>,
    overrides: HashMap<(Uuid, Role, CapabilityKey), bool>,
    subscriptions: Vec<Subscription>,
    tiers: HashMap<TierName, SubscriptionTier>,
    projects: Vec<Project>,
    invitations: HashMap<Uuid, PendingInvitation>,
    team_settings: HashMap<Uuid, TeamSettings>,
    reservations: Vec<SubdomainReservation>,
    audit_log: Vec<SecurityEvent>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_organization(&self, name: &str) -> Organization {
        let org = Organization {
            id: Uuid::new_v4(),
            name: name.to_string(),
            force_logout_after: None,
            created_at: Utc::now(),
        };
        self.tables.write().await.organizations.insert(org.id, org.clone());
        org
    }

    pub async fn add_tenant(&self, org_id: Uuid, subdomain: &str) -> Tenant {
        let tenant = Tenant {
            id: Uuid::new_v4(),
            subdomain: subdomain.to_string(),
            display_name: subdomain.to_string(),
            logo_url: None,
            org_id,
            created_at: Utc::now(),
        };
        self.tables.write().await.tenants.push(tenant.clone());
        tenant
    }

    pub async fn add_profile(&self, org_id: Uuid, email: &str, role: Role) -> UserProfile {
        let profile = UserProfile {
            user_id: Uuid::new_v4(),
            org_id,
            email: email.to_string(),
            role,
            created_at: Utc::now(),
        };
        self.tables.write().await.profiles.insert(profile.user_id, profile.clone());
        profile
    }

    pub async fn add_subscription(&self, org_id: Uuid, tier: TierName, status: &str) {
        self.tables.write().await.subscriptions.push(Subscription {
            org_id,
            tier_name: tier,
            status: status.to_string(),
            current_period_end: None,
        });
    }

    pub async fn add_tier(&self, tier: SubscriptionTier) {
        self.tables.write().await.tiers.insert(tier.name.clone(), tier);
    }

    pub async fn add_project(&self, org_id: Uuid, archived: bool) {
        self.tables.write().await.projects.push(Project { org_id, archived });
    }

    /// Store a row as-is, bypassing the insert defaults.
    pub async fn put_invitation(&self, invitation: PendingInvitation) {
        self.tables.write().await.invitations.insert(invitation.id, invitation);
    }

    pub async fn put_reservation(&self, reservation: SubdomainReservation) {
        self.tables.write().await.reservations.push(reservation);
    }

    pub async fn security_events(&self) -> Vec<SecurityEvent> {
        self.tables.read().await.audit_log.clone()
    }

    pub async fn reservations(&self) -> Vec<SubdomainReservation> {
        self.tables.read().await.reservations.clone()
    }
}

#[async_trait]
impl StoreHealth for MemoryStore {
    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

#[async_trait]
impl OrganizationStore for MemoryStore {
    async fn find_organization(&self, org_id: Uuid) -> Result<Option<Organization>, DatabaseError> {
        Ok(self.tables.read().await.organizations.get(&org_id).cloned())
    }

    async fn set_force_logout_after(&self, org_id: Uuid, at: DateTime<Utc>) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.write().await;
        match tables.organizations.get_mut(&org_id) {
            Some(org) => {
                org.force_logout_after = Some(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_tenant_by_subdomain(&self, subdomain: &str) -> Result<Option<Tenant>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .tenants
            .iter()
            .find(|t| t.subdomain.eq_ignore_ascii_case(subdomain))
            .cloned())
    }

    async fn find_tenant_by_org(&self, org_id: Uuid) -> Result<Option<Tenant>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.tenants.iter().find(|t| t.org_id == org_id).cloned())
    }

    async fn insert_tenant(&self, tenant: NewTenant) -> Result<Tenant, DatabaseError> {
        let mut tables = self.tables.write().await;
        if tables
            .tenants
            .iter()
            .any(|t| t.subdomain.eq_ignore_ascii_case(&tenant.subdomain))
        {
            return Err(DatabaseError::QueryError(format!(
                "duplicate subdomain '{}'",
                tenant.subdomain
            )));
        }
        let row = Tenant {
            id: Uuid::new_v4(),
            subdomain: tenant.subdomain,
            display_name: tenant.display_name,
            logo_url: None,
            org_id: tenant.org_id,
            created_at: Utc::now(),
        };
        tables.tenants.push(row.clone());
        Ok(row)
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn find_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, DatabaseError> {
        Ok(self.tables.read().await.profiles.get(&user_id).cloned())
    }

    async fn count_profiles(&self, org_id: Uuid) -> Result<i64, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.profiles.values().filter(|p| p.org_id == org_id).count() as i64)
    }
}

#[async_trait]
impl CapabilityStore for MemoryStore {
    async fn capability_overrides(&self, org_id: Uuid) -> Result<Vec<CapabilityOverride>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .overrides
            .iter()
            .filter(|((org, _, _), _)| *org == org_id)
            .map(|((_, role, capability), granted)| CapabilityOverride {
                role: *role,
                capability: capability.clone(),
                granted: *granted,
            })
            .collect())
    }

    async fn upsert_capability_override(&self, org_id: Uuid, row: CapabilityOverride) -> Result<(), DatabaseError> {
        self.tables
            .write()
            .await
            .overrides
            .insert((org_id, row.role, row.capability), row.granted);
        Ok(())
    }

    async fn delete_capability_override(
        &self,
        org_id: Uuid,
        role: Role,
        capability: &CapabilityKey,
    ) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .overrides
            .remove(&(org_id, role, capability.clone()))
            .is_some())
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn active_subscription(&self, org_id: Uuid) -> Result<Option<Subscription>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .subscriptions
            .iter()
            .rev()
            .find(|s| s.org_id == org_id && s.is_active())
            .cloned())
    }

    async fn find_tier(&self, name: &TierName) -> Result<Option<SubscriptionTier>, DatabaseError> {
        Ok(self.tables.read().await.tiers.get(name).cloned())
    }

    async fn count_active_projects(&self, org_id: Uuid) -> Result<i64, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .projects
            .iter()
            .filter(|p| p.org_id == org_id && !p.archived)
            .count() as i64)
    }
}

#[async_trait]
impl InvitationStore for MemoryStore {
    async fn insert_invitation(&self, invitation: NewInvitation) -> Result<PendingInvitation, DatabaseError> {
        let row = PendingInvitation {
            id: Uuid::new_v4(),
            email: invitation.email,
            proposed_role: invitation.proposed_role,
            invited_by: invitation.invited_by,
            org_id: invitation.org_id,
            status: InvitationStatus::Pending,
            expires_at: invitation.expires_at,
            created_at: Utc::now(),
            approved_by: None,
            approved_at: None,
            rejected_by: None,
            rejected_at: None,
            rejection_reason: None,
        };
        self.tables.write().await.invitations.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_invitation(&self, id: Uuid) -> Result<Option<PendingInvitation>, DatabaseError> {
        Ok(self.tables.read().await.invitations.get(&id).cloned())
    }

    async fn list_invitations(
        &self,
        org_id: Uuid,
        status: Option<InvitationStatus>,
    ) -> Result<Vec<PendingInvitation>, DatabaseError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<PendingInvitation> = tables
            .invitations
            .values()
            .filter(|i| i.org_id == org_id && status.map_or(true, |s| i.status == s))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn mark_invitation_expired(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.write().await;
        match tables.invitations.get_mut(&id) {
            Some(row) if row.status == InvitationStatus::Pending => {
                row.status = InvitationStatus::Expired;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_invitation_approved(
        &self,
        id: Uuid,
        approved_by: Uuid,
        approved_at: DateTime<Utc>,
    ) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.write().await;
        match tables.invitations.get_mut(&id) {
            Some(row) if row.status == InvitationStatus::Pending => {
                row.status = InvitationStatus::Approved;
                row.approved_by = Some(approved_by);
                row.approved_at = Some(approved_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_invitation_rejected(
        &self,
        id: Uuid,
        rejected_by: Uuid,
        rejected_at: DateTime<Utc>,
        reason: Option<String>,
    ) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.write().await;
        match tables.invitations.get_mut(&id) {
            Some(row) if row.status == InvitationStatus::Pending => {
                row.status = InvitationStatus::Rejected;
                row.rejected_by = Some(rejected_by);
                row.rejected_at = Some(rejected_at);
                row.rejection_reason = reason;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl TeamSettingsStore for MemoryStore {
    async fn find_team_settings(&self, org_id: Uuid) -> Result<Option<TeamSettings>, DatabaseError> {
        Ok(self.tables.read().await.team_settings.get(&org_id).cloned())
    }

    async fn insert_team_settings(&self, settings: TeamSettings) -> Result<TeamSettings, DatabaseError> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .team_settings
            .entry(settings.org_id)
            .or_insert(settings);
        Ok(stored.clone())
    }

    async fn update_team_settings(
        &self,
        org_id: Uuid,
        patch: &TeamSettingsPatch,
    ) -> Result<TeamSettings, DatabaseError> {
        let mut tables = self.tables.write().await;
        let settings = tables
            .team_settings
            .get_mut(&org_id)
            .ok_or_else(|| DatabaseError::NotFound(format!("team settings for {}", org_id)))?;
        settings.apply(patch);
        Ok(settings.clone())
    }
}

#[async_trait]
impl ReservationStore for MemoryStore {
    async fn live_reservation(
        &self,
        subdomain: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<SubdomainReservation>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .reservations
            .iter()
            .rev()
            .find(|r| r.subdomain == subdomain && r.is_live(now))
            .cloned())
    }

    async fn insert_reservation(
        &self,
        subdomain: &str,
        email: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<SubdomainReservation, DatabaseError> {
        let now = Utc::now();
        let mut tables = self.tables.write().await;
        // Mirrors the partial unique index on live reservations.
        if tables
            .reservations
            .iter()
            .any(|r| r.subdomain == subdomain && r.is_live(now))
        {
            return Err(DatabaseError::Conflict(format!(
                "live reservation already exists for '{}'",
                subdomain
            )));
        }
        let row = SubdomainReservation {
            id: Uuid::new_v4(),
            subdomain: subdomain.to_string(),
            email: email.to_string(),
            expires_at,
            confirmed_at: None,
            created_at: now,
        };
        tables.reservations.push(row.clone());
        Ok(row)
    }

    async fn set_reservation_expiry(&self, id: Uuid, expires_at: DateTime<Utc>) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.write().await;
        match tables
            .reservations
            .iter_mut()
            .find(|r| r.id == id && r.confirmed_at.is_none())
        {
            Some(row) => {
                row.expires_at = expires_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn confirm_reservation(&self, id: Uuid, confirmed_at: DateTime<Utc>) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.write().await;
        match tables
            .reservations
            .iter_mut()
            .find(|r| r.id == id && r.confirmed_at.is_none())
        {
            Some(row) => {
                row.confirmed_at = Some(confirmed_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn record_security_event(&self, event: SecurityEvent) -> Result<(), DatabaseError> {
        self.tables.write().await.audit_log.push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn conditional_transitions_only_fire_once() {
        let store = MemoryStore::new();
        let org = store.add_organization("Acme").await;
        let inv = store
            .insert_invitation(NewInvitation {
                email: "a@acme.test".into(),
                proposed_role: Role::Member,
                invited_by: Uuid::new_v4(),
                org_id: org.id,
                expires_at: Utc::now() + Duration::days(7),
            })
            .await
            .unwrap();

        let actor = Uuid::new_v4();
        assert!(store.mark_invitation_approved(inv.id, actor, Utc::now()).await.unwrap());
        assert!(!store.mark_invitation_approved(inv.id, actor, Utc::now()).await.unwrap());
        assert!(!store.mark_invitation_rejected(inv.id, actor, Utc::now(), None).await.unwrap());
        assert!(!store.mark_invitation_expired(inv.id).await.unwrap());
    }

    #[tokio::test]
    async fn second_live_reservation_conflicts() {
        let store = MemoryStore::new();
        let expires_at = Utc::now() + Duration::hours(48);
        store.insert_reservation("globex", "a@globex.test", expires_at).await.unwrap();

        let err = store
            .insert_reservation("globex", "b@other.test", expires_at)
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict(_)));
    }

    #[tokio::test]
    async fn team_settings_insert_keeps_existing_row() {
        let store = MemoryStore::new();
        let org_id = Uuid::new_v4();
        let mut first = TeamSettings::defaults(org_id);
        first.allow_member_invites = true;
        store.insert_team_settings(first).await.unwrap();

        let stored = store.insert_team_settings(TeamSettings::defaults(org_id)).await.unwrap();
        assert!(stored.allow_member_invites);
    }

    #[tokio::test]
    async fn archived_projects_are_not_counted() {
        let store = MemoryStore::new();
        let org_id = Uuid::new_v4();
        store.add_project(org_id, false).await;
        store.add_project(org_id, true).await;
        assert_eq!(store.count_active_projects(org_id).await.unwrap(), 1);
    }
}
