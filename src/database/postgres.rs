//! `Store` over the backend's Postgres relations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::manager::{DatabaseError, DatabaseManager};
use super::models::{
    InvitationStatus, NewInvitation, NewTenant, Organization, PendingInvitation, SecurityEvent,
    SubdomainReservation, Subscription, SubscriptionTier, TeamSettings, TeamSettingsPatch, Tenant,
    TierLimits, TierName, UserProfile,
};
use super::store::{
    AuditStore, CapabilityStore, InvitationStore, OrganizationStore, ProfileStore, ReservationStore,
    StoreHealth, SubscriptionStore, TeamSettingsStore,
};
use crate::authz::{CapabilityKey, CapabilityOverride, Role};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn parse_role(raw: &str) -> Result<Role, DatabaseError> {
    raw.parse()
        .map_err(|e: crate::authz::role::UnknownRole| DatabaseError::Corrupt(e.to_string()))
}

#[derive(FromRow)]
struct ProfileRow {
    user_id: Uuid,
    org_id: Uuid,
    email: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ProfileRow> for UserProfile {
    type Error = DatabaseError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        Ok(UserProfile {
            user_id: row.user_id,
            org_id: row.org_id,
            email: row.email,
            role: parse_role(&row.role)?,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct OverrideRow {
    role: String,
    capability: String,
    granted: bool,
}

#[derive(FromRow)]
struct SubscriptionRow {
    org_id: Uuid,
    tier_name: String,
    status: String,
    current_period_end: Option<DateTime<Utc>>,
}

#[derive(FromRow)]
struct TierRow {
    name: String,
    max_team_members: Option<i64>,
    max_projects: Option<i64>,
    allows_custom_permissions: bool,
}

#[derive(FromRow)]
struct InvitationRow {
    id: Uuid,
    email: String,
    proposed_role: String,
    invited_by: Uuid,
    org_id: Uuid,
    status: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    approved_by: Option<Uuid>,
    approved_at: Option<DateTime<Utc>>,
    rejected_by: Option<Uuid>,
    rejected_at: Option<DateTime<Utc>>,
    rejection_reason: Option<String>,
}

impl TryFrom<InvitationRow> for PendingInvitation {
    type Error = DatabaseError;

    fn try_from(row: InvitationRow) -> Result<Self, Self::Error> {
        Ok(PendingInvitation {
            id: row.id,
            email: row.email,
            proposed_role: parse_role(&row.proposed_role)?,
            invited_by: row.invited_by,
            org_id: row.org_id,
            status: row.status.parse().map_err(DatabaseError::Corrupt)?,
            expires_at: row.expires_at,
            created_at: row.created_at,
            approved_by: row.approved_by,
            approved_at: row.approved_at,
            rejected_by: row.rejected_by,
            rejected_at: row.rejected_at,
            rejection_reason: row.rejection_reason,
        })
    }
}

#[derive(FromRow)]
struct TeamSettingsRow {
    org_id: Uuid,
    allow_member_invites: bool,
    require_admin_approval: bool,
    auto_assign_default_role: String,
    allow_guest_access: bool,
    guest_link_expiry_days: i32,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TeamSettingsRow> for TeamSettings {
    type Error = DatabaseError;

    fn try_from(row: TeamSettingsRow) -> Result<Self, Self::Error> {
        Ok(TeamSettings {
            org_id: row.org_id,
            allow_member_invites: row.allow_member_invites,
            require_admin_approval: row.require_admin_approval,
            auto_assign_default_role: parse_role(&row.auto_assign_default_role)?,
            max_team_size: None,
            allow_guest_access: row.allow_guest_access,
            guest_link_expiry_days: row.guest_link_expiry_days,
            updated_at: row.updated_at,
        })
    }
}

const INVITATION_COLUMNS: &str = r#"
    id, email, proposed_role, invited_by, org_id, status, expires_at, created_at,
    approved_by, approved_at, rejected_by, rejected_at, rejection_reason
"#;

const TEAM_SETTINGS_COLUMNS: &str = r#"
    org_id, allow_member_invites, require_admin_approval, auto_assign_default_role,
    allow_guest_access, guest_link_expiry_days, updated_at
"#;

#[async_trait]
impl StoreHealth for PgStore {
    async fn health_check(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }
}

#[async_trait]
impl OrganizationStore for PgStore {
    async fn find_organization(&self, org_id: Uuid) -> Result<Option<Organization>, DatabaseError> {
        let org = sqlx::query_as::<_, Organization>(
            "SELECT id, name, force_logout_after, created_at FROM organizations WHERE id = $1",
        )
        .bind(org_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(org)
    }

    async fn set_force_logout_after(&self, org_id: Uuid, at: DateTime<Utc>) -> Result<bool, DatabaseError> {
        let result = sqlx::query("UPDATE organizations SET force_logout_after = $2 WHERE id = $1")
            .bind(org_id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn find_tenant_by_subdomain(&self, subdomain: &str) -> Result<Option<Tenant>, DatabaseError> {
        let tenant = sqlx::query_as::<_, Tenant>(
            r#"
            SELECT id, subdomain, display_name, logo_url, org_id, created_at
            FROM tenants
            WHERE lower(subdomain) = lower($1)
            "#,
        )
        .bind(subdomain)
        .fetch_optional(&self.pool)
        .await?;
        Ok(tenant)
    }

    async fn find_tenant_by_org(&self, org_id: Uuid) -> Result<Option<Tenant>, DatabaseError> {
        let tenant = sqlx::query_as::<_, Tenant>(
            "SELECT id, subdomain, display_name, logo_url, org_id, created_at FROM tenants WHERE org_id = $1",
        )
        .bind(org_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(tenant)
    }

    async fn insert_tenant(&self, tenant: NewTenant) -> Result<Tenant, DatabaseError> {
        let row = sqlx::query_as::<_, Tenant>(
            r#"
            INSERT INTO tenants (id, subdomain, display_name, org_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, subdomain, display_name, logo_url, org_id, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&tenant.subdomain)
        .bind(&tenant.display_name)
        .bind(tenant.org_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }
}

#[async_trait]
impl ProfileStore for PgStore {
    async fn find_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, DatabaseError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            "SELECT user_id, org_id, email, role, created_at FROM user_profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(UserProfile::try_from).transpose()
    }

    async fn count_profiles(&self, org_id: Uuid) -> Result<i64, DatabaseError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM user_profiles WHERE org_id = $1")
            .bind(org_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }
}

#[async_trait]
impl CapabilityStore for PgStore {
    async fn capability_overrides(&self, org_id: Uuid) -> Result<Vec<CapabilityOverride>, DatabaseError> {
        let rows = sqlx::query_as::<_, OverrideRow>(
            "SELECT role, capability, granted FROM organization_capability_overrides WHERE org_id = $1",
        )
        .bind(org_id)
        .fetch_all(&self.pool)
        .await?;

        let mut overrides = Vec::with_capacity(rows.len());
        for row in rows {
            // Rows naming retired capabilities or roles are skipped rather than failing the whole set.
            match (row.role.parse::<Role>(), CapabilityKey::parse(&row.capability)) {
                (Ok(role), Ok(capability)) => overrides.push(CapabilityOverride {
                    role,
                    capability,
                    granted: row.granted,
                }),
                _ => tracing::warn!(
                    "Ignoring capability override {}/{} for org {}",
                    row.role,
                    row.capability,
                    org_id
                ),
            }
        }
        Ok(overrides)
    }

    async fn upsert_capability_override(&self, org_id: Uuid, row: CapabilityOverride) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO organization_capability_overrides (org_id, role, capability, granted)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (org_id, role, capability) DO UPDATE SET granted = EXCLUDED.granted
            "#,
        )
        .bind(org_id)
        .bind(row.role.as_str())
        .bind(row.capability.as_str())
        .bind(row.granted)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_capability_override(
        &self,
        org_id: Uuid,
        role: Role,
        capability: &CapabilityKey,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "DELETE FROM organization_capability_overrides WHERE org_id = $1 AND role = $2 AND capability = $3",
        )
        .bind(org_id)
        .bind(role.as_str())
        .bind(capability.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl SubscriptionStore for PgStore {
    async fn active_subscription(&self, org_id: Uuid) -> Result<Option<Subscription>, DatabaseError> {
        let row = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT org_id, tier_name, status, current_period_end
            FROM subscriptions
            WHERE org_id = $1 AND status IN ('active', 'trialing')
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(org_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| Subscription {
            org_id: r.org_id,
            tier_name: TierName::from(r.tier_name),
            status: r.status,
            current_period_end: r.current_period_end,
        }))
    }

    async fn find_tier(&self, name: &TierName) -> Result<Option<SubscriptionTier>, DatabaseError> {
        let row = sqlx::query_as::<_, TierRow>(
            r#"
            SELECT name, max_team_members, max_projects, allows_custom_permissions
            FROM subscription_tiers
            WHERE name = $1
            "#,
        )
        .bind(name.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| SubscriptionTier {
            name: TierName::from(r.name),
            limits: TierLimits {
                max_team_members: r.max_team_members,
                max_projects: r.max_projects,
                allows_custom_permissions: r.allows_custom_permissions,
            },
        }))
    }

    async fn count_active_projects(&self, org_id: Uuid) -> Result<i64, DatabaseError> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM projects WHERE org_id = $1 AND archived_at IS NULL")
                .bind(org_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count.0)
    }
}

#[async_trait]
impl InvitationStore for PgStore {
    async fn insert_invitation(&self, invitation: NewInvitation) -> Result<PendingInvitation, DatabaseError> {
        let sql = format!(
            r#"
            INSERT INTO pending_invitations (id, email, proposed_role, invited_by, org_id, status, expires_at)
            VALUES ($1, $2, $3, $4, $5, 'pending', $6)
            RETURNING {}
            "#,
            INVITATION_COLUMNS
        );
        let row = sqlx::query_as::<_, InvitationRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(&invitation.email)
            .bind(invitation.proposed_role.as_str())
            .bind(invitation.invited_by)
            .bind(invitation.org_id)
            .bind(invitation.expires_at)
            .fetch_one(&self.pool)
            .await?;
        row.try_into()
    }

    async fn find_invitation(&self, id: Uuid) -> Result<Option<PendingInvitation>, DatabaseError> {
        let sql = format!("SELECT {} FROM pending_invitations WHERE id = $1", INVITATION_COLUMNS);
        let row = sqlx::query_as::<_, InvitationRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(PendingInvitation::try_from).transpose()
    }

    async fn list_invitations(
        &self,
        org_id: Uuid,
        status: Option<InvitationStatus>,
    ) -> Result<Vec<PendingInvitation>, DatabaseError> {
        let sql = format!(
            r#"
            SELECT {} FROM pending_invitations
            WHERE org_id = $1 AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
            INVITATION_COLUMNS
        );
        let rows = sqlx::query_as::<_, InvitationRow>(&sql)
            .bind(org_id)
            .bind(status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(PendingInvitation::try_from).collect()
    }

    async fn mark_invitation_expired(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE pending_invitations SET status = 'expired' WHERE id = $1 AND status = 'pending'",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_invitation_approved(
        &self,
        id: Uuid,
        approved_by: Uuid,
        approved_at: DateTime<Utc>,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE pending_invitations
            SET status = 'approved', approved_by = $2, approved_at = $3
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(approved_by)
        .bind(approved_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_invitation_rejected(
        &self,
        id: Uuid,
        rejected_by: Uuid,
        rejected_at: DateTime<Utc>,
        reason: Option<String>,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE pending_invitations
            SET status = 'rejected', rejected_by = $2, rejected_at = $3, rejection_reason = $4
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(rejected_by)
        .bind(rejected_at)
        .bind(reason)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl TeamSettingsStore for PgStore {
    async fn find_team_settings(&self, org_id: Uuid) -> Result<Option<TeamSettings>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM organization_team_settings WHERE org_id = $1",
            TEAM_SETTINGS_COLUMNS
        );
        let row = sqlx::query_as::<_, TeamSettingsRow>(&sql)
            .bind(org_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(TeamSettings::try_from).transpose()
    }

    async fn insert_team_settings(&self, settings: TeamSettings) -> Result<TeamSettings, DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO organization_team_settings
                (org_id, allow_member_invites, require_admin_approval, auto_assign_default_role,
                 allow_guest_access, guest_link_expiry_days, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (org_id) DO NOTHING
            "#,
        )
        .bind(settings.org_id)
        .bind(settings.allow_member_invites)
        .bind(settings.require_admin_approval)
        .bind(settings.auto_assign_default_role.as_str())
        .bind(settings.allow_guest_access)
        .bind(settings.guest_link_expiry_days)
        .bind(settings.updated_at)
        .execute(&self.pool)
        .await?;

        self.find_team_settings(settings.org_id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("team settings for {}", settings.org_id)))
    }

    async fn update_team_settings(
        &self,
        org_id: Uuid,
        patch: &TeamSettingsPatch,
    ) -> Result<TeamSettings, DatabaseError> {
        let sql = format!(
            r#"
            UPDATE organization_team_settings SET
                allow_member_invites = COALESCE($2, allow_member_invites),
                require_admin_approval = COALESCE($3, require_admin_approval),
                auto_assign_default_role = COALESCE($4, auto_assign_default_role),
                allow_guest_access = COALESCE($5, allow_guest_access),
                guest_link_expiry_days = COALESCE($6, guest_link_expiry_days),
                updated_at = now()
            WHERE org_id = $1
            RETURNING {}
            "#,
            TEAM_SETTINGS_COLUMNS
        );
        let row = sqlx::query_as::<_, TeamSettingsRow>(&sql)
            .bind(org_id)
            .bind(patch.allow_member_invites)
            .bind(patch.require_admin_approval)
            .bind(patch.auto_assign_default_role.map(|r| r.as_str()))
            .bind(patch.allow_guest_access)
            .bind(patch.guest_link_expiry_days)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("team settings for {}", org_id)))?;
        row.try_into()
    }
}

#[async_trait]
impl ReservationStore for PgStore {
    async fn live_reservation(
        &self,
        subdomain: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<SubdomainReservation>, DatabaseError> {
        let row = sqlx::query_as::<_, SubdomainReservation>(
            r#"
            SELECT id, subdomain, email, expires_at, confirmed_at, created_at
            FROM subdomain_reservations
            WHERE subdomain = $1 AND confirmed_at IS NULL AND expires_at > $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(subdomain)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert_reservation(
        &self,
        subdomain: &str,
        email: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<SubdomainReservation, DatabaseError> {
        let row = sqlx::query_as::<_, SubdomainReservation>(
            r#"
            INSERT INTO subdomain_reservations (id, subdomain, email, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, subdomain, email, expires_at, confirmed_at, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(subdomain)
        .bind(email)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                DatabaseError::Conflict(format!("live reservation already exists for '{}'", subdomain))
            }
            other => DatabaseError::Sqlx(other),
        })?;
        Ok(row)
    }

    async fn set_reservation_expiry(&self, id: Uuid, expires_at: DateTime<Utc>) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE subdomain_reservations SET expires_at = $2 WHERE id = $1 AND confirmed_at IS NULL",
        )
        .bind(id)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn confirm_reservation(&self, id: Uuid, confirmed_at: DateTime<Utc>) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE subdomain_reservations SET confirmed_at = $2 WHERE id = $1 AND confirmed_at IS NULL",
        )
        .bind(id)
        .bind(confirmed_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl AuditStore for PgStore {
    async fn record_security_event(&self, event: SecurityEvent) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO security_audit_log (org_id, user_id, event_type, details, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(event.org_id)
        .bind(event.user_id)
        .bind(&event.event_type)
        .bind(&event.details)
        .bind(event.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
