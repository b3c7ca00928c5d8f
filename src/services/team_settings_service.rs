use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use super::acting::ActingContext;
use super::audit::AuditLog;
use super::tier_service::TierService;
use crate::authz::{AuthzError, AuthzResult, Role};
use crate::database::models::{TeamSettings, TeamSettingsPatch};
use crate::database::Store;

#[derive(Clone)]
pub struct TeamSettingsService {
    store: Arc<dyn Store>,
    tiers: TierService,
    audit: AuditLog,
}

impl TeamSettingsService {
    pub fn new(store: Arc<dyn Store>, tiers: TierService, audit: AuditLog) -> Self {
        Self { store, tiers, audit }
    }

    /// Creates the default row on first read.
    pub async fn get_team_settings(&self, org_id: Uuid) -> AuthzResult<TeamSettings> {
        let settings = match self.store.find_team_settings(org_id).await? {
            Some(settings) => settings,
            None => {
                tracing::info!("Creating default team settings for org {}", org_id);
                self.store
                    .insert_team_settings(TeamSettings::defaults(org_id))
                    .await?
            }
        };
        self.with_tier_limit(settings).await
    }

    pub async fn update_team_settings(
        &self,
        acting: &ActingContext,
        patch: &TeamSettingsPatch,
    ) -> AuthzResult<TeamSettings> {
        acting.require_admin()?;

        if let Some(role) = patch.auto_assign_default_role {
            if !matches!(role, Role::Member | Role::ViewOnly) {
                return Err(AuthzError::validation(format!(
                    "Default role must be member or view-only, not '{}'",
                    role
                )));
            }
        }
        if let Some(days) = patch.guest_link_expiry_days {
            if days < 1 {
                return Err(AuthzError::validation("Guest link expiry must be at least one day"));
            }
        }

        // Make sure there is a row to update.
        self.get_team_settings(acting.org_id).await?;
        let updated = self.store.update_team_settings(acting.org_id, patch).await?;

        self.audit
            .record(
                acting.org_id,
                Some(acting.user_id),
                "team_settings_updated",
                json!(patch),
            )
            .await;
        self.with_tier_limit(updated).await
    }

    async fn with_tier_limit(&self, mut settings: TeamSettings) -> AuthzResult<TeamSettings> {
        let tier = self.tiers.get_tier_info(settings.org_id).await?;
        settings.max_team_size = tier.limits.max_team_members;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::subscription::FREE_MAX_TEAM_MEMBERS;
    use crate::database::models::TierName;
    use crate::database::MemoryStore;

    fn acting(org_id: Uuid, role: Role) -> ActingContext {
        ActingContext {
            user_id: Uuid::new_v4(),
            email: "someone@acme.test".into(),
            org_id,
            subdomain: "acme".into(),
            role,
        }
    }

    fn service(store: Arc<MemoryStore>) -> TeamSettingsService {
        TeamSettingsService::new(
            store.clone(),
            TierService::new(store.clone()),
            AuditLog::new(store, false),
        )
    }

    #[tokio::test]
    async fn defaults_are_created_lazily_with_tier_size() {
        let store = Arc::new(MemoryStore::new());
        let org = store.add_organization("Acme").await;
        let settings = service(store.clone()).get_team_settings(org.id).await.unwrap();

        assert!(!settings.allow_member_invites);
        assert!(settings.require_admin_approval);
        assert_eq!(settings.auto_assign_default_role, Role::Member);
        assert_eq!(settings.guest_link_expiry_days, 7);
        assert_eq!(settings.max_team_size, Some(FREE_MAX_TEAM_MEMBERS));
    }

    #[tokio::test]
    async fn enterprise_team_size_is_unlimited() {
        let store = Arc::new(MemoryStore::new());
        let org = store.add_organization("Acme").await;
        store.add_subscription(org.id, TierName::Enterprise, "active").await;
        let settings = service(store).get_team_settings(org.id).await.unwrap();
        assert_eq!(settings.max_team_size, None);
    }

    #[tokio::test]
    async fn members_cannot_update_settings() {
        let store = Arc::new(MemoryStore::new());
        let org = store.add_organization("Acme").await;
        let err = service(store)
            .update_team_settings(&acting(org.id, Role::Member), &TeamSettingsPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthzError::InsufficientRole { .. }));
    }

    #[tokio::test]
    async fn default_role_cannot_be_elevated() {
        let store = Arc::new(MemoryStore::new());
        let org = store.add_organization("Acme").await;
        let patch = TeamSettingsPatch {
            auto_assign_default_role: Some(Role::Admin),
            ..Default::default()
        };
        let err = service(store)
            .update_team_settings(&acting(org.id, Role::Owner), &patch)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthzError::Validation(_)));
    }

    #[tokio::test]
    async fn admin_update_persists() {
        let store = Arc::new(MemoryStore::new());
        let org = store.add_organization("Acme").await;
        let svc = service(store);
        let patch = TeamSettingsPatch {
            allow_member_invites: Some(true),
            auto_assign_default_role: Some(Role::ViewOnly),
            ..Default::default()
        };
        svc.update_team_settings(&acting(org.id, Role::Admin), &patch)
            .await
            .unwrap();

        let settings = svc.get_team_settings(org.id).await.unwrap();
        assert!(settings.allow_member_invites);
        assert_eq!(settings.auto_assign_default_role, Role::ViewOnly);
    }
}
