use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use super::acting::ActingContext;
use super::audit::AuditLog;
use super::tier_service::TierService;
use crate::authz::{
    resolve_capabilities, AuthzError, AuthzResult, CapabilityKey, CapabilityOverride, DefaultCapabilities,
    EffectiveCapabilities, Role,
};
use crate::database::Store;

#[derive(Clone)]
pub struct CapabilityService {
    store: Arc<dyn Store>,
    defaults: Arc<DefaultCapabilities>,
    tiers: TierService,
    audit: AuditLog,
}

impl CapabilityService {
    pub fn new(store: Arc<dyn Store>, defaults: Arc<DefaultCapabilities>, tiers: TierService, audit: AuditLog) -> Self {
        Self {
            store,
            defaults,
            tiers,
            audit,
        }
    }

    pub fn defaults(&self) -> &DefaultCapabilities {
        &self.defaults
    }

    /// Unknown organizations resolve to the fail-closed state.
    pub async fn effective_capabilities(&self, role: Role, org_id: Uuid) -> AuthzResult<EffectiveCapabilities> {
        if self.store.find_organization(org_id).await?.is_none() {
            tracing::warn!("Capability lookup for unknown org {}", org_id);
            return Ok(EffectiveCapabilities::unresolved());
        }
        let overrides = self.store.capability_overrides(org_id).await?;
        Ok(EffectiveCapabilities::resolved(resolve_capabilities(
            role,
            &self.defaults,
            &overrides,
        )))
    }

    /// Resolve through the user's profile record rather than token claims.
    pub async fn for_user(&self, user_id: Uuid) -> AuthzResult<EffectiveCapabilities> {
        match self.store.find_profile(user_id).await? {
            Some(profile) => self.effective_capabilities(profile.role, profile.org_id).await,
            None => {
                tracing::debug!("No profile for user {}", user_id);
                Ok(EffectiveCapabilities::unresolved())
            }
        }
    }

    pub async fn set_capability_override(
        &self,
        acting: &ActingContext,
        role: Role,
        capability: CapabilityKey,
        granted: bool,
    ) -> AuthzResult<CapabilityOverride> {
        self.check_override_permission(acting, role).await?;

        let row = CapabilityOverride {
            role,
            capability,
            granted,
        };
        self.store.upsert_capability_override(acting.org_id, row.clone()).await?;
        tracing::info!(
            "Capability override {} for {} set to {} in org {}",
            row.capability,
            role,
            granted,
            acting.org_id
        );
        self.audit
            .record(
                acting.org_id,
                Some(acting.user_id),
                "capability_override_set",
                json!({ "role": role, "capability": row.capability, "granted": granted }),
            )
            .await;
        Ok(row)
    }

    /// Returns false when there was no override to remove.
    pub async fn clear_capability_override(
        &self,
        acting: &ActingContext,
        role: Role,
        capability: &CapabilityKey,
    ) -> AuthzResult<bool> {
        self.check_override_permission(acting, role).await?;

        let removed = self
            .store
            .delete_capability_override(acting.org_id, role, capability)
            .await?;
        if removed {
            self.audit
                .record(
                    acting.org_id,
                    Some(acting.user_id),
                    "capability_override_cleared",
                    json!({ "role": role, "capability": capability }),
                )
                .await;
        }
        Ok(removed)
    }

    async fn check_override_permission(&self, acting: &ActingContext, role: Role) -> AuthzResult<()> {
        acting.require_org_manager()?;
        if !acting.role.outranks(role) {
            return Err(AuthzError::unauthorized(format!(
                "Cannot change capabilities of role '{}'",
                role
            )));
        }
        let tier = self.tiers.get_tier_info(acting.org_id).await?;
        if !tier.limits.allows_custom_permissions {
            return Err(AuthzError::unauthorized(format!(
                "The {} plan does not allow custom permissions",
                tier.tier_name
            )));
        }
        Ok(())
    }
}
