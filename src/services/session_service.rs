//! Force-logout: coarse revocation of every session issued before a cutoff.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;

use super::acting::ActingContext;
use super::audit::AuditLog;
use crate::auth::SessionClaims;
use crate::authz::{AuthzError, AuthzResult};
use crate::database::Store;

#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn Store>,
    audit: AuditLog,
}

impl SessionService {
    pub fn new(store: Arc<dyn Store>, audit: AuditLog) -> Self {
        Self { store, audit }
    }

    /// Claims issued before the organization's `force_logout_after` are stale.
    pub async fn verify_fresh(&self, claims: &SessionClaims) -> AuthzResult<()> {
        let Some(org) = self.store.find_organization(claims.org_id).await? else {
            tracing::warn!("Session for unknown org {}", claims.org_id);
            return Err(AuthzError::NoSession);
        };
        if org.session_revoked(claims.issued_at()) {
            tracing::info!(
                "Session for {} issued at {} predates force logout of org {}",
                claims.sub,
                claims.issued_at(),
                org.id
            );
            return Err(AuthzError::NoSession);
        }
        Ok(())
    }

    /// Returns the new cutoff.
    pub async fn force_logout(&self, acting: &ActingContext) -> AuthzResult<DateTime<Utc>> {
        acting.require_org_manager()?;

        // Token `iat` has whole-second precision.
        let now = Utc::now();
        let cutoff = DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now);
        if !self.store.set_force_logout_after(acting.org_id, cutoff).await? {
            return Err(AuthzError::not_found("Organization not found"));
        }

        tracing::warn!("Force logout for org {} by {}", acting.org_id, acting.user_id);
        self.audit
            .record_always(
                acting.org_id,
                Some(acting.user_id),
                "force_logout",
                json!({ "force_logout_after": cutoff, "by": acting.email }),
            )
            .await;
        Ok(cutoff)
    }
}
