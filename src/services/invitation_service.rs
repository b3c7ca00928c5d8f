//! Invitation lifecycle: `pending -> approved | rejected | expired`.
//!
//! Every transition is a conditional write on `status = 'pending'`, so two
//! concurrent approvals cannot both succeed.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use super::acting::ActingContext;
use super::audit::AuditLog;
use super::capability_service::CapabilityService;
use super::invite_sender::InviteSender;
use super::team_settings_service::TeamSettingsService;
use super::tier_service::{TierService, UsageResource};
use crate::authz::{keys, AuthzError, AuthzResult, CapabilityKey, Role};
use crate::config::AppConfig;
use crate::database::models::{InvitationStatus, NewInvitation, PendingInvitation};
use crate::database::Store;

const NOT_FOUND: &str = "Invitation not found or already resolved";

/// Holding either one lets an admin approve or reject.
const RESOLVE_CAPABILITIES: [CapabilityKey; 2] = [keys::TEAM_INVITE, keys::TEAM_MANAGE_ROLES];

/// Result of a successful approval; the email is echoed for confirmation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApprovedInvitation {
    pub id: Uuid,
    pub email: String,
}

#[derive(Clone)]
pub struct InvitationService {
    store: Arc<dyn Store>,
    sender: Arc<dyn InviteSender>,
    config: Arc<AppConfig>,
    tiers: TierService,
    team_settings: TeamSettingsService,
    capabilities: CapabilityService,
    audit: AuditLog,
}

impl InvitationService {
    pub fn new(
        store: Arc<dyn Store>,
        sender: Arc<dyn InviteSender>,
        config: Arc<AppConfig>,
        tiers: TierService,
        team_settings: TeamSettingsService,
        capabilities: CapabilityService,
        audit: AuditLog,
    ) -> Self {
        Self {
            store,
            sender,
            config,
            tiers,
            team_settings,
            capabilities,
            audit,
        }
    }

    /// Requires `team.invite`, or the team's member-invite setting for members.
    /// Admins and above dispatch immediately; member invitations wait for an admin.
    pub async fn create_invitation(
        &self,
        acting: &ActingContext,
        email: &str,
        proposed_role: Role,
    ) -> AuthzResult<PendingInvitation> {
        let email = email.trim().to_ascii_lowercase();
        if !is_plausible_email(&email) {
            return Err(AuthzError::validation(format!("Invalid email address '{}'", email)));
        }
        if !acting.role.can_assign(proposed_role) {
            return Err(AuthzError::unauthorized(format!(
                "A {} cannot invite a {}",
                acting.role, proposed_role
            )));
        }

        let capabilities = self
            .capabilities
            .effective_capabilities(acting.role, acting.org_id)
            .await?;
        if !capabilities.is_resolved() {
            return Err(AuthzError::unauthorized("Capabilities could not be resolved"));
        }
        if !capabilities.has(&keys::TEAM_INVITE) {
            let allowed_by_team = !acting.role.is_admin_or_above()
                && self
                    .team_settings
                    .get_team_settings(acting.org_id)
                    .await?
                    .allow_member_invites;
            if !allowed_by_team {
                return Err(AuthzError::unauthorized(format!(
                    "Missing capability '{}' to send invitations",
                    keys::TEAM_INVITE
                )));
            }
        }

        self.tiers
            .ensure_within_limit(acting.org_id, UsageResource::TeamMembers)
            .await?;

        let invitation = self
            .store
            .insert_invitation(NewInvitation {
                email,
                proposed_role,
                invited_by: acting.user_id,
                org_id: acting.org_id,
                expires_at: Utc::now() + Duration::days(self.config.invitations.expiry_days),
            })
            .await?;
        tracing::info!(
            "Invitation {} created for {} as {} in org {}",
            invitation.id,
            invitation.email,
            proposed_role,
            acting.org_id
        );

        if !acting.role.is_admin_or_above() {
            return Ok(invitation);
        }

        self.approve_invitation(invitation.id, acting).await?;
        self.store
            .find_invitation(invitation.id)
            .await?
            .ok_or_else(|| AuthzError::not_found(NOT_FOUND))
    }

    pub async fn approve_invitation(
        &self,
        invitation_id: Uuid,
        acting: &ActingContext,
    ) -> AuthzResult<ApprovedInvitation> {
        let invitation = self.load_pending(invitation_id).await?;
        self.check_ownership(&invitation, acting).await?;

        let now = Utc::now();
        if invitation.is_past_expiry(now) {
            // Persisted even though the approval fails.
            if self.store.mark_invitation_expired(invitation.id).await? {
                tracing::info!("Invitation {} expired at {}", invitation.id, invitation.expires_at);
            }
            return Err(AuthzError::Expired("Invitation has expired".to_string()));
        }

        acting.require_admin()?;
        self.require_any_capability(acting, &RESOLVE_CAPABILITIES).await?;

        let redirect_url = self.config.invite_redirect_url(&acting.subdomain);
        let metadata = json!({
            "invitation_id": invitation.id,
            "org_id": invitation.org_id,
            "subdomain": acting.subdomain,
            "user_role": invitation.proposed_role,
            "invited_by": invitation.invited_by,
        });
        self.sender
            .send_invite(&invitation.email, &redirect_url, &metadata)
            .await
            .map_err(|e| {
                tracing::error!("Invite dispatch for {} failed: {}", invitation.id, e);
                AuthzError::Transport(format!("Failed to send invitation email: {}", e))
            })?;

        if !self
            .store
            .mark_invitation_approved(invitation.id, acting.user_id, now)
            .await?
        {
            return Err(AuthzError::not_found(NOT_FOUND));
        }

        tracing::info!("Invitation {} approved by {}", invitation.id, acting.user_id);
        self.audit
            .record(
                acting.org_id,
                Some(acting.user_id),
                "invitation_approved",
                json!({ "invitation_id": invitation.id, "email": invitation.email }),
            )
            .await;

        Ok(ApprovedInvitation {
            id: invitation.id,
            email: invitation.email,
        })
    }

    pub async fn reject_invitation(
        &self,
        invitation_id: Uuid,
        acting: &ActingContext,
        reason: Option<String>,
    ) -> AuthzResult<()> {
        let invitation = self.load_pending(invitation_id).await?;
        self.check_ownership(&invitation, acting).await?;
        acting.require_admin()?;
        self.require_any_capability(acting, &RESOLVE_CAPABILITIES).await?;

        let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
        if !self
            .store
            .mark_invitation_rejected(invitation.id, acting.user_id, Utc::now(), reason.clone())
            .await?
        {
            return Err(AuthzError::not_found(NOT_FOUND));
        }

        tracing::info!("Invitation {} rejected by {}", invitation.id, acting.user_id);
        self.audit
            .record(
                acting.org_id,
                Some(acting.user_id),
                "invitation_rejected",
                json!({ "invitation_id": invitation.id, "reason": reason }),
            )
            .await;
        Ok(())
    }

    /// Pending rows for the acting organization, with lapsed ones reported as expired.
    pub async fn list_pending_invitations(&self, acting: &ActingContext) -> AuthzResult<Vec<PendingInvitation>> {
        acting.require_admin()?;
        let now = Utc::now();
        let rows = self
            .store
            .list_invitations(acting.org_id, Some(InvitationStatus::Pending))
            .await?;
        Ok(rows
            .into_iter()
            .map(|mut row| {
                row.status = row.effective_status(now);
                row
            })
            .collect())
    }

    /// Fails closed when the set cannot be resolved.
    async fn require_any_capability(&self, acting: &ActingContext, required: &[CapabilityKey]) -> AuthzResult<()> {
        let capabilities = self
            .capabilities
            .effective_capabilities(acting.role, acting.org_id)
            .await?;
        if capabilities.has_any(required) {
            return Ok(());
        }
        let names: Vec<String> = required.iter().map(|k| k.to_string()).collect();
        Err(AuthzError::unauthorized(format!(
            "Requires one of: {}",
            names.join(", ")
        )))
    }

    async fn load_pending(&self, invitation_id: Uuid) -> AuthzResult<PendingInvitation> {
        match self.store.find_invitation(invitation_id).await? {
            Some(row) if row.status == InvitationStatus::Pending => Ok(row),
            _ => Err(AuthzError::not_found(NOT_FOUND)),
        }
    }

    /// Both the organization and its tenant subdomain must match the actor.
    async fn check_ownership(&self, invitation: &PendingInvitation, acting: &ActingContext) -> AuthzResult<()> {
        let denied = || AuthzError::unauthorized("Invitation does not belong to this organization");
        if invitation.org_id != acting.org_id {
            return Err(denied());
        }
        let tenant = self
            .store
            .find_tenant_by_org(invitation.org_id)
            .await?
            .ok_or_else(denied)?;
        if !tenant.subdomain.eq_ignore_ascii_case(&acting.subdomain) {
            return Err(denied());
        }
        Ok(())
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape() {
        assert!(is_plausible_email("new@acme.test"));
        assert!(!is_plausible_email("new"));
        assert!(!is_plausible_email("@acme.test"));
        assert!(!is_plausible_email("new@localhost"));
    }
}
