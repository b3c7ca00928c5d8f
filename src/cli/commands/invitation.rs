use anyhow::Context;
use clap::Subcommand;
use serde_json::json;
use uuid::Uuid;

use crate::cli::utils::output_success;
use crate::cli::{connect, OutputFormat};
use crate::server::AppState;
use crate::services::ActingContext;

#[derive(Subcommand)]
pub enum InvitationCommands {
    #[command(about = "Approve a pending invitation and send the invite email")]
    Approve {
        #[arg(help = "Invitation id")]
        id: Uuid,

        #[arg(long = "as", help = "User id of the approving admin")]
        acting_user: Uuid,
    },

    #[command(about = "Reject a pending invitation")]
    Reject {
        #[arg(help = "Invitation id")]
        id: Uuid,

        #[arg(long = "as", help = "User id of the rejecting admin")]
        acting_user: Uuid,

        #[arg(long, help = "Reason recorded with the rejection")]
        reason: Option<String>,
    },
}

pub async fn handle(cmd: InvitationCommands, memory: bool, output_format: OutputFormat) -> anyhow::Result<()> {
    let state = connect(memory).await?;

    match cmd {
        InvitationCommands::Approve { id, acting_user } => {
            let acting = acting_context(&state, acting_user).await?;
            let approved = state.invitations.approve_invitation(id, &acting).await?;
            output_success(
                &output_format,
                &format!("Invitation sent to {}", approved.email),
                Some(json!(approved)),
            )
        }
        InvitationCommands::Reject {
            id,
            acting_user,
            reason,
        } => {
            let acting = acting_context(&state, acting_user).await?;
            state.invitations.reject_invitation(id, &acting, reason).await?;
            output_success(&output_format, "Invitation rejected", Some(json!({ "id": id })))
        }
    }
}

/// Operators act as a real user, resolved from their profile and tenant rows.
async fn acting_context(state: &AppState, user_id: Uuid) -> anyhow::Result<ActingContext> {
    let profile = state
        .store
        .find_profile(user_id)
        .await?
        .with_context(|| format!("no profile for user {}", user_id))?;
    let tenant = state
        .store
        .find_tenant_by_org(profile.org_id)
        .await?
        .with_context(|| format!("organization {} has no tenant", profile.org_id))?;

    Ok(ActingContext {
        user_id,
        email: profile.email,
        org_id: profile.org_id,
        subdomain: tenant.subdomain,
        role: profile.role,
    })
}
