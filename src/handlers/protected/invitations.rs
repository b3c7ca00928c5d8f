use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::authz::Role;
use crate::database::models::PendingInvitation;
use crate::middleware::{ApiResponse, ApiResult};
use crate::server::AppState;
use crate::services::{ActingContext, ApprovedInvitation};

#[derive(Debug, Deserialize)]
pub struct CreateInvitationRequest {
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct RejectInvitationRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RejectedInvitation {
    pub id: Uuid,
    pub rejected: bool,
}

/// GET /api/invitations - pending invitations for this organization
pub async fn invitations_list(
    State(state): State<AppState>,
    Extension(acting): Extension<ActingContext>,
) -> ApiResult<Vec<PendingInvitation>> {
    let rows = state.invitations.list_pending_invitations(&acting).await?;
    Ok(ApiResponse::success(rows))
}

/// POST /api/invitations
pub async fn invitation_create(
    State(state): State<AppState>,
    Extension(acting): Extension<ActingContext>,
    Json(body): Json<CreateInvitationRequest>,
) -> ApiResult<PendingInvitation> {
    let invitation = state
        .invitations
        .create_invitation(&acting, &body.email, body.role)
        .await?;
    Ok(ApiResponse::created(invitation))
}

/// POST /api/invitations/:id/approve
pub async fn invitation_approve(
    State(state): State<AppState>,
    Extension(acting): Extension<ActingContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApprovedInvitation> {
    let approved = state.invitations.approve_invitation(id, &acting).await?;
    Ok(ApiResponse::success(approved))
}

/// POST /api/invitations/:id/reject - body is optional
pub async fn invitation_reject(
    State(state): State<AppState>,
    Extension(acting): Extension<ActingContext>,
    Path(id): Path<Uuid>,
    body: Option<Json<RejectInvitationRequest>>,
) -> ApiResult<RejectedInvitation> {
    let reason = body.and_then(|Json(body)| body.reason);
    state
        .invitations
        .reject_invitation(id, &acting, reason)
        .await?;
    Ok(ApiResponse::success(RejectedInvitation { id, rejected: true }))
}
