use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};

use crate::authz::{CapabilityKey, CapabilityOverride, Role};
use crate::middleware::{ApiResponse, ApiResult};
use crate::server::AppState;
use crate::services::ActingContext;

#[derive(Debug, Serialize)]
pub struct CapabilitiesResponse {
    pub role: Role,
    pub resolved: bool,
    pub capabilities: Vec<CapabilityKey>,
}

#[derive(Debug, Deserialize)]
pub struct OverrideRequest {
    pub role: Role,
    pub capability: CapabilityKey,
    pub granted: bool,
}

#[derive(Debug, Deserialize)]
pub struct ClearOverrideRequest {
    pub role: Role,
    pub capability: CapabilityKey,
}

#[derive(Debug, Serialize)]
pub struct ClearOverrideResponse {
    pub removed: bool,
}

/// GET /api/capabilities - effective capabilities of the calling user
pub async fn capabilities_get(
    State(state): State<AppState>,
    Extension(acting): Extension<ActingContext>,
) -> ApiResult<CapabilitiesResponse> {
    let effective = state
        .capabilities
        .effective_capabilities(acting.role, acting.org_id)
        .await?;

    Ok(ApiResponse::success(CapabilitiesResponse {
        role: acting.role,
        resolved: effective.is_resolved(),
        capabilities: effective.into_set().into_iter().collect(),
    }))
}

/// PUT /api/capabilities/overrides
pub async fn capability_override_put(
    State(state): State<AppState>,
    Extension(acting): Extension<ActingContext>,
    Json(body): Json<OverrideRequest>,
) -> ApiResult<CapabilityOverride> {
    let row = state
        .capabilities
        .set_capability_override(&acting, body.role, body.capability, body.granted)
        .await?;
    Ok(ApiResponse::success(row))
}

/// DELETE /api/capabilities/overrides - restore the role default
pub async fn capability_override_delete(
    State(state): State<AppState>,
    Extension(acting): Extension<ActingContext>,
    Json(body): Json<ClearOverrideRequest>,
) -> ApiResult<ClearOverrideResponse> {
    let removed = state
        .capabilities
        .clear_capability_override(&acting, body.role, &body.capability)
        .await?;
    Ok(ApiResponse::success(ClearOverrideResponse { removed }))
}
