use axum::{extract::State, Extension};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::middleware::{ApiResponse, ApiResult};
use crate::server::AppState;
use crate::services::ActingContext;

#[derive(Debug, Serialize)]
pub struct ForceLogoutResponse {
    pub force_logout_after: DateTime<Utc>,
}

/// POST /api/organization/force-logout - invalidate every outstanding session
pub async fn force_logout(
    State(state): State<AppState>,
    Extension(acting): Extension<ActingContext>,
) -> ApiResult<ForceLogoutResponse> {
    let cutoff = state.sessions.force_logout(&acting).await?;
    Ok(ApiResponse::success(ForceLogoutResponse {
        force_logout_after: cutoff,
    }))
}
