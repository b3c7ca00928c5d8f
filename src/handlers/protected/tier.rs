use axum::{
    extract::{Path, State},
    Extension,
};

use crate::middleware::{ApiResponse, ApiResult};
use crate::server::AppState;
use crate::services::{ActingContext, TierInfo, UsageResource, UsageResult};

/// GET /api/tier
pub async fn tier_get(
    State(state): State<AppState>,
    Extension(acting): Extension<ActingContext>,
) -> ApiResult<TierInfo> {
    Ok(ApiResponse::success(state.tiers.get_tier_info(acting.org_id).await?))
}

/// GET /api/usage/:resource - `projects` or `team_members`
pub async fn usage_get(
    State(state): State<AppState>,
    Extension(acting): Extension<ActingContext>,
    Path(resource): Path<String>,
) -> ApiResult<UsageResult> {
    let resource: UsageResource = resource.parse()?;
    let usage = state.tiers.check_usage_limit(acting.org_id, resource).await?;
    Ok(ApiResponse::success(usage))
}
