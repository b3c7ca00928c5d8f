use axum::{extract::State, Extension, Json};

use crate::database::models::{TeamSettings, TeamSettingsPatch};
use crate::middleware::{ApiResponse, ApiResult};
use crate::server::AppState;
use crate::services::ActingContext;

/// GET /api/team/settings
pub async fn team_settings_get(
    State(state): State<AppState>,
    Extension(acting): Extension<ActingContext>,
) -> ApiResult<TeamSettings> {
    let settings = state.team_settings.get_team_settings(acting.org_id).await?;
    Ok(ApiResponse::success(settings))
}

/// PUT /api/team/settings
pub async fn team_settings_put(
    State(state): State<AppState>,
    Extension(acting): Extension<ActingContext>,
    Json(patch): Json<TeamSettingsPatch>,
) -> ApiResult<TeamSettings> {
    let settings = state.team_settings.update_team_settings(&acting, &patch).await?;
    Ok(ApiResponse::success(settings))
}
