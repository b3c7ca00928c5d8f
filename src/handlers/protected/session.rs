use axum::Extension;

use crate::auth::SessionClaims;
use crate::middleware::{ApiResponse, ApiResult};

/// GET /api/session - the verified claims for this request
pub async fn session_get(Extension(claims): Extension<SessionClaims>) -> ApiResult<SessionClaims> {
    Ok(ApiResponse::success(claims))
}
