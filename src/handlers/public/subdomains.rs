use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::database::models::SubdomainReservation;
use crate::middleware::{ApiResponse, ApiResult};
use crate::server::AppState;
use crate::services::Availability;
use crate::tenancy::normalize_subdomain;

#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub subdomain: String,
    pub available: bool,
    #[serde(flatten)]
    pub availability: Availability,
}

#[derive(Debug, Deserialize)]
pub struct ReserveRequest {
    pub subdomain: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ExtendRequest {
    pub email: String,
}

/// GET /auth/subdomains/:subdomain
pub async fn subdomain_availability(
    State(state): State<AppState>,
    Path(subdomain): Path<String>,
) -> ApiResult<AvailabilityResponse> {
    let availability = state.reservations.check_availability(&subdomain).await?;
    Ok(ApiResponse::success(AvailabilityResponse {
        subdomain: normalize_subdomain(&subdomain),
        available: availability.is_available(),
        availability,
    }))
}

/// POST /auth/subdomains
pub async fn subdomain_reserve(
    State(state): State<AppState>,
    Json(body): Json<ReserveRequest>,
) -> ApiResult<SubdomainReservation> {
    let reservation = state.reservations.reserve(&body.subdomain, &body.email).await?;
    Ok(ApiResponse::created(reservation))
}

/// PUT /auth/subdomains/:subdomain/extend - called when the verification email is resent
pub async fn subdomain_extend(
    State(state): State<AppState>,
    Path(subdomain): Path<String>,
    Json(body): Json<ExtendRequest>,
) -> ApiResult<SubdomainReservation> {
    let reservation = state.reservations.extend(&subdomain, &body.email).await?;
    Ok(ApiResponse::success(reservation))
}
