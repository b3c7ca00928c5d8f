use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use super::auth::lookup_claims;
use crate::authz::{guard_claims_lookup, log_denial, AuthzError, Denial, GuardResult};
use crate::error::ApiError;
use crate::server::AppState;
use crate::services::ActingContext;
use crate::tenancy::TenantContext;

/// Guard for tenant-protected routes.
///
/// Runs after host resolution: the session must belong to the tenant the
/// request is addressed to and must not predate a force logout. On success the
/// verified `SessionClaims` and an `ActingContext` are added to the request.
pub async fn tenant_guard_middleware(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let expected = request
        .extensions()
        .get::<TenantContext>()
        .and_then(|ctx| ctx.subdomain())
        .unwrap_or_default()
        .to_string();
    let path = request.uri().path().to_string();

    let lookup = lookup_claims(request.headers(), &state.config.security.jwt_secret);
    let claims = match guard_claims_lookup(lookup, &expected, &[]) {
        GuardResult::Allowed(claims) => claims,
        GuardResult::Denied(denial) => return deny(&state, request.headers(), denial, &expected, &path),
    };

    if let Err(err) = state.sessions.verify_fresh(&claims).await {
        let denial = match err {
            AuthzError::NoSession => Denial::NoSession,
            other => Denial::Error {
                message: other.to_string(),
            },
        };
        return deny(&state, request.headers(), denial, &expected, &path);
    }

    let acting = ActingContext::from(&claims);
    request.extensions_mut().insert(claims);
    request.extensions_mut().insert(acting);
    next.run(request).await
}

fn deny(state: &AppState, headers: &HeaderMap, denial: Denial, expected: &str, path: &str) -> Response {
    log_denial(&denial, expected, path);
    if wants_html(headers) {
        return Redirect::temporary(&state.config.security.fallback_redirect).into_response();
    }
    ApiError::from(AuthzError::from(denial)).into_response()
}

fn wants_html(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|accept| accept.contains("text/html"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn browser_requests_are_detected_by_accept() {
        let mut headers = HeaderMap::new();
        assert!(!wants_html(&headers));
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml"),
        );
        assert!(wants_html(&headers));
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        assert!(!wants_html(&headers));
    }
}
