use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::server::AppState;

/// Resolve the request host into a `TenantContext` request extension.
pub async fn resolve_host_middleware(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| request.uri().authority().map(|a| a.to_string()));
    let url = request.uri().to_string();

    let context = state.resolver.resolve(&url, host.as_deref());
    tracing::debug!("Host {:?} resolved to {:?}", host, context);

    request.extensions_mut().insert(context);
    next.run(request).await
}
