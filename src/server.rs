use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::authz::DefaultCapabilities;
use crate::config::AppConfig;
use crate::database::Store;
use crate::handlers::{protected, public};
use crate::middleware::{resolve_host_middleware, tenant_guard_middleware};
use crate::services::{
    AuditLog, CapabilityService, InvitationService, InviteSender, ReservationService, SessionService,
    TeamSettingsService, TierService,
};
use crate::tenancy::HostResolver;

/// Shared per-process state; every request gets a cheap clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
    pub resolver: Arc<HostResolver>,
    pub sessions: SessionService,
    pub capabilities: CapabilityService,
    pub tiers: TierService,
    pub team_settings: TeamSettingsService,
    pub invitations: InvitationService,
    pub reservations: ReservationService,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        config: Arc<AppConfig>,
        sender: Arc<dyn InviteSender>,
        defaults: DefaultCapabilities,
    ) -> Self {
        let audit = AuditLog::new(store.clone(), config.security.enable_audit_logging);
        let tiers = TierService::new(store.clone());
        let team_settings = TeamSettingsService::new(store.clone(), tiers.clone(), audit.clone());
        let capabilities =
            CapabilityService::new(store.clone(), Arc::new(defaults), tiers.clone(), audit.clone());
        let invitations = InvitationService::new(
            store.clone(),
            sender,
            config.clone(),
            tiers.clone(),
            team_settings.clone(),
            capabilities.clone(),
            audit.clone(),
        );

        Self {
            resolver: Arc::new(HostResolver::from_config(&config.domains)),
            sessions: SessionService::new(store.clone(), audit),
            reservations: ReservationService::new(store.clone(), config.reservations.hold_hours),
            capabilities,
            tiers,
            team_settings,
            invitations,
            store,
            config,
        }
    }
}

pub fn app(state: AppState) -> Router {
    let mut router = Router::new()
        .merge(public_routes())
        .merge(protected_routes(state.clone()))
        .layer(middleware::from_fn_with_state(state.clone(), resolve_host_middleware))
        .layer(TraceLayer::new_for_http());

    if state.config.security.enable_cors {
        router = router.layer(CorsLayer::permissive());
    }

    router.with_state(state)
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(public::health))
        .route("/api/context", get(public::context))
        .route("/auth/subdomains", post(public::subdomain_reserve))
        .route("/auth/subdomains/:subdomain", get(public::subdomain_availability))
        .route("/auth/subdomains/:subdomain/extend", put(public::subdomain_extend))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/session", get(protected::session_get))
        .route("/api/capabilities", get(protected::capabilities_get))
        .route(
            "/api/capabilities/overrides",
            put(protected::capability_override_put).delete(protected::capability_override_delete),
        )
        .route("/api/tier", get(protected::tier_get))
        .route("/api/usage/:resource", get(protected::usage_get))
        .route(
            "/api/team/settings",
            get(protected::team_settings_get).put(protected::team_settings_put),
        )
        .route(
            "/api/invitations",
            get(protected::invitations_list).post(protected::invitation_create),
        )
        .route("/api/invitations/:id/approve", post(protected::invitation_approve))
        .route("/api/invitations/:id/reject", post(protected::invitation_reject))
        .route("/api/organization/force-logout", post(protected::force_logout))
        .route_layer(middleware::from_fn_with_state(state, tenant_guard_middleware))
}
