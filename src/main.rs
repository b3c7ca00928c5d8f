use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use tenant_gate::authz::DefaultCapabilities;
use tenant_gate::config::{self, Environment};
use tenant_gate::database::{DatabaseManager, PgStore};
use tenant_gate::server::{app, AppState};
use tenant_gate::services::{HttpInviteSender, InviteSender, LogInviteSender};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Arc::new(config::config().clone());
    tracing::info!("Starting tenant-gate in {:?} mode", config.environment);

    if config.security.jwt_secret.is_empty() {
        anyhow::bail!("JWT_SECRET must be set");
    }

    let pool = DatabaseManager::connect(&config.database).await?;
    let store = Arc::new(PgStore::new(pool));

    let defaults = match &config.capabilities_file {
        Some(path) => {
            tracing::info!("Loading capability defaults from {}", path);
            DefaultCapabilities::load(path)?
        }
        None => DefaultCapabilities::builtin(),
    };

    let sender: Arc<dyn InviteSender> = match HttpInviteSender::from_config(&config.invitations) {
        Ok(sender) => Arc::new(sender),
        Err(_) if matches!(config.environment, Environment::Development) => {
            tracing::warn!("AUTH_ADMIN_URL/AUTH_SERVICE_KEY not set, invites will only be logged");
            Arc::new(LogInviteSender)
        }
        Err(e) => return Err(e).context("invite dispatch requires AUTH_ADMIN_URL and AUTH_SERVICE_KEY"),
    };

    let state = AppState::new(store, config.clone(), sender, defaults);

    // Allow tests or deployments to override port via env
    let port = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("tenant-gate listening on http://{}", bind_addr);
    axum::serve(listener, app(state)).await?;
    Ok(())
}
