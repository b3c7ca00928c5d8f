pub mod commands;
pub mod utils;

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::authz::DefaultCapabilities;
use crate::config::{AppConfig, Environment};
use crate::database::{DatabaseManager, MemoryStore, PgStore, Store};
use crate::server::AppState;
use crate::services::{HttpInviteSender, InviteSender, LogInviteSender};

#[derive(Parser)]
#[command(name = "gatectl")]
#[command(about = "gatectl - inspect tenant resolution, capabilities, tiers and invitations")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(long, global = true, help = "Use an empty in-memory store instead of DATABASE_URL")]
    pub memory: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Resolve a request host to its tenant context")]
    Host(commands::host::HostArgs),

    #[command(about = "Show the effective capabilities of a role in an organization")]
    Capabilities(commands::capabilities::CapabilitiesArgs),

    #[command(about = "Show an organization's subscription tier and limits")]
    Tier(commands::tier::TierArgs),

    #[command(about = "Check an organization's usage against its tier limit")]
    Usage(commands::tier::UsageArgs),

    #[command(about = "Approve or reject pending invitations")]
    Invitation {
        #[command(subcommand)]
        cmd: commands::invitation::InvitationCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Services wired against either Postgres or the in-memory store.
pub async fn connect(memory: bool) -> anyhow::Result<AppState> {
    let config = Arc::new(AppConfig::from_env());

    let store: Arc<dyn Store> = if memory {
        Arc::new(MemoryStore::new())
    } else {
        let pool = DatabaseManager::connect(&config.database)
            .await
            .context("connecting to DATABASE_URL (use --memory to skip)")?;
        Arc::new(PgStore::new(pool))
    };

    let defaults = match &config.capabilities_file {
        Some(path) => DefaultCapabilities::load(path)?,
        None => DefaultCapabilities::builtin(),
    };

    let sender: Arc<dyn InviteSender> = match HttpInviteSender::from_config(&config.invitations) {
        Ok(sender) => Arc::new(sender),
        Err(_) if memory || matches!(config.environment, Environment::Development) => Arc::new(LogInviteSender),
        Err(e) => return Err(e.into()),
    };

    Ok(AppState::new(store, config, sender, defaults))
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Host(args) => commands::host::handle(args, output_format),
        Commands::Capabilities(args) => commands::capabilities::handle(args, cli.memory, output_format).await,
        Commands::Tier(args) => commands::tier::handle_tier(args, cli.memory, output_format).await,
        Commands::Usage(args) => commands::tier::handle_usage(args, cli.memory, output_format).await,
        Commands::Invitation { cmd } => commands::invitation::handle(cmd, cli.memory, output_format).await,
    }
}
