use clap::Args;
use uuid::Uuid;

use crate::cli::utils::{format_limit, output_value};
use crate::cli::{connect, OutputFormat};
use crate::services::UsageResource;

#[derive(Args)]
pub struct TierArgs {
    #[arg(long, help = "Organization id")]
    pub org: Uuid,
}

#[derive(Args)]
pub struct UsageArgs {
    #[arg(long, help = "Organization id")]
    pub org: Uuid,

    #[arg(help = "projects or team_members")]
    pub resource: String,
}

pub async fn handle_tier(args: TierArgs, memory: bool, output_format: OutputFormat) -> anyhow::Result<()> {
    let state = connect(memory).await?;
    let info = state.tiers.get_tier_info(args.org).await?;

    let text = format!(
        "{} (business+: {}, active: {})\n  team members: {}\n  projects: {}\n  custom permissions: {}",
        info.tier_name,
        info.is_business_plus,
        info.subscription_active,
        format_limit(info.limits.max_team_members),
        format_limit(info.limits.max_projects),
        info.limits.allows_custom_permissions,
    );
    output_value(&output_format, &info, &text)
}

pub async fn handle_usage(args: UsageArgs, memory: bool, output_format: OutputFormat) -> anyhow::Result<()> {
    let resource: UsageResource = args.resource.parse()?;
    let state = connect(memory).await?;
    let usage = state.tiers.check_usage_limit(args.org, resource).await?;

    let text = format!(
        "{}: {}/{}{}",
        usage.resource,
        usage.current,
        format_limit(usage.limit),
        if usage.reached { " (limit reached)" } else { "" }
    );
    output_value(&output_format, &usage, &text)
}
