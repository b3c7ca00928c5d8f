use clap::Args;
use uuid::Uuid;

use crate::authz::Role;
use crate::cli::utils::output_list;
use crate::cli::{connect, OutputFormat};

#[derive(Args)]
pub struct CapabilitiesArgs {
    #[arg(long, help = "Role: owner, superadmin, admin, member or view-only")]
    pub role: Role,

    #[arg(long, help = "Organization id")]
    pub org: Uuid,
}

pub async fn handle(args: CapabilitiesArgs, memory: bool, output_format: OutputFormat) -> anyhow::Result<()> {
    let state = connect(memory).await?;
    let effective = state
        .capabilities
        .effective_capabilities(args.role, args.org)
        .await?;

    if !effective.is_resolved() {
        anyhow::bail!("Organization {} not found", args.org);
    }

    let keys: Vec<_> = effective.into_set().into_iter().collect();
    output_list(&output_format, &keys, "No capabilities", |key| key.to_string())
}
