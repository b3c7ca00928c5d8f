use clap::Args;

use crate::cli::utils::output_value;
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::tenancy::{HostResolver, TenantContext};

#[derive(Args)]
pub struct HostArgs {
    #[arg(help = "Host header value, e.g. acme.app.example.com:443")]
    pub host: String,

    #[arg(long, default_value = "/", help = "Request URL or path")]
    pub url: String,
}

pub fn handle(args: HostArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let config = AppConfig::from_env();
    let resolver = HostResolver::from_config(&config.domains);
    let context = resolver.resolve(&args.url, Some(&args.host));

    let text = match &context {
        TenantContext::Marketing => "marketing".to_string(),
        TenantContext::AppRoot => "app root".to_string(),
        TenantContext::Tenant(subdomain) => format!("tenant {}", subdomain),
        TenantContext::PreviewTenant(subdomain) => format!("preview tenant {}", subdomain),
    };
    output_value(&output_format, &context, &text)
}
