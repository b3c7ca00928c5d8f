//! Maps an incoming request host to a tenant context.

use serde::{Deserialize, Serialize};

use crate::config::DomainConfig;

/// Which surface a request is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "subdomain", rename_all = "snake_case")]
pub enum TenantContext {
    Marketing,
    AppRoot,
    Tenant(String),
    PreviewTenant(String),
}

impl TenantContext {
    pub fn subdomain(&self) -> Option<&str> {
        match self {
            TenantContext::Tenant(s) | TenantContext::PreviewTenant(s) => Some(s),
            TenantContext::Marketing | TenantContext::AppRoot => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HostResolver {
    app_root: String,
    marketing_root: String,
    preview_suffix: String,
}

impl HostResolver {
    pub fn new(app_root: &str, marketing_root: &str, preview_suffix: &str) -> Self {
        Self {
            app_root: strip_port(app_root.trim()).to_ascii_lowercase(),
            marketing_root: strip_port(marketing_root.trim()).to_ascii_lowercase(),
            preview_suffix: preview_suffix.trim().to_ascii_lowercase(),
        }
    }

    pub fn from_config(domains: &DomainConfig) -> Self {
        Self::new(&domains.app_root_domain, &domains.marketing_root_domain, &domains.preview_suffix)
    }

    /// Resolve a request. `request_url` may be absolute or just a path; the host
    /// header is used for everything except the loopback label lookup.
    ///
    /// First match wins: loopback, preview deployment, marketing, app root,
    /// tenant subdomain, otherwise app root.
    pub fn resolve(&self, request_url: &str, host_header: Option<&str>) -> TenantContext {
        let host = host_header.map(str::trim).unwrap_or("");
        let hostname = strip_port(host);
        let lower = hostname.to_ascii_lowercase();
        let url_lower = request_url.to_ascii_lowercase();

        // 1. Local development
        if is_loopback(&url_lower) || is_loopback(&lower) {
            return loopback_label(request_url)
                .or_else(|| loopback_host_label(hostname).map(str::to_string))
                .map(TenantContext::Tenant)
                .unwrap_or(TenantContext::AppRoot);
        }

        if lower.is_empty() {
            return TenantContext::AppRoot;
        }

        // 2. Preview deployments: <tenant>---<project>.<preview suffix>
        if !self.preview_suffix.is_empty() && lower.ends_with(&self.preview_suffix) {
            if let Some(idx) = lower.find("---") {
                let label = &hostname[..idx];
                if !label.is_empty() {
                    return TenantContext::PreviewTenant(label.to_string());
                }
            }
        }

        // 3. Marketing domain and anything beneath it
        if self.is_marketing_host(&lower) {
            return TenantContext::Marketing;
        }

        // 4. App root
        if lower == self.app_root || lower.strip_prefix("www.") == Some(self.app_root.as_str()) {
            return TenantContext::AppRoot;
        }

        // 5. Tenant subdomain of the app root
        if has_dot_suffix(&lower, &self.app_root) {
            let prefix = &hostname[..hostname.len() - self.app_root.len() - 1];
            return TenantContext::Tenant(prefix.to_string());
        }

        // 6. Unknown hosts never become tenants
        tracing::debug!("Unrecognized host '{}', treating as app root", hostname);
        TenantContext::AppRoot
    }

    fn is_marketing_host(&self, lower: &str) -> bool {
        if self.marketing_root.is_empty() {
            return false;
        }
        // When the app root sits under the marketing root (app.example.com
        // under example.com), the more specific app root owns its subtree.
        if self.app_root_nested_in_marketing()
            && (lower == self.app_root || has_dot_suffix(lower, &self.app_root))
        {
            return false;
        }
        lower == self.marketing_root
            || lower.strip_prefix("www.") == Some(self.marketing_root.as_str())
            || has_dot_suffix(lower, &self.marketing_root)
    }

    fn app_root_nested_in_marketing(&self) -> bool {
        has_dot_suffix(&self.app_root, &self.marketing_root)
    }
}

fn is_loopback(value: &str) -> bool {
    value.contains("localhost") || value.contains("127.0.0.1")
}

/// `http://acme.localhost:3000/...` -> `acme`. Relative URLs have no host.
fn loopback_label(request_url: &str) -> Option<String> {
    let url = url::Url::parse(request_url).ok()?;
    let (label, rest) = url.host_str()?.split_once('.')?;
    if label.is_empty() || rest != "localhost" {
        return None;
    }
    Some(label.to_string())
}

/// Host header form: `acme.localhost` -> `acme`
fn loopback_host_label(hostname: &str) -> Option<&str> {
    if !hostname.to_ascii_lowercase().contains(".localhost") {
        return None;
    }
    hostname.split('.').next().filter(|label| !label.is_empty())
}

fn has_dot_suffix(host: &str, domain: &str) -> bool {
    !domain.is_empty()
        && host.len() > domain.len() + 1
        && host.ends_with(domain)
        && host.as_bytes()[host.len() - domain.len() - 1] == b'.'
}

/// Drop a trailing `:port`, including bracketed IPv6 literals.
pub fn strip_port(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        return match rest.find(']') {
            Some(end) => &host[..end + 2],
            None => host,
        };
    }
    match host.rsplit_once(':') {
        Some((name, port)) if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> HostResolver {
        HostResolver::new("app.example.com", "marketing-root.com", ".vercel.app")
    }

    fn host(h: &str) -> TenantContext {
        resolver().resolve("/dashboard", Some(h))
    }

    #[test]
    fn tenant_subdomain_of_app_root() {
        assert_eq!(host("acme.app.example.com"), TenantContext::Tenant("acme".into()));
        assert_eq!(host("acme.app.example.com:443"), TenantContext::Tenant("acme".into()));
    }

    #[test]
    fn app_root_and_www_variant() {
        assert_eq!(host("app.example.com"), TenantContext::AppRoot);
        assert_eq!(host("www.app.example.com"), TenantContext::AppRoot);
    }

    #[test]
    fn marketing_hosts_are_never_tenants() {
        assert_eq!(host("marketing-root.com"), TenantContext::Marketing);
        assert_eq!(host("www.marketing-root.com"), TenantContext::Marketing);
        assert_eq!(host("sub.marketing-root.com"), TenantContext::Marketing);
        assert_eq!(host("acme.marketing-root.com:8080"), TenantContext::Marketing);
    }

    #[test]
    fn comparison_ignores_case_but_keeps_extracted_label() {
        assert_eq!(host("Acme.APP.Example.com"), TenantContext::Tenant("Acme".into()));
        assert_eq!(host("SUB.Marketing-Root.com"), TenantContext::Marketing);
    }

    #[test]
    fn preview_deployments() {
        assert_eq!(
            host("acme---saas-web.vercel.app"),
            TenantContext::PreviewTenant("acme".into())
        );
        // no triple dash: not a tenant preview
        assert_eq!(host("saas-web.vercel.app"), TenantContext::AppRoot);
    }

    #[test]
    fn loopback_label_from_url_then_host() {
        let r = resolver();
        assert_eq!(
            r.resolve("http://acme.localhost:3000/dashboard", Some("acme.localhost:3000")),
            TenantContext::Tenant("acme".into())
        );
        assert_eq!(
            r.resolve("/dashboard", Some("beta.localhost:3000")),
            TenantContext::Tenant("beta".into())
        );
        assert_eq!(r.resolve("/", Some("localhost:3000")), TenantContext::AppRoot);
        // A label in the path is not a host label.
        assert_eq!(
            r.resolve("http://localhost:3000/acme.localhost", Some("localhost:3000")),
            TenantContext::AppRoot
        );
        assert_eq!(
            r.resolve("http://localhost:3000/", Some("gamma.localhost:3000")),
            TenantContext::Tenant("gamma".into())
        );
        assert_eq!(r.resolve("/", Some("127.0.0.1:3000")), TenantContext::AppRoot);
    }

    #[test]
    fn unknown_hosts_default_to_app_root() {
        assert_eq!(host("evil.example.org"), TenantContext::AppRoot);
        assert_eq!(host("notapp.example.com"), TenantContext::AppRoot);
        assert_eq!(resolver().resolve("/", None), TenantContext::AppRoot);
    }

    #[test]
    fn app_root_nested_under_marketing_root() {
        let r = HostResolver::new("app.example.com", "example.com", ".vercel.app");
        assert_eq!(r.resolve("/", Some("example.com")), TenantContext::Marketing);
        assert_eq!(r.resolve("/", Some("blog.example.com")), TenantContext::Marketing);
        assert_eq!(r.resolve("/", Some("app.example.com")), TenantContext::AppRoot);
        assert_eq!(
            r.resolve("/", Some("acme.app.example.com")),
            TenantContext::Tenant("acme".into())
        );
    }

    #[test]
    fn every_non_www_prefix_resolves_to_tenant() {
        for prefix in ["a", "acme", "acme-co", "x1", "team-42"] {
            let h = format!("{}.app.example.com", prefix);
            assert_eq!(host(&h), TenantContext::Tenant(prefix.to_string()));
        }
    }

    #[test]
    fn strips_ports() {
        assert_eq!(strip_port("example.com:8080"), "example.com");
        assert_eq!(strip_port("example.com"), "example.com");
        assert_eq!(strip_port("[::1]:3000"), "[::1]");
    }
}
