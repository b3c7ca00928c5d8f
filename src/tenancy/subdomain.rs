use crate::authz::error::AuthzError;

pub const MIN_SUBDOMAIN_LEN: usize = 3;
pub const MAX_SUBDOMAIN_LEN: usize = 63;

/// Labels that would collide with platform hosts.
pub const RESERVED_SUBDOMAINS: &[&str] = &[
    "www", "app", "api", "admin", "mail", "auth", "dashboard", "status", "support", "help", "docs",
    "blog", "static", "cdn",
];

/// Case-normalized form used wherever two subdomains are compared.
pub fn normalize_subdomain(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

/// Check a proposed tenant subdomain: lowercase `[a-z0-9]([a-z0-9-]*[a-z0-9])?`
/// within the length bounds and not reserved.
pub fn validate_subdomain(raw: &str) -> Result<(), AuthzError> {
    let len = raw.len();
    if !(MIN_SUBDOMAIN_LEN..=MAX_SUBDOMAIN_LEN).contains(&len) {
        return Err(AuthzError::InvalidSubdomain(format!(
            "must be between {} and {} characters",
            MIN_SUBDOMAIN_LEN, MAX_SUBDOMAIN_LEN
        )));
    }

    if !raw
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(AuthzError::InvalidSubdomain(
            "only lowercase letters, digits and hyphens are allowed".to_string(),
        ));
    }

    if raw.starts_with('-') || raw.ends_with('-') {
        return Err(AuthzError::InvalidSubdomain(
            "cannot start or end with a hyphen".to_string(),
        ));
    }

    if raw.contains("---") {
        // reserved for preview deployment hosts
        return Err(AuthzError::InvalidSubdomain(
            "cannot contain three consecutive hyphens".to_string(),
        ));
    }

    if RESERVED_SUBDOMAINS.contains(&raw) {
        return Err(AuthzError::InvalidSubdomain(format!("'{}' is reserved", raw)));
    }

    Ok(())
}
