//! Decides whether a session may act inside a tenant.
//!
//! Checks short-circuit in a fixed order: session, then subdomain, then role.
//! Exactly one denial is reported per evaluation.

use serde::Serialize;

use super::error::AuthzError;
use super::role::Role;
use crate::auth::{ClaimsLookupError, SessionClaims};
use crate::tenancy::normalize_subdomain;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Denial {
    NoSession,
    WrongSubdomain { expected: String, actual: String },
    InsufficientRole { allowed: Vec<Role>, actual: Role },
    Error { message: String },
}

impl Denial {
    pub fn reason(&self) -> &'static str {
        match self {
            Denial::NoSession => "no_session",
            Denial::WrongSubdomain { .. } => "wrong_subdomain",
            Denial::InsufficientRole { .. } => "insufficient_role",
            Denial::Error { .. } => "error",
        }
    }
}

impl From<Denial> for AuthzError {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::NoSession => AuthzError::NoSession,
            Denial::WrongSubdomain { expected, actual } => AuthzError::WrongSubdomain { expected, actual },
            Denial::InsufficientRole { allowed, actual } => AuthzError::InsufficientRole { allowed, actual },
            Denial::Error { message } => AuthzError::Unexpected(message),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GuardResult {
    Allowed(SessionClaims),
    Denied(Denial),
}

impl GuardResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GuardResult::Allowed(_))
    }

    pub fn into_result(self) -> Result<SessionClaims, AuthzError> {
        match self {
            GuardResult::Allowed(claims) => Ok(claims),
            GuardResult::Denied(denial) => Err(denial.into()),
        }
    }
}

/// Pure guard over already-resolved claims.
///
/// Both subdomains are lowercased before comparison. An empty `allowed_roles`
/// admits every role.
pub fn guard_tenant_access(
    claims: Option<SessionClaims>,
    expected_subdomain: &str,
    allowed_roles: &[Role],
) -> GuardResult {
    let Some(claims) = claims else {
        return GuardResult::Denied(Denial::NoSession);
    };

    let expected = normalize_subdomain(expected_subdomain);
    let actual = normalize_subdomain(&claims.subdomain);
    if expected.is_empty() || expected != actual {
        return GuardResult::Denied(Denial::WrongSubdomain { expected, actual });
    }

    if !allowed_roles.is_empty() && !allowed_roles.contains(&claims.user_role) {
        return GuardResult::Denied(Denial::InsufficientRole {
            allowed: allowed_roles.to_vec(),
            actual: claims.user_role,
        });
    }

    GuardResult::Allowed(claims)
}

/// Guard over the raw outcome of a claims lookup. A missing or invalid token is
/// `NoSession`; a lookup that failed in transit is `Error`.
pub fn guard_claims_lookup(
    lookup: Result<Option<SessionClaims>, ClaimsLookupError>,
    expected_subdomain: &str,
    allowed_roles: &[Role],
) -> GuardResult {
    match lookup {
        Ok(claims) => guard_tenant_access(claims, expected_subdomain, allowed_roles),
        Err(ClaimsLookupError::Missing) | Err(ClaimsLookupError::Invalid(_)) => {
            GuardResult::Denied(Denial::NoSession)
        }
        Err(ClaimsLookupError::Transport(message)) => GuardResult::Denied(Denial::Error { message }),
    }
}

/// Diagnostic event for a denied request.
pub fn log_denial(denial: &Denial, expected_subdomain: &str, path: &str) {
    match denial {
        Denial::WrongSubdomain { actual, .. } => tracing::warn!(
            reason = denial.reason(),
            expected = expected_subdomain,
            actual = actual.as_str(),
            path,
            "Tenant access denied"
        ),
        Denial::InsufficientRole { actual, .. } => tracing::warn!(
            reason = denial.reason(),
            expected = expected_subdomain,
            role = actual.as_str(),
            path,
            "Tenant access denied"
        ),
        Denial::Error { message } => tracing::error!(
            reason = denial.reason(),
            expected = expected_subdomain,
            error = message.as_str(),
            path,
            "Tenant access denied"
        ),
        Denial::NoSession => tracing::warn!(
            reason = denial.reason(),
            expected = expected_subdomain,
            path,
            "Tenant access denied"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    fn claims(subdomain: &str, role: Role) -> SessionClaims {
        SessionClaims::new(Uuid::new_v4(), "u@acme.test", subdomain, Uuid::new_v4(), role, Duration::hours(1))
    }

    #[test]
    fn missing_claims_dominate_every_other_check() {
        for (expected, roles) in [("acme", vec![]), ("", vec![Role::Owner]), ("other", vec![Role::Admin])] {
            assert_eq!(
                guard_tenant_access(None, expected, &roles),
                GuardResult::Denied(Denial::NoSession)
            );
        }
    }

    #[test]
    fn subdomain_mismatch_is_checked_before_role() {
        let result = guard_tenant_access(Some(claims("beta", Role::ViewOnly)), "acme", &[Role::Owner]);
        assert_eq!(
            result,
            GuardResult::Denied(Denial::WrongSubdomain {
                expected: "acme".into(),
                actual: "beta".into()
            })
        );
    }

    #[test]
    fn subdomain_comparison_is_case_insensitive() {
        let result = guard_tenant_access(Some(claims("ACME", Role::Member)), "Acme", &[]);
        assert!(result.is_allowed());
    }

    #[test]
    fn role_outside_allowed_list_is_denied() {
        let result = guard_tenant_access(Some(claims("acme", Role::Member)), "acme", &[Role::Owner, Role::Admin]);
        assert_eq!(
            result,
            GuardResult::Denied(Denial::InsufficientRole {
                allowed: vec![Role::Owner, Role::Admin],
                actual: Role::Member
            })
        );
    }

    #[test]
    fn empty_allowed_list_admits_any_role() {
        let c = claims("acme", Role::ViewOnly);
        assert_eq!(guard_tenant_access(Some(c.clone()), "acme", &[]), GuardResult::Allowed(c));
    }

    #[test]
    fn lookup_failures_split_between_no_session_and_error() {
        assert_eq!(
            guard_claims_lookup(Err(ClaimsLookupError::Invalid("expired".into())), "acme", &[]),
            GuardResult::Denied(Denial::NoSession)
        );
        assert_eq!(
            guard_claims_lookup(Err(ClaimsLookupError::Transport("timeout".into())), "acme", &[]),
            GuardResult::Denied(Denial::Error { message: "timeout".into() })
        );
    }

    #[test]
    fn denial_maps_to_error_taxonomy() {
        let err: AuthzError = Denial::NoSession.into();
        assert_eq!(err, AuthzError::NoSession);
    }
}
