use serde::Serialize;
use uuid::Uuid;

use crate::auth::SessionClaims;
use crate::authz::{AuthzError, AuthzResult, Role};

/// Who is performing an operation, resolved once per request from verified claims.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActingContext {
    pub user_id: Uuid,
    pub email: String,
    pub org_id: Uuid,
    pub subdomain: String,
    pub role: Role,
}

impl ActingContext {
    pub fn require_admin(&self) -> AuthzResult<()> {
        if self.role.is_admin_or_above() {
            Ok(())
        } else {
            Err(AuthzError::InsufficientRole {
                allowed: vec![Role::Owner, Role::Superadmin, Role::Admin],
                actual: self.role,
            })
        }
    }

    pub fn require_org_manager(&self) -> AuthzResult<()> {
        if self.role.is_org_manager() {
            Ok(())
        } else {
            Err(AuthzError::InsufficientRole {
                allowed: vec![Role::Owner, Role::Superadmin],
                actual: self.role,
            })
        }
    }
}

impl From<&SessionClaims> for ActingContext {
    fn from(claims: &SessionClaims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email.clone(),
            org_id: claims.org_id,
            subdomain: claims.subdomain.to_ascii_lowercase(),
            role: claims.user_role,
        }
    }
}
