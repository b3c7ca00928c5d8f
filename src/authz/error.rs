use thiserror::Error;

use super::role::Role;
use crate::database::manager::DatabaseError;

/// Every failure the authorization layer reports to its callers.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AuthzError {
    #[error("No active session")]
    NoSession,

    #[error("Session belongs to '{actual}', not '{expected}'")]
    WrongSubdomain { expected: String, actual: String },

    #[error("Role '{actual}' is not permitted here")]
    InsufficientRole { allowed: Vec<Role>, actual: Role },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Expired(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{resource} limit reached ({current}/{limit})")]
    LimitReached {
        resource: String,
        current: i64,
        limit: i64,
    },

    #[error("Invalid subdomain: {0}")]
    InvalidSubdomain(String),

    #[error("Subdomain '{0}' is not available")]
    SubdomainTaken(String),

    #[error("{0}")]
    Validation(String),

    #[error("Backend unavailable: {0}")]
    Transport(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl AuthzError {
    pub fn not_found(message: impl Into<String>) -> Self {
        AuthzError::NotFound(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        AuthzError::Unauthorized(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        AuthzError::Validation(message.into())
    }

    /// Stable reason tag used in logs and audit rows.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthzError::NoSession => "no_session",
            AuthzError::WrongSubdomain { .. } => "wrong_subdomain",
            AuthzError::InsufficientRole { .. } => "insufficient_role",
            AuthzError::NotFound(_) => "not_found",
            AuthzError::Expired(_) => "expired",
            AuthzError::Unauthorized(_) => "unauthorized",
            AuthzError::LimitReached { .. } => "limit_reached",
            AuthzError::InvalidSubdomain(_) => "invalid_subdomain",
            AuthzError::SubdomainTaken(_) => "subdomain_taken",
            AuthzError::Validation(_) => "validation",
            AuthzError::Transport(_) => "transport",
            AuthzError::Unexpected(_) => "unexpected",
        }
    }
}

impl From<DatabaseError> for AuthzError {
    fn from(err: DatabaseError) -> Self {
        tracing::error!("Store error: {}", err);
        match err {
            DatabaseError::NotFound(msg) => AuthzError::NotFound(msg),
            DatabaseError::Corrupt(msg) => AuthzError::Unexpected(msg),
            DatabaseError::Conflict(msg) => AuthzError::Validation(msg),
            other => AuthzError::Transport(other.to_string()),
        }
    }
}

pub type AuthzResult<T> = Result<T, AuthzError>;
