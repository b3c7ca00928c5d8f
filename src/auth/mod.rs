pub mod session_poll;

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::authz::role::Role;

pub use session_poll::{wait_for_session, PollOutcome, PollPolicy};

/// Claims issued by the auth authority for one session. Read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: Uuid,
    pub email: String,
    pub subdomain: String,
    pub org_id: Uuid,
    pub user_role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_metadata: Option<serde_json::Value>,
    pub iat: i64,
    pub exp: i64,
}

impl SessionClaims {
    pub fn new(sub: Uuid, email: &str, subdomain: &str, org_id: Uuid, user_role: Role, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub,
            email: email.to_string(),
            subdomain: subdomain.to_string(),
            org_id,
            user_role,
            company_name: None,
            user_metadata: None,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.iat, 0).single().unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("JWT secret not configured")]
    InvalidSecret,

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),
}

/// Why a claims lookup produced no claims.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClaimsLookupError {
    #[error("missing session token")]
    Missing,

    #[error("invalid session token: {0}")]
    Invalid(String),

    #[error("claims lookup failed: {0}")]
    Transport(String),
}

impl From<JwtError> for ClaimsLookupError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::InvalidToken(msg) => ClaimsLookupError::Invalid(msg),
            other => ClaimsLookupError::Transport(other.to_string()),
        }
    }
}

pub fn generate_jwt(claims: &SessionClaims, secret: &str) -> Result<String, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::new(Algorithm::HS256), claims, &encoding_key)
        .map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

pub fn decode_jwt(token: &str, secret: &str) -> Result<SessionClaims, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_aud = false;

    decode::<SessionClaims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| JwtError::InvalidToken(e.to_string()))
}

/// Extract the token portion of a `Bearer <token>` header value.
pub fn extract_bearer_token(auth_header: &str) -> Result<&str, ClaimsLookupError> {
    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ClaimsLookupError::Invalid("Authorization header must use Bearer token format".to_string()))?
        .trim();

    if token.is_empty() {
        return Err(ClaimsLookupError::Missing);
    }
    Ok(token)
}
