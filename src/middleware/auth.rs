use axum::http::{header, HeaderMap};

use crate::auth::{decode_jwt, extract_bearer_token, ClaimsLookupError, SessionClaims};

/// Claims lookup from the request's bearer token.
///
/// No `Authorization` header is `Ok(None)`; a malformed or unverifiable token
/// is an error so the guard can tell it apart from a transport failure.
pub fn lookup_claims(headers: &HeaderMap, secret: &str) -> Result<Option<SessionClaims>, ClaimsLookupError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let auth_str = value
        .to_str()
        .map_err(|_| ClaimsLookupError::Invalid("Invalid Authorization header format".to_string()))?;
    let token = extract_bearer_token(auth_str)?;

    let claims = decode_jwt(token, secret)?;
    Ok(Some(claims))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::generate_jwt;
    use crate::authz::Role;
    use axum::http::HeaderValue;
    use chrono::Duration;
    use uuid::Uuid;

    const SECRET: &str = "middleware-secret";

    #[test]
    fn missing_header_is_no_claims() {
        assert_eq!(lookup_claims(&HeaderMap::new(), SECRET), Ok(None));
    }

    #[test]
    fn valid_bearer_token_yields_claims() {
        let claims = SessionClaims::new(
            Uuid::new_v4(),
            "ada@acme.test",
            "acme",
            Uuid::new_v4(),
            Role::Member,
            Duration::hours(1),
        );
        let token = generate_jwt(&claims, SECRET).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        assert_eq!(lookup_claims(&headers, SECRET).unwrap(), Some(claims));
    }

    #[test]
    fn wrong_scheme_or_secret_is_invalid() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(matches!(
            lookup_claims(&headers, SECRET),
            Err(ClaimsLookupError::Invalid(_))
        ));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer not.a.jwt"));
        assert!(matches!(
            lookup_claims(&headers, SECRET),
            Err(ClaimsLookupError::Invalid(_))
        ));
    }
}
