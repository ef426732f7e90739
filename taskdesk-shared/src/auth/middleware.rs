/// Bearer token authentication
///
/// Extracts the bearer token from the `Authorization` header and validates
/// it into an [`AuthContext`]. The API server runs [`authenticate`] from its
/// own route layer so failures render through its error envelope.
///
/// # Example
///
/// ```no_run
/// use axum::http::HeaderMap;
/// use taskdesk_shared::auth::middleware::authenticate;
///
/// # fn example(headers: &HeaderMap) {
/// match authenticate(headers, "secret") {
///     Ok(auth) => println!("Hello, {}!", auth.name),
///     Err(err) => println!("Rejected: {}", err),
/// }
/// # }
/// ```

use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::jwt::{validate_token, Claims, JwtError};

/// Identity of the authenticated caller
///
/// Handlers extract it with `Extension<AuthContext>`; services receive it
/// to stamp `created_by`/`updated_by`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated user ID
    pub user_id: Uuid,

    /// Display name carried in the token
    pub name: String,
}

impl AuthContext {
    pub fn new(user_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            user_id,
            name: name.into(),
        }
    }

    /// Creates auth context from validated JWT claims
    pub fn from_claims(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            name: claims.name,
        }
    }
}

/// Error type for authentication middleware
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Missing authorization header
    #[error("Missing authorization header")]
    MissingCredentials,

    /// Authorization header present but not `Bearer <token>`
    #[error("{0}")]
    InvalidFormat(String),

    /// Token validation failed
    #[error("{0}")]
    InvalidToken(String),
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
            JwtError::InvalidIssuer { .. } => {
                AuthError::InvalidToken("Invalid token issuer".to_string())
            }
            other => AuthError::InvalidToken(format!("Invalid token: {}", other)),
        }
    }
}

/// Pulls the token out of `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?;

    if token.is_empty() {
        return Err(AuthError::InvalidFormat("Empty bearer token".to_string()));
    }

    Ok(token)
}

/// Validates the bearer token in `headers` and builds the caller identity
pub fn authenticate(headers: &HeaderMap, secret: &str) -> Result<AuthContext, AuthError> {
    let token = bearer_token(headers)?;
    let claims = validate_token(token, secret)?;
    Ok(AuthContext::from_claims(claims))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::create_token;
    use axum::http::HeaderValue;
    use chrono::Duration;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_auth_context_from_claims() {
        let user_id = Uuid::new_v4();
        let claims = Claims::new(user_id, "Ada", Duration::hours(1));

        let context = AuthContext::from_claims(claims);

        assert_eq!(context, AuthContext::new(user_id, "Ada"));
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert!(matches!(
            bearer_token(&HeaderMap::new()),
            Err(AuthError::MissingCredentials)
        ));
        assert!(matches!(
            bearer_token(&headers_with("Basic abc")),
            Err(AuthError::InvalidFormat(_))
        ));
        assert!(matches!(
            bearer_token(&headers_with("Bearer ")),
            Err(AuthError::InvalidFormat(_))
        ));
        assert_eq!(bearer_token(&headers_with("Bearer abc.def")).unwrap(), "abc.def");
    }

    #[test]
    fn test_authenticate() {
        let user_id = Uuid::new_v4();
        let token = create_token(&Claims::new(user_id, "Ada", Duration::hours(1)), SECRET).unwrap();

        let context = authenticate(&headers_with(&format!("Bearer {}", token)), SECRET).unwrap();
        assert_eq!(context.user_id, user_id);
        assert_eq!(context.name, "Ada");

        let expired =
            create_token(&Claims::new(user_id, "Ada", Duration::seconds(-3600)), SECRET).unwrap();
        let result = authenticate(&headers_with(&format!("Bearer {}", expired)), SECRET);
        assert!(matches!(result, Err(AuthError::InvalidToken(msg)) if msg == "Token expired"));
    }
}
