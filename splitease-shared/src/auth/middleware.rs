/// Request authentication
///
/// Resolves the bearer token of a request into an [`AuthContext`] that the
/// API's middleware layer inserts into request extensions. Handlers read it
/// back with `Extension<AuthContext>`.
///
/// # Token sources
///
/// 1. `Authorization: Bearer <token>` header
/// 2. `token` query parameter, needed by the notification stream because
///    browsers cannot set headers on an `EventSource`
///
/// The header wins when both are present.
///
/// # Example
///
/// ```
/// use axum::http::{HeaderMap, Uri};
/// use splitease_shared::auth::jwt::{create_token, Claims};
/// use splitease_shared::auth::middleware::authenticate;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "a-secret-that-is-at-least-32-bytes-long";
/// let token = create_token(&Claims::new(1, "Ana".into(), "ana@example.com".into()), secret)?;
///
/// let uri: Uri = format!("/notifications/stream?token={}", token).parse()?;
/// let ctx = authenticate(&HeaderMap::new(), &uri, secret).map_err(|e| format!("{:?}", e))?;
/// assert_eq!(ctx.user_id, 1);
/// # Ok(())
/// # }
/// ```

use axum::{
    extract::Query,
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use super::jwt::{validate_token, Claims, JwtError};

/// Identity of the authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: i64,
    pub name: String,
    pub email: String,
}

impl From<Claims> for AuthContext {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            name: claims.name,
            email: claims.email,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum AuthError {
    /// No header and no `token` query parameter
    MissingCredentials,

    /// Authorization header present but not `Bearer <token>`
    InvalidFormat(String),

    /// Bad signature, wrong issuer, expired, or malformed token
    InvalidToken(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::MissingCredentials => {
                (StatusCode::UNAUTHORIZED, "Missing credentials").into_response()
            }
            AuthError::InvalidFormat(msg) | AuthError::InvalidToken(msg) => {
                (StatusCode::UNAUTHORIZED, msg).into_response()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Pulls the raw token out of the headers or the query string.
pub fn extract_token(headers: &HeaderMap, uri: &Uri) -> Result<String, AuthError> {
    if let Some(value) = headers.get(header::AUTHORIZATION) {
        let value = value
            .to_str()
            .map_err(|_| AuthError::InvalidFormat("Invalid authorization header".to_string()))?;

        return value
            .strip_prefix("Bearer ")
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()));
    }

    Query::<TokenQuery>::try_from_uri(uri)
        .ok()
        .and_then(|Query(q)| q.token)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingCredentials)
}

/// Extracts and validates the caller's token.
pub fn authenticate(headers: &HeaderMap, uri: &Uri, secret: &str) -> Result<AuthContext, AuthError> {
    let token = extract_token(headers, uri)?;

    let claims = validate_token(&token, secret).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
        JwtError::InvalidIssuer => AuthError::InvalidToken("Invalid token issuer".to_string()),
        other => AuthError::InvalidToken(format!("Invalid token: {}", other)),
    })?;

    Ok(AuthContext::from(claims))
}
