//! Bearer-token identity for bookshelf routes.
//!
//! Tokens are HS256 JWTs whose `sub` claim is the user id. Guarded routers
//! run [`require_identity`] as a route layer; handlers then take an
//! [`Identity`] argument.

mod error;
mod token;

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use bookshelf_http::AppError;

pub use error::AuthError;
pub use token::{Claims, TokenIssuer, TokenVerifier};

/// Authenticated caller, attached to the request by [`require_identity`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    pub user_id: String,
}

impl Identity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Self { user_id: claims.sub }
    }
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .ok_or_else(|| AppError::unauthorized("Authentication required"))
    }
}

/// Route layer that verifies the bearer token and attaches an [`Identity`].
///
/// ```rust,ignore
/// router.route_layer(axum::middleware::from_fn_with_state(verifier, require_identity))
/// ```
pub async fn require_identity(
    State(verifier): State<Arc<TokenVerifier>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())?;
    let claims = verifier.verify(token)?;
    let identity = Identity::from(claims);

    tracing::debug!(user_id = %identity.user_id, "request authenticated");
    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}

/// Extract the token from `Authorization: Bearer <token>`.
fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingCredentials)?
        .to_str()
        .map_err(|_| AuthError::MalformedHeader)?;

    let token = value
        .strip_prefix("Bearer ")
        .ok_or(AuthError::MalformedHeader)?
        .trim();

    if token.is_empty() {
        return Err(AuthError::MalformedHeader);
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::StatusCode,
        routing::get,
        Router,
    };
    use bookshelf_kernel::settings::AuthSettings;
    use tower::ServiceExt;

    fn guarded_app(settings: &AuthSettings) -> Router {
        let verifier = Arc::new(TokenVerifier::from_settings(settings));
        Router::new()
            .route("/whoami", get(|identity: Identity| async move { identity.user_id }))
            .route_layer(axum::middleware::from_fn_with_state(verifier, require_identity))
    }

    async fn call(app: Router, authorization: Option<&str>) -> (StatusCode, String) {
        let mut request = axum::http::Request::get("/whoami");
        if let Some(value) = authorization {
            request = request.header(AUTHORIZATION, value);
        }
        let response = app.oneshot(request.body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn valid_token_yields_identity() {
        let settings = AuthSettings::default();
        let token = TokenIssuer::from_settings(&settings).issue("user-1").unwrap();

        let (status, body) = call(guarded_app(&settings), Some(&format!("Bearer {token}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "user-1");
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let (status, body) = call(guarded_app(&AuthSettings::default()), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("unauthorized"));
    }

    #[tokio::test]
    async fn non_bearer_scheme_is_unauthorized() {
        let (status, _) = call(guarded_app(&AuthSettings::default()), Some("Basic dXNlcjpwdw==")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn token_signed_with_other_secret_is_unauthorized() {
        let other = AuthSettings {
            jwt_secret: "another-secret".to_string(),
            ..AuthSettings::default()
        };
        let token = TokenIssuer::from_settings(&other).issue("user-1").unwrap();

        let (status, _) = call(
            guarded_app(&AuthSettings::default()),
            Some(&format!("Bearer {token}")),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unguarded_route_rejects_identity_extraction() {
        let app = Router::new().route("/whoami", get(|identity: Identity| async move { identity.user_id }));
        let (status, _) = call(app, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
