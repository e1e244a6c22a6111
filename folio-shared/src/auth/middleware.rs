/// Request gate for Axum
///
/// Every protected route sits behind [`require_session`]. The gate reads the
/// `Authorization: Bearer <token>` header, asks the [`CredentialService`] to
/// authorize the token, and on success inserts an [`AuthContext`] into the
/// request extensions. Any failure answers 401 and the handler never runs.
///
/// # Example
///
/// ```no_run
/// use axum::{middleware, routing::post, Extension, Router};
/// use folio_shared::auth::credentials::CredentialService;
/// use folio_shared::auth::middleware::{require_session, AuthContext};
/// use folio_shared::auth::whitelist::TokenWhitelist;
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("Hello, user {}!", auth.user_id)
/// }
///
/// let credentials = CredentialService::new(Some("secret".into()), TokenWhitelist::new());
/// let app: Router = Router::new()
///     .route("/protected", post(handler))
///     .layer(middleware::from_fn_with_state(credentials, require_session));
/// ```

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::debug;

use super::credentials::{CredentialError, CredentialService};

/// Identity of the caller, added to request extensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    /// Login account ID from the token
    pub user_id: i64,

    pub email: String,

    /// The presented bearer token, needed to revoke it on logout
    pub token: String,
}

/// Gate failures; all answer 401
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Missing credentials")]
    MissingCredentials,

    /// Authorization header present but not a bearer token
    #[error("Expected Bearer token")]
    InvalidScheme,

    #[error(transparent)]
    Credential(#[from] CredentialError),
}

impl AuthError {
    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingCredentials => "missing_credentials",
            AuthError::InvalidScheme => "invalid_scheme",
            AuthError::Credential(CredentialError::Expired) => "token_expired",
            AuthError::Credential(CredentialError::Revoked) => "token_revoked",
            AuthError::Credential(_) => "invalid_token",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.code(),
            "message": self.to_string(),
        });

        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

/// Extracts the token from an `Authorization` header value
fn bearer_token(value: &str) -> Result<&str, AuthError> {
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .ok_or(AuthError::InvalidScheme)
}

/// Session gate middleware
///
/// Use with `axum::middleware::from_fn_with_state`.
///
/// # Errors
///
/// Returns 401 Unauthorized if:
/// - Authorization header is missing or not valid UTF-8
/// - the scheme is not `Bearer`
/// - the token fails verification or has been revoked
pub async fn require_session(
    State(credentials): State<CredentialService>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let header_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    let token = bearer_token(header_value)?.to_string();

    let claims = credentials.authorize(&token).map_err(|e| {
        debug!(error = %e, path = %req.uri().path(), "Request rejected by session gate");
        AuthError::from(e)
    })?;

    req.extensions_mut().insert(AuthContext {
        user_id: claims.user_id,
        email: claims.email,
        token,
    });

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::whitelist::TokenWhitelist;
    use axum::{body::Body, middleware, routing::get, Extension, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tower::ServiceExt;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn credentials() -> CredentialService {
        CredentialService::new(Some(SECRET.to_string()), TokenWhitelist::new())
    }

    fn app(credentials: CredentialService, hits: Arc<AtomicUsize>) -> Router {
        Router::new()
            .route(
                "/whoami",
                get(move |Extension(auth): Extension<AuthContext>| {
                    let hits = hits.clone();
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        format!("{}:{}", auth.user_id, auth.email)
                    }
                }),
            )
            .layer(middleware::from_fn_with_state(credentials, require_session))
    }

    fn request(authorization: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri("/whoami");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc"), Ok("abc"));
        assert_eq!(bearer_token("Basic abc"), Err(AuthError::InvalidScheme));
        assert_eq!(bearer_token("abc"), Err(AuthError::InvalidScheme));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(AuthError::MissingCredentials.code(), "missing_credentials");
        assert_eq!(
            AuthError::Credential(CredentialError::Revoked).code(),
            "token_revoked"
        );
        assert_eq!(
            AuthError::Credential(CredentialError::BadSigningMethod).code(),
            "invalid_token"
        );
    }

    #[tokio::test]
    async fn test_valid_token_reaches_handler() {
        let credentials = credentials();
        let token = credentials.issue_token(7, "a@x.com").unwrap();
        let hits = Arc::new(AtomicUsize::new(0));

        let response = app(credentials, hits.clone())
            .oneshot(request(Some(&format!("Bearer {}", token))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"7:a@x.com");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_header_is_401() {
        let hits = Arc::new(AtomicUsize::new(0));
        let response = app(credentials(), hits.clone())
            .oneshot(request(None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["error"], "missing_credentials");
        assert!(body["message"].is_string());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_other_scheme_is_401() {
        let hits = Arc::new(AtomicUsize::new(0));
        let response = app(credentials(), hits.clone())
            .oneshot(request(Some("Basic dXNlcjpwYXNz")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "invalid_scheme");
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_revoked_token_is_401() {
        let credentials = credentials();
        let token = credentials.issue_token(7, "a@x.com").unwrap();
        credentials.revoke(&token).unwrap();
        let hits = Arc::new(AtomicUsize::new(0));

        let response = app(credentials, hits.clone())
            .oneshot(request(Some(&format!("Bearer {}", token))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "token_revoked");
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_garbage_token_is_401() {
        let hits = Arc::new(AtomicUsize::new(0));
        let response = app(credentials(), hits.clone())
            .oneshot(request(Some("Bearer not-a-jwt")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "invalid_token");
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
