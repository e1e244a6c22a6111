/// Session endpoints
///
/// # Endpoints
///
/// - `POST /login` - Look up the login account by email and issue a session
/// - `POST /logout` - Revoke the presented session (gated)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, Extension, Json};
use folio_shared::{auth::AuthContext, db::UnitOfWork, store::OnboardingStore};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address of a login account
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Login response
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Login account ID
    pub user_id: i64,

    /// Session token, valid for 72 hours or until logout
    pub token: String,
}

/// Logout response
#[derive(Debug, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub message: String,
}

/// Issue a session token
///
/// # Endpoint
///
/// ```text
/// POST /login
/// Content-Type: application/json
///
/// { "email": "a@x.com" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `401 Unauthorized`: No login account for this email
/// - `500 Internal Server Error`: Signing secret not configured
/// - `502 Bad Gateway`: Store unavailable
pub async fn login<S: OnboardingStore>(
    State(state): State<AppState<S>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    req.validate()?;

    let mut uow = UnitOfWork::begin(state.store.as_ref()).await?;
    let lookup = state.store.find_user_by_email(uow.tx(), &req.email).await;
    let user = uow
        .resolve(lookup)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".to_string()))?;

    let token = state.credentials.issue_token(user.id, &user.email)?;

    tracing::info!(user_id = user.id, role = user.role.as_str(), "User logged in");

    Ok(Json(LoginResponse {
        user_id: user.id,
        token,
    }))
}

/// Revoke the current session
///
/// The token stays signature-valid until it expires but is rejected by the
/// session gate from now on.
pub async fn logout<S: OnboardingStore>(
    State(state): State<AppState<S>>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<LogoutResponse>> {
    state.credentials.revoke(&auth.token)?;

    tracing::info!(user_id = auth.user_id, "User logged out");

    Ok(Json(LogoutResponse {
        message: "Logged out".to_string(),
    }))
}
