/// Error handling for the API server
///
/// Handlers return `ApiResult<T>`; every library error converts into an
/// [`ApiError`] with a fixed status and machine-readable code:
///
/// | Source                                   | Status |
/// |------------------------------------------|--------|
/// | request validation                       | 400    |
/// | credential failure                       | 401    |
/// | missing profile / invitation / inviter   | 404    |
/// | store unreachable or query failed        | 502    |
/// | secret missing, commit or rollback failed| 500    |
///
/// Responses never carry retry-after guidance.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use folio_shared::{auth::CredentialError, onboarding::OnboardingError, store::StoreError};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::ValidationErrors;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Request body failed validation (400)
    ValidationError(Vec<ValidationErrorDetail>),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Not found (404)
    NotFound(String),

    /// Backing store failed (502)
    BadGateway(String),

    /// Internal server error (500)
    InternalError(String),
}

/// Validation error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "bad_request", "unauthorized")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Optional validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::BadGateway(msg) => write!(f, "Bad gateway: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::ValidationError(errors) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors),
            ),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::BadGateway(msg) => {
                tracing::error!("Store error: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "store_unavailable",
                    "The data store could not complete the request".to_string(),
                    None,
                )
            }
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

/// Convert validator errors to API errors
impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let details = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string()),
                })
            })
            .collect();

        ApiError::ValidationError(details)
    }
}

/// Convert store errors to API errors
impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Connection(_) | StoreError::Database(_) => {
                ApiError::BadGateway(err.to_string())
            }
            StoreError::Commit(_) | StoreError::Rollback(_) => {
                ApiError::InternalError(err.to_string())
            }
        }
    }
}

/// Convert onboarding errors to API errors
impl From<OnboardingError> for ApiError {
    fn from(err: OnboardingError) -> Self {
        match err {
            OnboardingError::NotFound(_) => ApiError::NotFound(err.to_string()),
            OnboardingError::Store(store_err) => store_err.into(),
        }
    }
}

/// Convert credential errors to API errors
impl From<CredentialError> for ApiError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::SecretMissing | CredentialError::Signing(_) => {
                ApiError::InternalError(err.to_string())
            }
            _ => ApiError::Unauthorized(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_shared::onboarding::Missing;

    fn status_of(err: impl Into<ApiError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        let err = ApiError::NotFound("Profile 42 not found".to_string());
        assert_eq!(err.to_string(), "Not found: Profile 42 not found");
    }

    #[test]
    fn test_onboarding_status_mapping() {
        assert_eq!(
            status_of(OnboardingError::NotFound(Missing::Profile(42))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(OnboardingError::NotFound(Missing::IncompleteInvitation(42))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(OnboardingError::Store(StoreError::Connection("down".into()))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(OnboardingError::Store(StoreError::Database("boom".into()))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(OnboardingError::Store(StoreError::Commit("x".into()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(OnboardingError::Store(StoreError::Rollback("x".into()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_credential_status_mapping() {
        assert_eq!(status_of(CredentialError::Expired), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(CredentialError::Revoked), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(CredentialError::TokenNotFound), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status_of(CredentialError::SecretMissing),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_no_retry_after_header() {
        let response = ApiError::BadGateway("down".into()).into_response();
        assert!(response.headers().get("Retry-After").is_none());
    }

    #[test]
    fn test_validation_error() {
        let errors = vec![ValidationErrorDetail {
            field: "email".to_string(),
            message: "Invalid email format".to_string(),
        }];

        let err = ApiError::ValidationError(errors);
        assert_eq!(err.to_string(), "Validation failed: 1 errors");
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
