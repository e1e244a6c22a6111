/// Session token encoding
///
/// Session tokens are compact HS256 JWTs. The claim names are part of the
/// wire format shared with the web client and must not change:
///
/// ```json
/// { "authorised": true, "userID": 7, "email": "a@x.com", "exp": 1700000000 }
/// ```
///
/// Tokens live for 72 hours. Signature and expiry are checked here;
/// revocation is checked by [`CredentialService`](super::credentials::CredentialService).
///
/// # Example
///
/// ```
/// use folio_shared::auth::jwt::{create_token, validate_token, Claims};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let claims = Claims::new(7, "a@x.com");
/// let token = create_token(&claims, "your-secret-key")?;
///
/// let validated = validate_token(&token, "your-secret-key")?;
/// assert_eq!(validated.user_id, 7);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Lifetime of a session token
pub const SESSION_TTL_HOURS: i64 = 72;

/// Error type for JWT operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JwtError {
    /// Failed to sign the token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Token signed with something other than HS256
    #[error("Unexpected signing method")]
    BadSigningMethod,

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Bad signature or malformed token
    #[error("Invalid token: {0}")]
    Invalid(String),
}

/// Session token claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Always true for issued sessions
    pub authorised: bool,

    /// Login account ID
    #[serde(rename = "userID")]
    pub user_id: i64,

    /// Login account email
    pub email: String,

    /// Expiration time (Unix seconds)
    pub exp: i64,
}

impl Claims {
    /// Claims expiring `SESSION_TTL_HOURS` from now
    pub fn new(user_id: i64, email: impl Into<String>) -> Self {
        Self::with_expiration(user_id, email, Duration::hours(SESSION_TTL_HOURS))
    }

    /// Claims with a custom lifetime; a negative lifetime yields an expired token
    pub fn with_expiration(user_id: i64, email: impl Into<String>, expires_in: Duration) -> Self {
        Self {
            authorised: true,
            user_id,
            email: email.into(),
            exp: (Utc::now() + expires_in).timestamp(),
        }
    }
}

/// Signs claims with HS256
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key).map_err(|e| JwtError::CreateError(e.to_string()))
}

/// Checks signature, algorithm and expiry, returning the claims
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    // A token is dead the second its `exp` passes
    validation.leeway = 0;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => JwtError::Expired,
        ErrorKind::InvalidAlgorithm => JwtError::BadSigningMethod,
        _ => JwtError::Invalid(e.to_string()),
    })?;

    Ok(token_data.claims)
}
