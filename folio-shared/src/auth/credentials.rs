/// Credential service
///
/// Issues, verifies and revokes session tokens. A session is honoured only
/// when both hold:
///
/// 1. the token verifies (HS256 signature, not expired), and
/// 2. the token is in the [`TokenWhitelist`].
///
/// `verify_token` checks (1) only; `authorize` checks both and is what the
/// request gate uses. Revoking a token therefore shuts it out immediately
/// even though its signature stays valid until `exp`.
///
/// # Example
///
/// ```
/// use folio_shared::auth::credentials::{CredentialError, CredentialService};
/// use folio_shared::auth::whitelist::TokenWhitelist;
///
/// # fn example() -> Result<(), CredentialError> {
/// let service = CredentialService::new(Some("secret".to_string()), TokenWhitelist::new());
///
/// let token = service.issue_token(7, "a@x.com")?;
/// assert_eq!(service.authorize(&token)?.user_id, 7);
///
/// service.revoke(&token)?;
/// assert_eq!(service.authorize(&token), Err(CredentialError::Revoked));
/// # Ok(())
/// # }
/// ```

use chrono::Duration;
use tracing::{debug, info, warn};

use super::jwt::{self, Claims, JwtError, SESSION_TTL_HOURS};
use super::whitelist::TokenWhitelist;

/// Credential failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    /// No signing secret configured
    #[error("Signing secret is not configured")]
    SecretMissing,

    #[error("Token is empty")]
    EmptyToken,

    /// Token not signed with HS256
    #[error("Unexpected signing method")]
    BadSigningMethod,

    #[error("Token has expired")]
    Expired,

    /// Bad signature or malformed token
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Token verifies but is no longer whitelisted
    #[error("Token has been revoked")]
    Revoked,

    /// Revoking a token that is not whitelisted
    #[error("Token not found")]
    TokenNotFound,

    /// Signing failed
    #[error("Failed to sign token: {0}")]
    Signing(String),
}

impl From<JwtError> for CredentialError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::CreateError(msg) => CredentialError::Signing(msg),
            JwtError::BadSigningMethod => CredentialError::BadSigningMethod,
            JwtError::Expired => CredentialError::Expired,
            JwtError::Invalid(msg) => CredentialError::InvalidToken(msg),
        }
    }
}

/// Issues and checks session tokens against an injected whitelist
#[derive(Debug, Clone)]
pub struct CredentialService {
    secret: Option<String>,
    whitelist: TokenWhitelist,
    ttl: Duration,
}

impl CredentialService {
    /// Creates a service; an empty secret counts as missing
    pub fn new(secret: Option<String>, whitelist: TokenWhitelist) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()),
            whitelist,
            ttl: Duration::hours(SESSION_TTL_HOURS),
        }
    }

    /// Overrides the session lifetime
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn whitelist(&self) -> &TokenWhitelist {
        &self.whitelist
    }

    pub fn has_secret(&self) -> bool {
        self.secret.is_some()
    }

    fn secret(&self) -> Result<&str, CredentialError> {
        self.secret.as_deref().ok_or(CredentialError::SecretMissing)
    }

    /// Signs a new session token and whitelists it
    pub fn issue_token(&self, user_id: i64, email: &str) -> Result<String, CredentialError> {
        let secret = self.secret()?;
        let claims = Claims::with_expiration(user_id, email, self.ttl);
        let token = jwt::create_token(&claims, secret)?;

        self.whitelist.insert(&token, claims.exp);
        info!(user_id, "Session token issued");

        Ok(token)
    }

    /// Checks signature, algorithm and expiry; ignores the whitelist
    pub fn verify_token(&self, token: &str) -> Result<Claims, CredentialError> {
        if token.is_empty() {
            return Err(CredentialError::EmptyToken);
        }

        let secret = self.secret()?;
        Ok(jwt::validate_token(token, secret)?)
    }

    /// Removes a token from the whitelist
    pub fn revoke(&self, token: &str) -> Result<(), CredentialError> {
        if !self.whitelist.remove(token) {
            return Err(CredentialError::TokenNotFound);
        }

        info!("Session token revoked");
        Ok(())
    }

    /// Verifies the token and requires it to still be whitelisted
    pub fn authorize(&self, token: &str) -> Result<Claims, CredentialError> {
        let claims = self.verify_token(token).map_err(|e| {
            debug!(error = %e, "Session token rejected");
            e
        })?;

        if !self.whitelist.contains(token) {
            warn!(user_id = claims.user_id, "Revoked session token presented");
            return Err(CredentialError::Revoked);
        }

        Ok(claims)
    }
}
