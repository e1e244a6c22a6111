/// Session authentication
///
/// # Modules
///
/// - [`jwt`]: HS256 session token encoding and validation
/// - [`whitelist`]: Set of honoured tokens; absence means revoked
/// - [`credentials`]: Issue, verify, revoke and authorize sessions
/// - [`middleware`]: Axum gate in front of protected routes
///
/// # Example
///
/// ```
/// use folio_shared::auth::credentials::CredentialService;
/// use folio_shared::auth::whitelist::TokenWhitelist;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let whitelist = TokenWhitelist::new();
/// let credentials = CredentialService::new(Some("secret-key".to_string()), whitelist.clone());
///
/// let token = credentials.issue_token(1, "admin@x.com")?;
/// assert!(whitelist.contains(&token));
/// # Ok(())
/// # }
/// ```

pub mod credentials;
pub mod jwt;
pub mod middleware;
pub mod whitelist;

pub use credentials::{CredentialError, CredentialService};
pub use middleware::{require_session, AuthContext, AuthError};
pub use whitelist::TokenWhitelist;
