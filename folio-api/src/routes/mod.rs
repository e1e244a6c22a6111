/// API route handlers
///
/// - `health`: Health check endpoint
/// - `auth`: Login and logout
/// - `invitations`: Send and complete profile invitations

pub mod auth;
pub mod health;
pub mod invitations;
