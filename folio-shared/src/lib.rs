//! # Folio Shared Library
//!
//! Onboarding core for the Folio profile builder: the invitation workflow,
//! the stores it runs against, outbound notifications and the session
//! credential lifecycle. The HTTP surface lives in `folio-api`.
//!
//! ## Module Organization
//!
//! - `models`: Profile, invitation and user-login records
//! - `db`: Connection pool and the unit-of-work guard
//! - `store`: Store trait with PostgreSQL and in-memory implementations
//! - `auth`: Session tokens, revocation whitelist and the request gate
//! - `notify`: Fire-and-forget notification dispatch with retries
//! - `onboarding`: The two-phase invitation workflow

pub mod auth;
pub mod db;
pub mod models;
pub mod notify;
pub mod onboarding;
pub mod store;

/// Current version of the Folio shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
