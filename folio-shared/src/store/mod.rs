/// Onboarding stores
///
/// The profile, invitation and user-login stores are plain keyed record
/// stores. They are exposed through one trait so a workflow can run all of
/// its reads and writes inside a single transaction.
///
/// # Implementations
///
/// - [`PgOnboardingStore`]: PostgreSQL via sqlx, one `Transaction` per unit of work
/// - [`MemoryOnboardingStore`]: in-process tables with staged writes and
///   fault injection, used by tests and local runs

use async_trait::async_trait;

use crate::db::TransactionCoordinator;
use crate::models::{Invitation, NewInvitation, NewUser, Profile, User};

pub mod memory;
pub mod postgres;

pub use memory::{Fault, MemoryOnboardingStore, StoreSnapshot};
pub use postgres::PgOnboardingStore;

/// Store and transaction failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Backing store unreachable (begin or connection acquisition failed)
    #[error("Store unreachable: {0}")]
    Connection(String),

    /// Commit failed; nothing was written
    #[error("Commit failed: {0}")]
    Commit(String),

    /// Rollback failed
    #[error("Rollback failed: {0}")]
    Rollback(String),

    /// A read or write inside the transaction failed
    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => StoreError::Connection(err.to_string()),
            _ => StoreError::Database(err.to_string()),
        }
    }
}

/// Reads and writes used by the onboarding workflow
///
/// Every data method runs inside the transaction it is given. Profiles are
/// read-only here.
#[async_trait]
pub trait OnboardingStore: TransactionCoordinator + 'static {
    /// Cheap connectivity probe for health checks
    async fn ping(&self) -> Result<(), StoreError>;

    async fn find_profile(&self, tx: &mut Self::Tx, id: i64) -> Result<Option<Profile>, StoreError>;

    /// Inserts an `Incomplete` invitation
    async fn insert_invitation(
        &self,
        tx: &mut Self::Tx,
        data: NewInvitation,
    ) -> Result<Invitation, StoreError>;

    /// Most recent `Incomplete` invitation for a profile
    ///
    /// The PostgreSQL implementation locks the row for the rest of the
    /// transaction.
    async fn find_incomplete_invitation(
        &self,
        tx: &mut Self::Tx,
        profile_id: i64,
    ) -> Result<Option<Invitation>, StoreError>;

    /// Flips every `Incomplete` invitation of a profile to `Complete`
    ///
    /// Returns the most recent updated row, or `None` when nothing was incomplete.
    async fn mark_invitation_complete(
        &self,
        tx: &mut Self::Tx,
        profile_id: i64,
        updated_by_id: i64,
    ) -> Result<Option<Invitation>, StoreError>;

    async fn insert_user(&self, tx: &mut Self::Tx, data: NewUser) -> Result<User, StoreError>;

    async fn find_user_by_id(&self, tx: &mut Self::Tx, id: i64) -> Result<Option<User>, StoreError>;

    async fn find_user_by_email(
        &self,
        tx: &mut Self::Tx,
        email: &str,
    ) -> Result<Option<User>, StoreError>;

    /// Deletes every login account with this email, returning how many went
    async fn delete_users_by_email(
        &self,
        tx: &mut Self::Tx,
        email: &str,
    ) -> Result<u64, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlx_error_mapping() {
        assert!(matches!(
            StoreError::from(sqlx::Error::PoolTimedOut),
            StoreError::Connection(_)
        ));
        assert!(matches!(
            StoreError::from(sqlx::Error::RowNotFound),
            StoreError::Database(_)
        ));
    }
}
