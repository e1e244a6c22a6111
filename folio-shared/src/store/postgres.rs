/// PostgreSQL onboarding store
///
/// Each unit of work is one `sqlx::Transaction`. Queries run on the
/// transaction's connection, so nothing is visible to other requests until
/// commit. A transaction dropped without commit is rolled back by sqlx.
///
/// # Example
///
/// ```no_run
/// use folio_shared::db::pool::{create_pool, DatabaseConfig};
/// use folio_shared::store::PgOnboardingStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig {
///     url: std::env::var("DATABASE_URL")?,
///     ..Default::default()
/// })
/// .await?;
///
/// let store = PgOnboardingStore::new(pool);
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

use super::{OnboardingStore, StoreError};
use crate::db::TransactionCoordinator;
use crate::models::{Invitation, InvitationStatus, NewInvitation, NewUser, Profile, User};

const INVITATION_COLUMNS: &str =
    "profile_id, is_profile_complete, created_by_id, updated_by_id, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct InvitationRow {
    profile_id: i64,
    is_profile_complete: bool,
    created_by_id: i64,
    updated_by_id: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<InvitationRow> for Invitation {
    fn from(row: InvitationRow) -> Self {
        Invitation {
            profile_id: row.profile_id,
            status: InvitationStatus::from_flag(row.is_profile_complete),
            created_by_id: row.created_by_id,
            updated_by_id: row.updated_by_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Store backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgOnboardingStore {
    pool: PgPool,
}

impl PgOnboardingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl TransactionCoordinator for PgOnboardingStore {
    type Tx = Transaction<'static, Postgres>;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        self.pool
            .begin()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))
    }

    async fn commit(&self, tx: Self::Tx) -> Result<(), StoreError> {
        tx.commit()
            .await
            .map_err(|e| StoreError::Commit(e.to_string()))
    }

    async fn rollback(&self, tx: Self::Tx) -> Result<(), StoreError> {
        tx.rollback()
            .await
            .map_err(|e| StoreError::Rollback(e.to_string()))
    }
}

#[async_trait]
impl OnboardingStore for PgOnboardingStore {
    async fn ping(&self) -> Result<(), StoreError> {
        crate::db::pool::health_check(&self.pool)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))
    }

    async fn find_profile(
        &self,
        tx: &mut Self::Tx,
        id: i64,
    ) -> Result<Option<Profile>, StoreError> {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            SELECT id, email, full_name
            FROM profiles
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(profile)
    }

    async fn insert_invitation(
        &self,
        tx: &mut Self::Tx,
        data: NewInvitation,
    ) -> Result<Invitation, StoreError> {
        let query = format!(
            r#"
            INSERT INTO invitations (profile_id, is_profile_complete, created_by_id, updated_by_id)
            VALUES ($1, FALSE, $2, $2)
            RETURNING {}
            "#,
            INVITATION_COLUMNS
        );

        let row = sqlx::query_as::<_, InvitationRow>(&query)
            .bind(data.profile_id)
            .bind(data.created_by_id)
            .fetch_one(&mut **tx)
            .await?;

        debug!(profile_id = row.profile_id, "Inserted invitation");
        Ok(row.into())
    }

    async fn find_incomplete_invitation(
        &self,
        tx: &mut Self::Tx,
        profile_id: i64,
    ) -> Result<Option<Invitation>, StoreError> {
        // FOR UPDATE serializes concurrent completions of the same profile:
        // the second waits, then re-reads the row as complete and finds nothing.
        let query = format!(
            r#"
            SELECT {}
            FROM invitations
            WHERE profile_id = $1 AND is_profile_complete = FALSE
            ORDER BY created_at DESC
            LIMIT 1
            FOR UPDATE
            "#,
            INVITATION_COLUMNS
        );

        let row = sqlx::query_as::<_, InvitationRow>(&query)
            .bind(profile_id)
            .fetch_optional(&mut **tx)
            .await?;

        Ok(row.map(Invitation::from))
    }

    async fn mark_invitation_complete(
        &self,
        tx: &mut Self::Tx,
        profile_id: i64,
        updated_by_id: i64,
    ) -> Result<Option<Invitation>, StoreError> {
        let query = format!(
            r#"
            UPDATE invitations
            SET is_profile_complete = TRUE, updated_by_id = $2, updated_at = NOW()
            WHERE profile_id = $1 AND is_profile_complete = FALSE
            RETURNING {}
            "#,
            INVITATION_COLUMNS
        );

        let rows = sqlx::query_as::<_, InvitationRow>(&query)
            .bind(profile_id)
            .bind(updated_by_id)
            .fetch_all(&mut **tx)
            .await?;

        Ok(rows
            .into_iter()
            .max_by_key(|row| row.created_at)
            .map(Invitation::from))
    }

    async fn insert_user(&self, tx: &mut Self::Tx, data: NewUser) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, role)
            VALUES ($1, $2)
            RETURNING id, email, role
            "#,
        )
        .bind(data.email)
        .bind(data.role)
        .fetch_one(&mut **tx)
        .await?;

        Ok(user)
    }

    async fn find_user_by_id(
        &self,
        tx: &mut Self::Tx,
        id: i64,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, role
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(user)
    }

    async fn find_user_by_email(
        &self,
        tx: &mut Self::Tx,
        email: &str,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, role
            FROM users
            WHERE email = $1
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(email)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(user)
    }

    async fn delete_users_by_email(
        &self,
        tx: &mut Self::Tx,
        email: &str,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE email = $1")
            .bind(email)
            .execute(&mut **tx)
            .await?;

        Ok(result.rows_affected())
    }
}
