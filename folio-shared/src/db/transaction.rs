/// Transaction coordination
///
/// A `TransactionCoordinator` opens, commits and rolls back transactions
/// across the onboarding stores. Workflows never call those three methods
/// directly; they go through a `UnitOfWork`:
///
/// ```text
/// UnitOfWork::begin(store)        -> one transaction acquired
///   ├─> body(uow.tx())            -> reads and writes, `?` on any failure
///   └─> uow.resolve(result)       -> Ok: commit, Err: rollback
/// ```
///
/// `resolve` takes the guard by value, so a unit of work is resolved at most
/// once. A guard dropped without being resolved (panic, cancelled request)
/// drops its transaction, and dropping a transaction rolls it back.
///
/// # Example
///
/// ```no_run
/// use folio_shared::db::UnitOfWork;
/// use folio_shared::store::{MemoryOnboardingStore, OnboardingStore, StoreError};
///
/// # async fn example(store: MemoryOnboardingStore) -> Result<(), StoreError> {
/// let mut uow = UnitOfWork::begin(&store).await?;
/// let result = store.find_profile(uow.tx(), 42).await;
/// let profile = uow.resolve(result).await?;
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use std::fmt;
use tracing::{debug, error};
use uuid::Uuid;

use crate::store::StoreError;

/// Opens and resolves transactions for a backing store
#[async_trait]
pub trait TransactionCoordinator: Send + Sync {
    /// Open transaction handle
    type Tx: Send;

    /// Starts a transaction
    ///
    /// Fails with `StoreError::Connection` if the store is unreachable.
    async fn begin(&self) -> Result<Self::Tx, StoreError>;

    /// Makes every write in `tx` visible
    async fn commit(&self, tx: Self::Tx) -> Result<(), StoreError>;

    /// Discards every write in `tx`
    async fn rollback(&self, tx: Self::Tx) -> Result<(), StoreError>;
}

/// One transactional scope around a workflow invocation
pub struct UnitOfWork<'c, C: TransactionCoordinator> {
    coordinator: &'c C,
    tx: C::Tx,
    id: Uuid,
}

impl<'c, C: TransactionCoordinator> UnitOfWork<'c, C> {
    /// Acquires a transaction from `coordinator`
    pub async fn begin(coordinator: &'c C) -> Result<Self, StoreError> {
        let tx = coordinator.begin().await?;
        let id = Uuid::new_v4();
        debug!(unit_of_work = %id, "Unit of work started");

        Ok(Self {
            coordinator,
            tx,
            id,
        })
    }

    /// The open transaction, for store calls
    pub fn tx(&mut self) -> &mut C::Tx {
        &mut self.tx
    }

    /// Commits on `Ok`, rolls back on `Err`
    ///
    /// On `Err(e)` the rollback outcome decides the result: `e` is returned
    /// when the rollback succeeds, the rollback error when it does not. On
    /// `Ok(v)` a failed commit is returned as an error instead of `v`.
    pub async fn resolve<T, E>(self, result: Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError> + fmt::Display,
    {
        let UnitOfWork {
            coordinator,
            tx,
            id,
        } = self;

        match result {
            Ok(value) => match coordinator.commit(tx).await {
                Ok(()) => {
                    debug!(unit_of_work = %id, "Unit of work committed");
                    Ok(value)
                }
                Err(commit_err) => {
                    error!(unit_of_work = %id, error = %commit_err, "Commit failed");
                    Err(E::from(commit_err))
                }
            },
            Err(err) => match coordinator.rollback(tx).await {
                Ok(()) => {
                    debug!(unit_of_work = %id, error = %err, "Unit of work rolled back");
                    Err(err)
                }
                Err(rollback_err) => {
                    error!(
                        unit_of_work = %id,
                        error = %err,
                        rollback_error = %rollback_err,
                        "Rollback failed"
                    );
                    Err(E::from(rollback_err))
                }
            },
        }
    }
}
