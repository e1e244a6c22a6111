/// In-memory onboarding store
///
/// Tables live behind a mutex. A transaction works on a private copy of the
/// tables and records its writes; commit replays those writes against the
/// shared tables atomically, rollback (or dropping the transaction) throws
/// them away. Completing an invitation is re-checked at commit time, so two
/// transactions racing to complete the same profile cannot both succeed.
///
/// Faults can be injected at any store call to exercise rollback paths.
///
/// # Example
///
/// ```
/// use folio_shared::models::Profile;
/// use folio_shared::store::{Fault, MemoryOnboardingStore};
///
/// let store = MemoryOnboardingStore::new();
/// store.insert_profile(Profile::new(42, "a@x.com"));
/// store.fail_on(Fault::InsertUser);
/// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{OnboardingStore, StoreError};
use crate::db::TransactionCoordinator;
use crate::models::{Invitation, InvitationStatus, NewInvitation, NewUser, Profile, User};

/// Store call that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    Begin,
    Commit,
    Rollback,
    Ping,
    FindProfile,
    InsertInvitation,
    FindInvitation,
    CompleteInvitation,
    InsertUser,
    FindUser,
    DeleteUser,
}

/// Committed contents of the store, ordered for comparison
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreSnapshot {
    pub profiles: Vec<Profile>,
    pub invitations: Vec<Invitation>,
    pub users: Vec<User>,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    profiles: BTreeMap<i64, Profile>,
    invitations: Vec<Invitation>,
    users: BTreeMap<i64, User>,
}

#[derive(Debug, Clone)]
enum Write {
    InsertInvitation(Invitation),
    CompleteInvitations {
        profile_id: i64,
        updated_by_id: i64,
        at: DateTime<Utc>,
    },
    InsertUser(User),
    DeleteUsersByEmail(String),
}

impl Tables {
    fn apply(&mut self, write: &Write) -> Result<(), StoreError> {
        match write {
            Write::InsertInvitation(invitation) => self.invitations.push(invitation.clone()),
            Write::CompleteInvitations {
                profile_id,
                updated_by_id,
                at,
            } => {
                let mut touched = 0;
                for invitation in self
                    .invitations
                    .iter_mut()
                    .filter(|i| i.profile_id == *profile_id && i.is_incomplete())
                {
                    invitation.status = InvitationStatus::Complete;
                    invitation.updated_by_id = Some(*updated_by_id);
                    invitation.updated_at = *at;
                    touched += 1;
                }
                if touched == 0 {
                    return Err(StoreError::Commit(format!(
                        "invitation for profile {} was completed concurrently",
                        profile_id
                    )));
                }
            }
            Write::InsertUser(user) => {
                self.users.insert(user.id, user.clone());
            }
            Write::DeleteUsersByEmail(email) => self.users.retain(|_, u| &u.email != email),
        }
        Ok(())
    }

    fn latest_incomplete(&self, profile_id: i64) -> Option<&Invitation> {
        self.invitations
            .iter()
            .rev()
            .find(|i| i.profile_id == profile_id && i.is_incomplete())
    }
}

/// Open in-memory transaction
#[derive(Debug)]
pub struct MemoryTx {
    view: Tables,
    writes: Vec<Write>,
}

impl MemoryTx {
    fn stage(&mut self, write: Write) -> Result<(), StoreError> {
        self.view.apply(&write)?;
        self.writes.push(write);
        Ok(())
    }
}

struct Inner {
    tables: Mutex<Tables>,
    faults: Mutex<HashSet<Fault>>,
    next_user_id: AtomicI64,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
}

/// Shared handle to an in-memory store
#[derive(Clone)]
pub struct MemoryOnboardingStore {
    inner: Arc<Inner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryOnboardingStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                tables: Mutex::new(Tables::default()),
                faults: Mutex::new(HashSet::new()),
                next_user_id: AtomicI64::new(1),
                commits: AtomicUsize::new(0),
                rollbacks: AtomicUsize::new(0),
            }),
        }
    }

    /// Adds or replaces a profile outside of any transaction
    pub fn insert_profile(&self, profile: Profile) {
        lock(&self.inner.tables).profiles.insert(profile.id, profile);
    }

    /// Inserts a login account outside of any transaction (e.g. admins)
    pub fn seed_user(&self, data: NewUser) -> User {
        let user = self.allocate_user(data);
        lock(&self.inner.tables).users.insert(user.id, user.clone());
        user
    }

    /// Makes every later call at `fault` fail until cleared
    pub fn fail_on(&self, fault: Fault) {
        lock(&self.inner.faults).insert(fault);
    }

    pub fn clear_faults(&self) {
        lock(&self.inner.faults).clear();
    }

    /// Committed state
    pub fn snapshot(&self) -> StoreSnapshot {
        let tables = lock(&self.inner.tables);
        StoreSnapshot {
            profiles: tables.profiles.values().cloned().collect(),
            invitations: tables.invitations.clone(),
            users: tables.users.values().cloned().collect(),
        }
    }

    /// Committed invitations for a profile, oldest first
    pub fn invitations_for(&self, profile_id: i64) -> Vec<Invitation> {
        lock(&self.inner.tables)
            .invitations
            .iter()
            .filter(|i| i.profile_id == profile_id)
            .cloned()
            .collect()
    }

    /// Committed login accounts with this email
    pub fn users_with_email(&self, email: &str) -> Vec<User> {
        lock(&self.inner.tables)
            .users
            .values()
            .filter(|u| u.email == email)
            .cloned()
            .collect()
    }

    pub fn commit_count(&self) -> usize {
        self.inner.commits.load(Ordering::SeqCst)
    }

    pub fn rollback_count(&self) -> usize {
        self.inner.rollbacks.load(Ordering::SeqCst)
    }

    fn allocate_user(&self, data: NewUser) -> User {
        User {
            id: self.inner.next_user_id.fetch_add(1, Ordering::SeqCst),
            email: data.email,
            role: data.role,
        }
    }

    fn check(&self, fault: Fault) -> Result<(), StoreError> {
        if !lock(&self.inner.faults).contains(&fault) {
            return Ok(());
        }

        let message = format!("injected failure at {:?}", fault);
        Err(match fault {
            Fault::Begin | Fault::Ping => StoreError::Connection(message),
            Fault::Commit => StoreError::Commit(message),
            Fault::Rollback => StoreError::Rollback(message),
            _ => StoreError::Database(message),
        })
    }
}

impl Default for MemoryOnboardingStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransactionCoordinator for MemoryOnboardingStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, StoreError> {
        self.check(Fault::Begin)?;
        Ok(MemoryTx {
            view: lock(&self.inner.tables).clone(),
            writes: Vec::new(),
        })
    }

    async fn commit(&self, tx: MemoryTx) -> Result<(), StoreError> {
        self.check(Fault::Commit)?;

        let mut tables = lock(&self.inner.tables);
        let mut next = tables.clone();
        for write in &tx.writes {
            next.apply(write)?;
        }
        *tables = next;
        drop(tables);

        self.inner.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(&self, tx: MemoryTx) -> Result<(), StoreError> {
        drop(tx);
        self.inner.rollbacks.fetch_add(1, Ordering::SeqCst);
        self.check(Fault::Rollback)
    }
}

#[async_trait]
impl OnboardingStore for MemoryOnboardingStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.check(Fault::Ping)
    }

    async fn find_profile(
        &self,
        tx: &mut MemoryTx,
        id: i64,
    ) -> Result<Option<Profile>, StoreError> {
        self.check(Fault::FindProfile)?;
        Ok(tx.view.profiles.get(&id).cloned())
    }

    async fn insert_invitation(
        &self,
        tx: &mut MemoryTx,
        data: NewInvitation,
    ) -> Result<Invitation, StoreError> {
        self.check(Fault::InsertInvitation)?;

        let now = Utc::now();
        let invitation = Invitation {
            profile_id: data.profile_id,
            status: InvitationStatus::Incomplete,
            created_by_id: data.created_by_id,
            updated_by_id: Some(data.created_by_id),
            created_at: now,
            updated_at: now,
        };
        tx.stage(Write::InsertInvitation(invitation.clone()))?;
        Ok(invitation)
    }

    async fn find_incomplete_invitation(
        &self,
        tx: &mut MemoryTx,
        profile_id: i64,
    ) -> Result<Option<Invitation>, StoreError> {
        self.check(Fault::FindInvitation)?;
        Ok(tx.view.latest_incomplete(profile_id).cloned())
    }

    async fn mark_invitation_complete(
        &self,
        tx: &mut MemoryTx,
        profile_id: i64,
        updated_by_id: i64,
    ) -> Result<Option<Invitation>, StoreError> {
        self.check(Fault::CompleteInvitation)?;

        if tx.view.latest_incomplete(profile_id).is_none() {
            return Ok(None);
        }

        tx.stage(Write::CompleteInvitations {
            profile_id,
            updated_by_id,
            at: Utc::now(),
        })?;

        Ok(tx
            .view
            .invitations
            .iter()
            .rev()
            .find(|i| i.profile_id == profile_id)
            .cloned())
    }

    async fn insert_user(&self, tx: &mut MemoryTx, data: NewUser) -> Result<User, StoreError> {
        self.check(Fault::InsertUser)?;

        let user = self.allocate_user(data);
        tx.stage(Write::InsertUser(user.clone()))?;
        Ok(user)
    }

    async fn find_user_by_id(
        &self,
        tx: &mut MemoryTx,
        id: i64,
    ) -> Result<Option<User>, StoreError> {
        self.check(Fault::FindUser)?;
        Ok(tx.view.users.get(&id).cloned())
    }

    async fn find_user_by_email(
        &self,
        tx: &mut MemoryTx,
        email: &str,
    ) -> Result<Option<User>, StoreError> {
        self.check(Fault::FindUser)?;
        Ok(tx.view.users.values().find(|u| u.email == email).cloned())
    }

    async fn delete_users_by_email(
        &self,
        tx: &mut MemoryTx,
        email: &str,
    ) -> Result<u64, StoreError> {
        self.check(Fault::DeleteUser)?;

        let count = tx.view.users.values().filter(|u| u.email == email).count() as u64;
        if count > 0 {
            tx.stage(Write::DeleteUsersByEmail(email.to_string()))?;
        }
        Ok(count)
    }
}
