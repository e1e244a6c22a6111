/// Invitation workflow
///
/// Each operation runs inside exactly one [`UnitOfWork`]. The body is an
/// inner function whose result always goes through `resolve`, so every early
/// return is committed or rolled back like the happy path.
///
/// Notifications are dispatched from inside the body but are not part of
/// the transaction: a rolled-back invitation may still have emailed its
/// recipient, and a failed delivery never rolls anything back.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use folio_shared::notify::{LogMailer, NotificationDispatcher, RetryPolicy};
/// use folio_shared::onboarding::{InvitationWorkflow, OnboardingError};
/// use folio_shared::store::MemoryOnboardingStore;
///
/// # async fn example() -> Result<(), OnboardingError> {
/// let store = Arc::new(MemoryOnboardingStore::new());
/// let dispatcher = NotificationDispatcher::new(Arc::new(LogMailer), RetryPolicy::default(), 32);
/// let workflow = InvitationWorkflow::new(store, dispatcher);
///
/// let sent = workflow.send_invitation(42, 1).await?;
/// let completed = workflow.complete_invitation(42, 2).await?;
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};

use super::{Missing, OnboardingError};
use crate::db::UnitOfWork;
use crate::models::{Invitation, NewInvitation, NewUser, User};
use crate::notify::{DispatchHandle, Notification, NotificationDispatcher};
use crate::store::OnboardingStore;

/// Result of a successful `send_invitation`
#[derive(Debug)]
pub struct InvitationSent {
    /// The new `Incomplete` invitation
    pub invitation: Invitation,

    /// Temporary login account for the profile email
    pub account: User,

    /// Delivery of the invitation email
    pub delivery: DispatchHandle,
}

/// Result of a successful `complete_invitation`
#[derive(Debug)]
pub struct InvitationCompleted {
    /// The invitation, now `Complete`
    pub invitation: Invitation,

    /// Login accounts deleted for the profile email
    pub revoked_accounts: u64,

    /// Delivery of the completion email to the inviting admin
    pub delivery: DispatchHandle,
}

/// Two-phase onboarding over an [`OnboardingStore`]
pub struct InvitationWorkflow<S: OnboardingStore> {
    store: Arc<S>,
    dispatcher: NotificationDispatcher,
}

impl<S: OnboardingStore> Clone for InvitationWorkflow<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            dispatcher: self.dispatcher.clone(),
        }
    }
}

impl<S: OnboardingStore> InvitationWorkflow<S> {
    pub fn new(store: Arc<S>, dispatcher: NotificationDispatcher) -> Self {
        Self { store, dispatcher }
    }

    pub fn dispatcher(&self) -> &NotificationDispatcher {
        &self.dispatcher
    }

    /// Invites a profile: `NotSent -> Incomplete`
    ///
    /// Emails the profile, records an `Incomplete` invitation created by
    /// `acting_user_id`, and creates an `Employee` login for the profile
    /// email.
    ///
    /// # Errors
    ///
    /// - `NotFound(Profile)` if the profile does not exist
    /// - `Store(_)` if any store call, the commit or the rollback fails
    pub async fn send_invitation(
        &self,
        profile_id: i64,
        acting_user_id: i64,
    ) -> Result<InvitationSent, OnboardingError> {
        let span = info_span!("send_invitation", profile_id, acting_user_id);
        let result = self
            .send_unit(profile_id, acting_user_id)
            .instrument(span.clone())
            .await;

        span.in_scope(|| match &result {
            Ok(sent) => info!(account_id = sent.account.id, "Invitation sent"),
            Err(e) => warn!(error = %e, "Invitation not sent"),
        });

        result
    }

    async fn send_unit(
        &self,
        profile_id: i64,
        acting_user_id: i64,
    ) -> Result<InvitationSent, OnboardingError> {
        let mut uow = UnitOfWork::begin(self.store.as_ref()).await?;
        let result = self.send_within(uow.tx(), profile_id, acting_user_id).await;
        uow.resolve(result).await
    }

    async fn send_within(
        &self,
        tx: &mut S::Tx,
        profile_id: i64,
        acting_user_id: i64,
    ) -> Result<InvitationSent, OnboardingError> {
        let profile = self
            .store
            .find_profile(tx, profile_id)
            .await?
            .ok_or(OnboardingError::NotFound(Missing::Profile(profile_id)))?;

        let delivery = self.dispatcher.dispatch(Notification::profile_invitation(&profile));

        let invitation = self
            .store
            .insert_invitation(
                tx,
                NewInvitation {
                    profile_id,
                    created_by_id: acting_user_id,
                },
            )
            .await?;

        let account = self
            .store
            .insert_user(tx, NewUser::employee(profile.email))
            .await?;

        Ok(InvitationSent {
            invitation,
            account,
            delivery,
        })
    }

    /// Completes a profile: `Incomplete -> Complete`
    ///
    /// Emails the admin who sent the invitation, marks the invitation
    /// `Complete` on behalf of `acting_user_id`, and deletes the temporary
    /// login account(s) for the profile email.
    ///
    /// # Errors
    ///
    /// - `NotFound(IncompleteInvitation)` if the profile was never invited
    ///   or is already complete; nothing is written
    /// - `NotFound(Inviter)` if the inviting account is gone
    /// - `NotFound(Profile)` if the profile was deleted
    /// - `Store(_)` if any store call, the commit or the rollback fails
    pub async fn complete_invitation(
        &self,
        profile_id: i64,
        acting_user_id: i64,
    ) -> Result<InvitationCompleted, OnboardingError> {
        let span = info_span!("complete_invitation", profile_id, acting_user_id);
        let result = self
            .complete_unit(profile_id, acting_user_id)
            .instrument(span.clone())
            .await;

        span.in_scope(|| match &result {
            Ok(completed) => info!(
                revoked_accounts = completed.revoked_accounts,
                "Invitation completed"
            ),
            Err(e) => warn!(error = %e, "Invitation not completed"),
        });

        result
    }

    async fn complete_unit(
        &self,
        profile_id: i64,
        acting_user_id: i64,
    ) -> Result<InvitationCompleted, OnboardingError> {
        let mut uow = UnitOfWork::begin(self.store.as_ref()).await?;
        let result = self
            .complete_within(uow.tx(), profile_id, acting_user_id)
            .await;
        uow.resolve(result).await
    }

    async fn complete_within(
        &self,
        tx: &mut S::Tx,
        profile_id: i64,
        acting_user_id: i64,
    ) -> Result<InvitationCompleted, OnboardingError> {
        let pending = self
            .store
            .find_incomplete_invitation(tx, profile_id)
            .await?
            .ok_or(OnboardingError::NotFound(Missing::IncompleteInvitation(profile_id)))?;

        let inviter = self
            .store
            .find_user_by_id(tx, pending.created_by_id)
            .await?
            .ok_or(OnboardingError::NotFound(Missing::Inviter(pending.created_by_id)))?;

        let delivery = self
            .dispatcher
            .dispatch(Notification::profile_completed(&inviter.email, profile_id));

        let invitation = self
            .store
            .mark_invitation_complete(tx, profile_id, acting_user_id)
            .await?
            .ok_or(OnboardingError::NotFound(Missing::IncompleteInvitation(profile_id)))?;

        let profile = self
            .store
            .find_profile(tx, profile_id)
            .await?
            .ok_or(OnboardingError::NotFound(Missing::Profile(profile_id)))?;

        let revoked_accounts = self.store.delete_users_by_email(tx, &profile.email).await?;

        Ok(InvitationCompleted {
            invitation,
            revoked_accounts,
            delivery,
        })
    }
}
