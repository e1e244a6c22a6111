/// Profile onboarding
///
/// An admin invites a profile; the profile owner fills it in; an admin marks
/// it complete. Per profile the invitation moves through:
///
/// ```text
/// NotSent ──send_invitation──> Incomplete ──complete_invitation──> Complete
/// ```
///
/// `Complete` is terminal. While a profile is `Incomplete` its email has a
/// temporary `Employee` login account; completing the invitation deletes it.
///
/// See [`InvitationWorkflow`] for the steps of each transition.

use std::fmt;

use crate::store::StoreError;

pub mod workflow;

pub use workflow::{InvitationCompleted, InvitationSent, InvitationWorkflow};

/// The record a workflow step could not find
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    Profile(i64),

    /// No `Incomplete` invitation for the profile: never invited, or
    /// already completed
    IncompleteInvitation(i64),

    /// The login account that sent the invitation no longer exists
    Inviter(i64),
}

impl fmt::Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Missing::Profile(id) => write!(f, "Profile {}", id),
            Missing::IncompleteInvitation(id) => {
                write!(f, "Incomplete invitation for profile {}", id)
            }
            Missing::Inviter(id) => write!(f, "Inviting user {}", id),
        }
    }
}

/// Onboarding failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OnboardingError {
    #[error("{0} not found")]
    NotFound(Missing),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl OnboardingError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, OnboardingError::NotFound(_))
    }
}
