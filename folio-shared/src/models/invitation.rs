/// Invitation model
///
/// An invitation tracks the two-phase onboarding of a profile. Sending one
/// creates an `Incomplete` row; completing it flips the row to `Complete`,
/// which is terminal for the cycle.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE invitations (
///     profile_id BIGINT NOT NULL REFERENCES profiles(id),
///     is_profile_complete BOOLEAN NOT NULL DEFAULT FALSE,
///     created_by_id BIGINT NOT NULL,
///     updated_by_id BIGINT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// There is deliberately no uniqueness constraint on `profile_id`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Profile-complete flag of an invitation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    /// Invitation sent, profile not yet completed
    Incomplete,

    /// Profile completed; the onboarding account has been removed
    Complete,
}

impl InvitationStatus {
    /// Maps the persisted `is_profile_complete` column
    pub fn from_flag(is_profile_complete: bool) -> Self {
        if is_profile_complete {
            InvitationStatus::Complete
        } else {
            InvitationStatus::Incomplete
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Incomplete => "incomplete",
            InvitationStatus::Complete => "complete",
        }
    }
}

impl fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Onboarding invitation for a profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    /// Invited profile
    pub profile_id: i64,

    /// Incomplete until the profile is completed
    pub status: InvitationStatus,

    /// Admin who sent the invitation
    pub created_by_id: i64,

    /// Last user to change the row
    pub updated_by_id: Option<i64>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Invitation {
    /// Whether the invitation is still waiting for completion
    pub fn is_incomplete(&self) -> bool {
        self.status == InvitationStatus::Incomplete
    }
}

/// Input for inserting an invitation
///
/// New invitations always start `Incomplete`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInvitation {
    /// Invited profile
    pub profile_id: i64,

    /// Admin sending the invitation
    pub created_by_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_flag_mapping() {
        assert_eq!(InvitationStatus::from_flag(false), InvitationStatus::Incomplete);
        assert_eq!(InvitationStatus::from_flag(true), InvitationStatus::Complete);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&InvitationStatus::Incomplete).unwrap();
        assert_eq!(json, "\"incomplete\"");
        assert_eq!(InvitationStatus::Complete.to_string(), "complete");
    }
}
