/// Invitation endpoints
///
/// # Endpoints
///
/// - `POST /profiles/:id/invite` - Invite a profile to complete itself
/// - `POST /profiles/:id/admin_invite` - Mark the profile complete
///
/// Both act on behalf of the authenticated user. Notification delivery
/// happens in the background and never changes the response.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use folio_shared::{
    auth::AuthContext,
    models::{Invitation, User},
    store::OnboardingStore,
};
use serde::{Deserialize, Serialize};

/// Response to a sent invitation
#[derive(Debug, Serialize, Deserialize)]
pub struct InvitationSentResponse {
    pub invitation: Invitation,

    /// Temporary login account created for the profile email
    pub account: User,

    /// ID of the queued invitation email
    pub notification_id: String,
}

/// Response to a completed invitation
#[derive(Debug, Serialize, Deserialize)]
pub struct InvitationCompletedResponse {
    pub invitation: Invitation,

    /// Login accounts removed for the profile email
    pub revoked_accounts: u64,

    /// ID of the queued completion email
    pub notification_id: String,
}

fn check_profile_id(id: i64) -> ApiResult<i64> {
    if id <= 0 {
        return Err(ApiError::BadRequest(format!("Invalid profile id: {}", id)));
    }
    Ok(id)
}

/// Send an invitation
///
/// # Errors
///
/// - `400 Bad Request`: Invalid profile id
/// - `401 Unauthorized`: Rejected by the session gate
/// - `404 Not Found`: Profile does not exist
/// - `500`/`502`: Store or transaction failure
pub async fn send_invitation<S: OnboardingStore>(
    State(state): State<AppState<S>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> ApiResult<Json<InvitationSentResponse>> {
    let profile_id = check_profile_id(id)?;

    let sent = state.workflow.send_invitation(profile_id, auth.user_id).await?;

    Ok(Json(InvitationSentResponse {
        notification_id: sent.delivery.notification_id().to_string(),
        invitation: sent.invitation,
        account: sent.account,
    }))
}

/// Complete an invitation
///
/// # Errors
///
/// - `400 Bad Request`: Invalid profile id
/// - `401 Unauthorized`: Rejected by the session gate
/// - `404 Not Found`: No incomplete invitation, or its inviter is gone
/// - `500`/`502`: Store or transaction failure
pub async fn complete_invitation<S: OnboardingStore>(
    State(state): State<AppState<S>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> ApiResult<Json<InvitationCompletedResponse>> {
    let profile_id = check_profile_id(id)?;

    let completed = state
        .workflow
        .complete_invitation(profile_id, auth.user_id)
        .await?;

    Ok(Json(InvitationCompletedResponse {
        notification_id: completed.delivery.notification_id().to_string(),
        invitation: completed.invitation,
        revoked_accounts: completed.revoked_accounts,
    }))
}
