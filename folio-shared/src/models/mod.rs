/// Records touched by the onboarding core
///
/// # Models
///
/// - `profile`: Candidate profiles (read-only to the onboarding core)
/// - `invitation`: Two-phase onboarding state per profile
/// - `user`: Login accounts, including the temporary onboarding account
///
/// Persistence lives in the `store` module; these are plain data types.

pub mod invitation;
pub mod profile;
pub mod user;

pub use invitation::{Invitation, InvitationStatus, NewInvitation};
pub use profile::Profile;
pub use user::{NewUser, User, UserRole};
