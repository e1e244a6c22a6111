/// Profile model
///
/// Profiles are created and edited by the profile CRUD handlers. The
/// onboarding core only reads them, and only cares about `id` and `email`.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE profiles (
///     id BIGSERIAL PRIMARY KEY,
///     email VARCHAR(255) NOT NULL,
///     full_name VARCHAR(255),
///     ...
/// );
/// ```

use serde::{Deserialize, Serialize};

/// A candidate profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    /// Profile ID
    pub id: i64,

    /// Contact email; onboarding mail and the temporary login use it
    pub email: String,

    /// Display name, if the profile has one
    pub full_name: Option<String>,
}

impl Profile {
    /// Creates a profile record
    pub fn new(id: i64, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            full_name: None,
        }
    }

    /// Sets the display name
    pub fn with_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }

    /// Name to greet the profile owner with
    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.email)
    }
}
