/// User-login account model
///
/// Admins hold permanent accounts. Employees get a temporary account when
/// their profile is invited; it is deleted once the profile is completed, so
/// an employee account exists exactly while its profile has an `Incomplete`
/// invitation.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE user_role AS ENUM ('employee', 'admin');
///
/// CREATE TABLE users (
///     id BIGSERIAL PRIMARY KEY,
///     email VARCHAR(255) NOT NULL,
///     role user_role NOT NULL DEFAULT 'employee'
/// );
/// ```

use serde::{Deserialize, Serialize};

/// Role of a login account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Profile owner going through onboarding
    Employee,

    /// Staff member who invites profiles
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Employee => "employee",
            UserRole::Admin => "admin",
        }
    }
}

/// A login account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Account ID; carried in session tokens as `userID`
    pub id: i64,

    pub email: String,

    pub role: UserRole,
}

/// Input for inserting a login account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub role: UserRole,
}

impl NewUser {
    /// Temporary onboarding account for a profile email
    pub fn employee(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            role: UserRole::Employee,
        }
    }

    pub fn admin(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            role: UserRole::Admin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_constructors() {
        let employee = NewUser::employee("a@x.com");
        assert_eq!(employee.role, UserRole::Employee);
        assert_eq!(employee.email, "a@x.com");

        assert_eq!(NewUser::admin("boss@x.com").role, UserRole::Admin);
    }

    #[test]
    fn test_role_as_str() {
        assert_eq!(UserRole::Employee.as_str(), "employee");
        assert_eq!(UserRole::Admin.as_str(), "admin");
    }
}
