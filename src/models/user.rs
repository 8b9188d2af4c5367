use chrono::{DateTime, Utc};
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role of a back-office staff member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSql, FromSql)]
#[postgres(name = "user_role")]
pub enum UserRole {
    /// Full back-office access, including user management.
    #[postgres(name = "ADMIN")]
    #[serde(rename = "ADMIN")]
    Admin,
    /// Manages packages, bookings and testimonials.
    #[postgres(name = "MANAGER")]
    #[serde(rename = "MANAGER")]
    Manager,
    /// Works inquiries and bookings.
    #[postgres(name = "AGENT")]
    #[serde(rename = "AGENT")]
    Agent,
}

impl UserRole {
    /// The wire name of the role, as stored and serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "ADMIN",
            UserRole::Manager => "MANAGER",
            UserRole::Agent => "AGENT",
        }
    }
}

/// Represents a back-office user.
///
/// The password hash is excluded from serialization by name, so every
/// response that embeds a `User` is already sanitized while any field
/// added later flows through automatically.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// The unique identifier for the user.
    pub id: Uuid,
    /// The user's email address, stored lowercase.
    pub email: String,
    /// The user's first name.
    pub first_name: String,
    /// The user's last name.
    pub last_name: String,
    /// The user's hashed password. Never serialized.
    #[serde(skip_serializing)]
    pub password: String,
    /// The user's role.
    pub role: UserRole,
    /// Whether the user may log in.
    pub is_active: bool,
    /// The timestamp of the user's last successful login.
    pub last_login: Option<DateTime<Utc>>,
    /// The timestamp when the user was created.
    pub created_at: DateTime<Utc>,
    /// The timestamp when the user was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Per-role boolean flags returned by the `me` endpoint.
///
/// A convenience projection of the single `role` field, not separate state.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Permissions {
    pub is_admin: bool,
    pub is_manager: bool,
    pub is_agent: bool,
}

impl From<UserRole> for Permissions {
    fn from(role: UserRole) -> Self {
        Permissions {
            is_admin: role == UserRole::Admin,
            is_manager: role == UserRole::Manager,
            is_agent: role == UserRole::Agent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "agent@sunward.test".to_string(),
            first_name: "Ana".to_string(),
            last_name: "Reyes".to_string(),
            password: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$hash".to_string(),
            role: UserRole::Agent,
            is_active: true,
            last_login: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn serialized_user_has_no_password_field() {
        let value = serde_json::to_value(sample_user()).unwrap();
        let object = value.as_object().unwrap();
        assert!(!object.contains_key("password"));
        assert_eq!(object["email"], "agent@sunward.test");
        assert_eq!(object["role"], "AGENT");
        assert_eq!(object["isActive"], true);
    }

    #[test]
    fn permissions_projection_sets_exactly_one_flag() {
        let admin = Permissions::from(UserRole::Admin);
        assert!(admin.is_admin && !admin.is_manager && !admin.is_agent);

        let manager = Permissions::from(UserRole::Manager);
        assert!(!manager.is_admin && manager.is_manager && !manager.is_agent);

        let agent = Permissions::from(UserRole::Agent);
        assert!(!agent.is_admin && !agent.is_manager && agent.is_agent);
    }

    #[test]
    fn permissions_serialize_camel_case() {
        let value = serde_json::to_value(Permissions::from(UserRole::Manager)).unwrap();
        assert_eq!(value["isAdmin"], false);
        assert_eq!(value["isManager"], true);
        assert_eq!(value["isAgent"], false);
    }
}
