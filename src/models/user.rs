use std::fmt;
use std::str::FromStr;

use garde::Validate;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::AppError;

/// The role a user holds in the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    Admin,
    SuperAdmin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::User, Role::Admin, Role::SuperAdmin];

    /// Roles allowed into the administration area.
    pub const ADMINISTRATORS: [Role; 2] = [Role::Admin, Role::SuperAdmin];

    /// The wire value, e.g. `SUPER_ADMIN`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
            Role::SuperAdmin => "SUPER_ADMIN",
        }
    }

    /// Human label, e.g. `SUPER ADMIN`.
    pub fn label(&self) -> String {
        self.as_str().replace('_', " ")
    }

    pub fn is_administrator(&self) -> bool {
        Self::ADMINISTRATORS.contains(self)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace([' ', '-'], "_");
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == normalized)
            .ok_or_else(|| AppError::invalid("role", format!("Unknown role '{}'", s)))
    }
}

/// Lifecycle status of an account. Deletion is soft: the row stays visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    #[default]
    Active,
    Suspended,
    Deleted,
}

impl UserStatus {
    pub const ALL: [UserStatus; 3] = [UserStatus::Active, UserStatus::Suspended, UserStatus::Deleted];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "ACTIVE",
            UserStatus::Suspended => "SUSPENDED",
            UserStatus::Deleted => "DELETED",
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        UserStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| AppError::invalid("status", format!("Unknown status '{}'", s)))
    }
}

/// Represents a user account as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// The backend identifier. Some list rows come without one.
    #[serde(default)]
    pub id: Option<i64>,
    /// The login name.
    #[serde(default)]
    pub username: String,
    /// The e-mail address.
    #[serde(default)]
    pub email: String,
    /// The first name.
    #[serde(default)]
    pub firstname: String,
    /// The last name.
    #[serde(default)]
    pub lastname: String,
    /// The national id number, also used to confirm deletions.
    #[serde(default)]
    pub id_number: String,
    /// The user's role.
    pub role: Role,
    /// The account status.
    #[serde(default)]
    pub status: UserStatus,
    /// Creation timestamp, as formatted by the backend.
    #[serde(default)]
    pub created_at: Option<String>,
    /// Optional avatar location.
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.firstname, self.lastname).trim().to_string()
    }

    pub fn is_deleted(&self) -> bool {
        self.status == UserStatus::Deleted
    }
}

/// Payload for `POST /api/users`. Every field is required.
#[derive(Debug, Clone, Default, Serialize, Validate, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    #[garde(length(min = 1))]
    pub username: String,
    #[garde(email)]
    pub email: String,
    #[garde(length(min = 1))]
    pub password: String,
    #[garde(length(min = 1))]
    pub firstname: String,
    #[garde(length(min = 1))]
    pub lastname: String,
    #[garde(length(min = 1))]
    pub id_number: String,
    #[garde(required)]
    #[zeroize(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[garde(required)]
    #[zeroize(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<UserStatus>,
}

/// Payload for `PUT /api/users/{id}`. The password is only sent when it was
/// actually changed.
#[derive(Debug, Clone, Default, Serialize, Validate, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    #[garde(length(min = 1))]
    pub username: String,
    #[garde(email)]
    pub email: String,
    #[garde(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[garde(length(min = 1))]
    pub firstname: String,
    #[garde(length(min = 1))]
    pub lastname: String,
    #[garde(length(min = 1))]
    pub id_number: String,
    #[garde(required)]
    #[zeroize(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[garde(required)]
    #[zeroize(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<UserStatus>,
}

impl UserUpdate {
    /// Pre-fills an update form from an existing user, password left blank.
    pub fn from_user(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            email: user.email.clone(),
            password: None,
            firstname: user.firstname.clone(),
            lastname: user.lastname.clone(),
            id_number: user.id_number.clone(),
            role: Some(user.role),
            status: Some(user.status),
        }
    }

    /// Sets a new password; a blank value means "unchanged".
    pub fn set_password(&mut self, password: &str) {
        self.password = if password.is_empty() {
            None
        } else {
            Some(password.to_string())
        };
    }
}

/// Target of a user deletion: the backend wants the id number echoed back in
/// the request body as confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDeletion {
    pub id: i64,
    pub id_number: String,
}

impl UserDeletion {
    /// The deletion target for `user`, if the row carries an id.
    pub fn for_user(user: &User) -> Option<Self> {
        Some(Self {
            id: user.id?,
            id_number: user.id_number.clone(),
        })
    }
}
