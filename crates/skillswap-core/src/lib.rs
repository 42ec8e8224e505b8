//! skillswap-core - Domain models, configuration, and the user directory boundary
//!
//! This crate defines the shared abstractions of the skillswap auth service:
//! - User accounts and the closed role enumeration
//! - The `UserDirectory` trait (user storage is an external collaborator)
//! - Configuration management

pub mod config;
pub mod directory;

pub use config::{AppConfig, AuthConfig, ConfigError, LoggingConfig, ServerConfig};
pub use directory::{DirectoryError, InMemoryUserDirectory, UserDirectory, UserUpdate};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User role enum
///
/// Closed enumeration of access levels in the marketplace:
/// - Admin: operational access including session introspection
/// - Teacher: can publish and run sessions
/// - Student: regular account
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Teacher,
    Student,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Teacher => "teacher",
            UserRole::Student => "student",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "admin" => Some(UserRole::Admin),
            "teacher" => Some(UserRole::Teacher),
            "student" => Some(UserRole::Student),
            _ => None,
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// User account model
///
/// The directory owns these records; the auth service only references them by
/// id and mutates them through [`UserDirectory::update`]. The raw password
/// never appears here, only its Argon2 hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier
    pub id: Uuid,

    /// Email address (unique, matched case-insensitively)
    pub email: String,

    /// Hashed password, never serialized in API responses
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Display name
    pub name: String,

    /// Role in the marketplace
    pub role: UserRole,

    /// Whether the email has been verified
    #[serde(default)]
    pub verified: bool,

    /// Last successful login timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,

    /// When the password was last changed
    pub password_changed_at: DateTime<Utc>,

    /// Account creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new user with the given credentials
    pub fn new(email: String, password_hash: String, name: String, role: UserRole) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email,
            password_hash,
            name,
            role,
            verified: false,
            last_login: None,
            password_changed_at: now,
            created_at: now,
            updated_at: now,
        }
    }
}
