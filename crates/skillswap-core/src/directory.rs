//! User directory boundary
//!
//! User storage is an external collaborator of the auth service: the service
//! looks accounts up, creates them on registration, and pushes narrow updates
//! (last login, password hash). The [`UserDirectory`] trait is that boundary;
//! [`InMemoryUserDirectory`] is the implementation used in tests and
//! single-node deployments. A durable backend implements the same trait.

use crate::{User, UserRole};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Directory errors
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("User not found")]
    UserNotFound,

    #[error("Email already exists")]
    EmailAlreadyExists,

    #[error("Directory storage error: {0}")]
    Storage(String),
}

/// Partial update applied through the directory.
///
/// Only the fields the auth service is allowed to touch; `None` leaves a
/// field unchanged.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub role: Option<UserRole>,
    pub verified: Option<bool>,
    pub password_hash: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
}

impl UserUpdate {
    pub fn last_login(at: DateTime<Utc>) -> Self {
        Self {
            last_login: Some(at),
            ..Default::default()
        }
    }

    pub fn password_hash(hash: String) -> Self {
        Self {
            password_hash: Some(hash),
            ..Default::default()
        }
    }
}

/// External user storage consumed by the auth service.
///
/// Email lookups are case-insensitive; `create` enforces email uniqueness
/// under that comparison.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<User, DirectoryError>;

    async fn find_by_id(&self, id: Uuid) -> Result<User, DirectoryError>;

    async fn create(&self, user: User) -> Result<User, DirectoryError>;

    async fn update(&self, id: Uuid, update: UserUpdate) -> Result<User, DirectoryError>;
}

/// In-memory user directory keyed by user id
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored accounts
    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

impl Default for InMemoryUserDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_email(&self, email: &str) -> Result<User, DirectoryError> {
        let needle = email.to_lowercase();
        let users = self.users.read().await;
        users
            .values()
            .find(|u| u.email.to_lowercase() == needle)
            .cloned()
            .ok_or(DirectoryError::UserNotFound)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<User, DirectoryError> {
        let users = self.users.read().await;
        users.get(&id).cloned().ok_or(DirectoryError::UserNotFound)
    }

    async fn create(&self, user: User) -> Result<User, DirectoryError> {
        let needle = user.email.to_lowercase();
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email.to_lowercase() == needle) {
            return Err(DirectoryError::EmailAlreadyExists);
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, id: Uuid, update: UserUpdate) -> Result<User, DirectoryError> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&id).ok_or(DirectoryError::UserNotFound)?;

        if let Some(name) = update.name {
            user.name = name;
        }
        if let Some(role) = update.role {
            user.role = role;
        }
        if let Some(verified) = update.verified {
            user.verified = verified;
        }
        if let Some(hash) = update.password_hash {
            user.password_hash = hash;
            user.password_changed_at = Utc::now();
        }
        if let Some(at) = update.last_login {
            user.last_login = Some(at);
        }
        user.updated_at = Utc::now();

        Ok(user.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user(email: &str) -> User {
        User::new(
            email.to_string(),
            "hash".to_string(),
            "Sample".to_string(),
            UserRole::Student,
        )
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let dir = InMemoryUserDirectory::new();
        let user = dir.create(sample_user("alice@example.com")).await.unwrap();

        let by_id = dir.find_by_id(user.id).await.unwrap();
        assert_eq!(by_id.email, "alice@example.com");

        let by_email = dir.find_by_email("alice@example.com").await.unwrap();
        assert_eq!(by_email.id, user.id);
    }

    #[tokio::test]
    async fn test_email_lookup_is_case_insensitive() {
        let dir = InMemoryUserDirectory::new();
        dir.create(sample_user("Alice@Example.com")).await.unwrap();

        assert!(dir.find_by_email("alice@example.com").await.is_ok());
        assert!(dir.find_by_email("ALICE@EXAMPLE.COM").await.is_ok());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected_case_insensitively() {
        let dir = InMemoryUserDirectory::new();
        dir.create(sample_user("alice@example.com")).await.unwrap();

        let result = dir.create(sample_user("ALICE@example.com")).await;
        assert!(matches!(result, Err(DirectoryError::EmailAlreadyExists)));
        assert_eq!(dir.len().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_user_not_found() {
        let dir = InMemoryUserDirectory::new();
        assert!(matches!(
            dir.find_by_email("ghost@example.com").await,
            Err(DirectoryError::UserNotFound)
        ));
        assert!(matches!(
            dir.find_by_id(Uuid::new_v4()).await,
            Err(DirectoryError::UserNotFound)
        ));
    }

    #[tokio::test]
    async fn test_update_password_hash_stamps_changed_at() {
        let dir = InMemoryUserDirectory::new();
        let user = dir.create(sample_user("alice@example.com")).await.unwrap();
        let before = user.password_changed_at;

        let updated = dir
            .update(user.id, UserUpdate::password_hash("new-hash".to_string()))
            .await
            .unwrap();

        assert_eq!(updated.password_hash, "new-hash");
        assert!(updated.password_changed_at >= before);
    }

    #[tokio::test]
    async fn test_update_last_login() {
        let dir = InMemoryUserDirectory::new();
        let user = dir.create(sample_user("alice@example.com")).await.unwrap();

        let at = Utc::now();
        let updated = dir.update(user.id, UserUpdate::last_login(at)).await.unwrap();
        assert_eq!(updated.last_login, Some(at));
    }
}
