// Storage port for the moderation system.
//
// Core only talks to this trait; infra provides SQLite and in-memory versions.

use super::moderation_models::{GroupPolicy, PolicyUpdate, UserRecord};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    StorageError(String),
}

/// Atomic persistence operations backing the registry, policies, users and
/// authorized users.
///
/// Terms passed in are already normalized by the caller.
#[async_trait]
pub trait ModerationStore: Send + Sync {
    /// Create tables / prepare the backend. Called once at startup.
    async fn initialize(&self) -> Result<(), StoreError>;

    /// Insert a term. Returns `false` if it was already present.
    async fn add_bad_word(&self, term: &str) -> Result<bool, StoreError>;

    /// Delete a term. Returns `false` if it was absent.
    async fn remove_bad_word(&self, term: &str) -> Result<bool, StoreError>;

    async fn list_bad_words(&self) -> Result<Vec<String>, StoreError>;

    /// Stored policy for a group, `None` if the group has no row.
    async fn get_group_policy(&self, group_id: u64) -> Result<Option<GroupPolicy>, StoreError>;

    /// Upsert a group's policy in one atomic step and return the result.
    async fn update_group_policy(
        &self,
        group_id: u64,
        update: PolicyUpdate,
    ) -> Result<GroupPolicy, StoreError>;

    /// Insert a user if absent. Never overwrites an existing display name.
    async fn ensure_user(&self, user_id: u64, display_name: &str) -> Result<(), StoreError>;

    /// Atomically increment and return a user's warn count, creating the row if needed.
    async fn increment_warn_count(&self, user_id: u64) -> Result<u32, StoreError>;

    /// All users, ordered by id.
    async fn list_users(&self) -> Result<Vec<UserRecord>, StoreError>;

    /// Returns `false` if the user was already authorized.
    async fn add_authorized_user(&self, user_id: u64) -> Result<bool, StoreError>;

    /// Returns `false` if the user was not authorized.
    async fn remove_authorized_user(&self, user_id: u64) -> Result<bool, StoreError>;

    async fn is_authorized_user(&self, user_id: u64) -> Result<bool, StoreError>;
}
