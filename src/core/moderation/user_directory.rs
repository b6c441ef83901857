// Known users and their cumulative warning counts.
//
// The warn count is a pure audit counter: nothing reads it to escalate.

use super::moderation_models::UserRecord;
use super::moderation_store::{ModerationStore, StoreError};
use std::sync::Arc;

pub struct UserDirectory<S: ModerationStore> {
    store: Arc<S>,
}

impl<S: ModerationStore> UserDirectory<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Register a user on first sight. The first display name sticks.
    pub async fn ensure(&self, user_id: u64, display_name: &str) -> Result<(), StoreError> {
        self.store.ensure_user(user_id, display_name).await
    }

    /// Record one warning and return the new total.
    pub async fn warn(&self, user_id: u64) -> Result<u32, StoreError> {
        self.store.increment_warn_count(user_id).await
    }

    pub async fn list(&self) -> Result<Vec<UserRecord>, StoreError> {
        self.store.list_users().await
    }
}
