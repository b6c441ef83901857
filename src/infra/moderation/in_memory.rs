// In-memory implementation of ModerationStore.
//
// Nothing survives a restart, so this only backs the core service tests.
// DashMap's entry API gives us the per-key atomicity the SQLite store gets
// from single UPSERT statements.

use crate::core::moderation::{GroupPolicy, ModerationStore, PolicyUpdate, StoreError, UserRecord};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::{DashMap, DashSet};

pub struct InMemoryModerationStore {
    bad_words: DashSet<String>,
    policies: DashMap<u64, GroupPolicy>,
    users: DashMap<u64, UserRecord>,
    authorized: DashSet<u64>,
}

impl InMemoryModerationStore {
    pub fn new() -> Self {
        Self {
            bad_words: DashSet::new(),
            policies: DashMap::new(),
            users: DashMap::new(),
            authorized: DashSet::new(),
        }
    }

    fn new_user(user_id: u64, display_name: &str) -> UserRecord {
        UserRecord {
            user_id,
            display_name: display_name.to_string(),
            warn_count: 0,
            first_seen: Utc::now(),
        }
    }
}

impl Default for InMemoryModerationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModerationStore for InMemoryModerationStore {
    async fn initialize(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn add_bad_word(&self, term: &str) -> Result<bool, StoreError> {
        Ok(self.bad_words.insert(term.to_string()))
    }

    async fn remove_bad_word(&self, term: &str) -> Result<bool, StoreError> {
        Ok(self.bad_words.remove(term).is_some())
    }

    async fn list_bad_words(&self) -> Result<Vec<String>, StoreError> {
        let mut words: Vec<String> = self.bad_words.iter().map(|w| w.key().clone()).collect();
        words.sort();
        Ok(words)
    }

    async fn get_group_policy(&self, group_id: u64) -> Result<Option<GroupPolicy>, StoreError> {
        Ok(self.policies.get(&group_id).map(|p| *p))
    }

    async fn update_group_policy(
        &self,
        group_id: u64,
        update: PolicyUpdate,
    ) -> Result<GroupPolicy, StoreError> {
        // The entry guard holds the shard lock, so read-modify-write is atomic per group
        let mut policy = self.policies.entry(group_id).or_default();
        *policy = update.apply(*policy);
        Ok(*policy)
    }

    async fn ensure_user(&self, user_id: u64, display_name: &str) -> Result<(), StoreError> {
        self.users
            .entry(user_id)
            .or_insert_with(|| Self::new_user(user_id, display_name));
        Ok(())
    }

    async fn increment_warn_count(&self, user_id: u64) -> Result<u32, StoreError> {
        let mut user = self
            .users
            .entry(user_id)
            .or_insert_with(|| Self::new_user(user_id, ""));
        user.warn_count = user.warn_count.saturating_add(1);
        Ok(user.warn_count)
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>, StoreError> {
        let mut users: Vec<UserRecord> = self.users.iter().map(|u| u.value().clone()).collect();
        users.sort_by_key(|u| u.user_id);
        Ok(users)
    }

    async fn add_authorized_user(&self, user_id: u64) -> Result<bool, StoreError> {
        Ok(self.authorized.insert(user_id))
    }

    async fn remove_authorized_user(&self, user_id: u64) -> Result<bool, StoreError> {
        Ok(self.authorized.remove(&user_id).is_some())
    }

    async fn is_authorized_user(&self, user_id: u64) -> Result<bool, StoreError> {
        Ok(self.authorized.contains(&user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_store() {
        let store = InMemoryModerationStore::new();

        assert!(store.add_bad_word("foo").await.unwrap());
        assert!(!store.add_bad_word("foo").await.unwrap());
        assert!(store.add_bad_word("bar").await.unwrap());
        assert_eq!(store.list_bad_words().await.unwrap(), vec!["bar", "foo"]);

        assert!(store.remove_bad_word("foo").await.unwrap());
        assert!(!store.remove_bad_word("foo").await.unwrap());
    }

    #[tokio::test]
    async fn test_policy_upsert() {
        let store = InMemoryModerationStore::new();
        assert!(store.get_group_policy(1).await.unwrap().is_none());

        let policy = store
            .update_group_policy(1, PolicyUpdate::ban(true))
            .await
            .unwrap();

        assert_eq!(
            policy,
            GroupPolicy {
                kick_enabled: false,
                ban_enabled: true
            }
        );
        assert_eq!(store.get_group_policy(1).await.unwrap(), Some(policy));
    }

    #[tokio::test]
    async fn test_warn_keeps_display_name() {
        let store = InMemoryModerationStore::new();
        store.ensure_user(8, "Eve").await.unwrap();

        assert_eq!(store.increment_warn_count(8).await.unwrap(), 1);
        assert_eq!(store.increment_warn_count(8).await.unwrap(), 2);

        let users = store.list_users().await.unwrap();
        assert_eq!(users[0].display_name, "Eve");
        assert_eq!(users[0].warn_count, 2);
    }
}
