// Per-group enforcement policy (kick/ban toggles).

use super::moderation_models::{GroupPolicy, PolicyUpdate};
use super::moderation_store::{ModerationStore, StoreError};
use std::sync::Arc;

pub struct GroupPolicyStore<S: ModerationStore> {
    store: Arc<S>,
}

impl<S: ModerationStore> GroupPolicyStore<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Policy for a group. Unknown groups get the all-disabled default; no row is created.
    pub async fn get(&self, group_id: u64) -> Result<GroupPolicy, StoreError> {
        Ok(self
            .store
            .get_group_policy(group_id)
            .await?
            .unwrap_or_default())
    }

    /// Upsert the fields set in `update`, leaving the others as they were.
    pub async fn update(
        &self,
        group_id: u64,
        update: PolicyUpdate,
    ) -> Result<GroupPolicy, StoreError> {
        let policy = self.store.update_group_policy(group_id, update).await?;
        tracing::info!(
            group_id,
            kick_enabled = policy.kick_enabled,
            ban_enabled = policy.ban_enabled,
            "Group policy updated"
        );
        Ok(policy)
    }
}
