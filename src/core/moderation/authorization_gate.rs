// Who may run administrative commands.
//
// Authorization only gates commands. It has no effect on who gets moderated.

use super::moderation_store::{ModerationStore, StoreError};
use std::sync::Arc;

pub struct AuthorizationGate<S: ModerationStore> {
    store: Arc<S>,
    /// Always authorized, and the only one allowed to grant or revoke.
    root_admin: Option<u64>,
}

impl<S: ModerationStore> AuthorizationGate<S> {
    pub fn new(store: Arc<S>, root_admin: Option<u64>) -> Self {
        Self { store, root_admin }
    }

    pub fn is_root(&self, user_id: u64) -> bool {
        self.root_admin == Some(user_id)
    }

    pub async fn is_authorized(&self, user_id: u64) -> Result<bool, StoreError> {
        if self.is_root(user_id) {
            return Ok(true);
        }
        self.store.is_authorized_user(user_id).await
    }

    /// Returns `false` if the user already had access.
    pub async fn grant(&self, user_id: u64) -> Result<bool, StoreError> {
        let added = self.store.add_authorized_user(user_id).await?;
        if added {
            tracing::info!(user_id, "Granted command access");
        }
        Ok(added)
    }

    /// Returns `false` if the user had no access to revoke.
    pub async fn revoke(&self, user_id: u64) -> Result<bool, StoreError> {
        let removed = self.store.remove_authorized_user(user_id).await?;
        if removed {
            tracing::info!(user_id, "Revoked command access");
        }
        Ok(removed)
    }
}
