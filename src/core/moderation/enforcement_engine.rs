// Enforcement engine - runs one message event through the moderation pipeline.
//
// Received -> Classified -> Clean: done
//                        -> Offensive: delete -> resolve policy -> kick? -> ban?
//                           (each with a notice on success) -> record warning -> done
//
// Every chat-admin call is best effort: a failure or timeout is logged once
// and the pipeline moves on to the next step. There are no retries.

use super::group_policy_store::GroupPolicyStore;
use super::message_classifier::{MessageClassifier, SemanticClassifier};
use super::moderation_models::{
    ActionOutcome, ChatRef, Detection, EnforcementReport, GroupPolicy, IncomingMessage,
    MessageRef, ModerationOutcome, Sanction, SkipReason, Verdict,
};
use super::moderation_store::ModerationStore;
use super::user_directory::UserDirectory;
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Chat API error: {0}")]
    Api(String),

    #[error("Not a group chat")]
    NotAGroup,
}

/// Chat platform operations the engine needs.
///
/// The Discord layer implements this; tests use a recording double.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_message(&self, chat: &ChatRef, text: &str) -> Result<(), TransportError>;

    async fn delete_message(&self, message: &MessageRef) -> Result<(), TransportError>;

    async fn kick(&self, chat: &ChatRef, user_id: u64) -> Result<(), TransportError>;

    async fn ban(&self, chat: &ChatRef, user_id: u64) -> Result<(), TransportError>;

    async fn list_administrators(&self, chat: &ChatRef) -> Result<HashSet<u64>, TransportError>;
}

/// Notice posted after a successful kick or ban.
pub fn sanction_notice(sanction: Sanction, display_name: &str) -> String {
    format!(
        "🚫 {} has been {} for using inappropriate language.",
        display_name,
        sanction.past_tense()
    )
}

struct CachedAdmins {
    ids: Arc<HashSet<u64>>,
    fetched_at: Instant,
}

/// Short-lived per-group cache of administrator ids.
pub struct AdminCache {
    ttl: Duration,
    entries: DashMap<u64, CachedAdmins>,
}

impl AdminCache {
    /// A zero `ttl` disables caching.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    fn fresh(&self, group_id: u64) -> Option<Arc<HashSet<u64>>> {
        if self.ttl.is_zero() {
            return None;
        }
        self.entries
            .get(&group_id)
            .filter(|cached| cached.fetched_at.elapsed() < self.ttl)
            .map(|cached| Arc::clone(&cached.ids))
    }

    fn store(&self, group_id: u64, ids: Arc<HashSet<u64>>) {
        if self.ttl.is_zero() {
            return;
        }
        self.entries.insert(
            group_id,
            CachedAdmins {
                ids,
                fetched_at: Instant::now(),
            },
        );
    }

    pub fn invalidate(&self, group_id: u64) {
        self.entries.remove(&group_id);
    }
}

pub struct EnforcementEngine<S: ModerationStore, C: SemanticClassifier> {
    classifier: Arc<MessageClassifier<S, C>>,
    policies: Arc<GroupPolicyStore<S>>,
    users: Arc<UserDirectory<S>>,
    admins: AdminCache,
    action_timeout: Duration,
}

impl<S: ModerationStore, C: SemanticClassifier> EnforcementEngine<S, C> {
    pub fn new(
        classifier: Arc<MessageClassifier<S, C>>,
        policies: Arc<GroupPolicyStore<S>>,
        users: Arc<UserDirectory<S>>,
        admin_cache_ttl: Duration,
        action_timeout: Duration,
    ) -> Self {
        Self {
            classifier,
            policies,
            users,
            admins: AdminCache::new(admin_cache_ttl),
            action_timeout,
        }
    }

    pub fn admin_cache(&self) -> &AdminCache {
        &self.admins
    }

    /// Handle one inbound message. Never fails: every problem ends up in the log
    /// and in the returned outcome.
    pub async fn handle_message<T>(&self, transport: &T, message: &IncomingMessage) -> ModerationOutcome
    where
        T: ChatTransport + ?Sized,
    {
        let chat = message.message.chat;
        let Some(group_id) = chat.group_id else {
            return ModerationOutcome::Skipped(SkipReason::NotAGroup);
        };

        if message.text.trim().is_empty() {
            return ModerationOutcome::Skipped(SkipReason::EmptyText);
        }

        if self.is_admin(transport, &chat, group_id, message.author_id).await {
            return ModerationOutcome::Skipped(SkipReason::Administrator);
        }

        let detection = match self.classifier.classify(&message.text).await {
            Verdict::Clean => return ModerationOutcome::Clean,
            Verdict::Offensive(detection) => detection,
        };

        tracing::info!(
            group_id,
            user_id = message.author_id,
            term = detection.term(),
            "Offensive message detected"
        );

        let report = self.enforce(transport, message, group_id, detection).await;
        ModerationOutcome::Enforced(report)
    }

    async fn enforce<T>(
        &self,
        transport: &T,
        message: &IncomingMessage,
        group_id: u64,
        detection: Detection,
    ) -> EnforcementReport
    where
        T: ChatTransport + ?Sized,
    {
        let chat = message.message.chat;
        let user_id = message.author_id;

        let deleted = self
            .run_action("delete message", transport.delete_message(&message.message))
            .await;

        let policy = match self.policies.get(group_id).await {
            Ok(policy) => policy,
            Err(e) => {
                tracing::error!(group_id, error = %e, "Failed to load group policy, skipping kick/ban");
                GroupPolicy::default()
            }
        };

        let mut notifications = Vec::new();

        let kicked = if policy.kick_enabled {
            let outcome = self.run_action("kick", transport.kick(&chat, user_id)).await;
            if outcome.is_completed() {
                notifications.push(self.notify(transport, &chat, Sanction::Kick, &message.author_name).await);
            }
            Some(outcome)
        } else {
            None
        };

        let banned = if policy.ban_enabled {
            let outcome = self.run_action("ban", transport.ban(&chat, user_id)).await;
            if outcome.is_completed() {
                notifications.push(self.notify(transport, &chat, Sanction::Ban, &message.author_name).await);
            }
            Some(outcome)
        } else {
            None
        };

        let warn_count = self.record_warning(user_id, &message.author_name).await;

        EnforcementReport {
            detection,
            deleted,
            policy,
            kicked,
            banned,
            notifications,
            warn_count,
        }
    }

    async fn is_admin<T>(&self, transport: &T, chat: &ChatRef, group_id: u64, user_id: u64) -> bool
    where
        T: ChatTransport + ?Sized,
    {
        if let Some(ids) = self.admins.fresh(group_id) {
            return ids.contains(&user_id);
        }

        match tokio::time::timeout(self.action_timeout, transport.list_administrators(chat)).await {
            Ok(Ok(ids)) => {
                let ids = Arc::new(ids);
                self.admins.store(group_id, Arc::clone(&ids));
                ids.contains(&user_id)
            }
            Ok(Err(e)) => {
                tracing::warn!(group_id, error = %e, "Failed to list administrators, moderating anyway");
                false
            }
            Err(_) => {
                tracing::warn!(group_id, "Timed out listing administrators, moderating anyway");
                false
            }
        }
    }

    async fn notify<T>(&self, transport: &T, chat: &ChatRef, sanction: Sanction, name: &str) -> ActionOutcome
    where
        T: ChatTransport + ?Sized,
    {
        let text = sanction_notice(sanction, name);
        self.run_action("send notice", transport.send_message(chat, &text))
            .await
    }

    async fn record_warning(&self, user_id: u64, display_name: &str) -> Option<u32> {
        if let Err(e) = self.users.ensure(user_id, display_name).await {
            tracing::error!(user_id, error = %e, "Failed to register user");
        }

        match self.users.warn(user_id).await {
            Ok(count) => {
                tracing::info!(user_id, warn_count = count, "Warning recorded");
                Some(count)
            }
            Err(e) => {
                tracing::error!(user_id, error = %e, "Failed to record warning");
                None
            }
        }
    }

    /// Await a chat-admin call with the action timeout and turn it into an outcome.
    async fn run_action<F>(&self, action: &'static str, call: F) -> ActionOutcome
    where
        F: Future<Output = Result<(), TransportError>>,
    {
        match tokio::time::timeout(self.action_timeout, call).await {
            Ok(Ok(())) => ActionOutcome::Completed,
            Ok(Err(e)) => {
                tracing::warn!(action, error = %e, "Chat action failed");
                ActionOutcome::Failed(e.to_string())
            }
            Err(_) => {
                tracing::warn!(action, "Chat action timed out");
                ActionOutcome::Failed(format!("timed out after {:?}", self.action_timeout))
            }
        }
    }
}
