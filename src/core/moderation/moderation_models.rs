// Moderation domain models - data structures for the offensive-content pipeline.
//
// These are pure domain types with no Discord dependencies.
// The Discord layer converts its events into these before calling core.

use chrono::{DateTime, Utc};

/// Longest term we accept into the bad-word registry.
pub const MAX_TERM_LEN: usize = 64;

/// Canonical form of a bad word: trimmed and lowercased.
pub fn normalize_term(term: &str) -> String {
    term.trim().to_lowercase()
}

/// Why a term was refused by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermRejection {
    Empty,
    TooLong,
    Multiline,
}

impl std::fmt::Display for TermRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TermRejection::Empty => write!(f, "term is empty"),
            TermRejection::TooLong => write!(f, "term is longer than {} characters", MAX_TERM_LEN),
            TermRejection::Multiline => write!(f, "term spans several lines"),
        }
    }
}

/// Normalize a term and check it is usable as a registry key.
pub fn validate_term(term: &str) -> Result<String, TermRejection> {
    let normalized = normalize_term(term);
    if normalized.is_empty() {
        return Err(TermRejection::Empty);
    }
    if normalized.contains('\n') || normalized.contains('\r') {
        return Err(TermRejection::Multiline);
    }
    if normalized.chars().count() > MAX_TERM_LEN {
        return Err(TermRejection::TooLong);
    }
    Ok(normalized)
}

/// Per-group enforcement configuration.
///
/// `Default` is the all-disabled policy, which is also what an unseen group gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GroupPolicy {
    pub kick_enabled: bool,
    pub ban_enabled: bool,
}

/// A partial policy change. `None` fields keep their current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PolicyUpdate {
    pub kick_enabled: Option<bool>,
    pub ban_enabled: Option<bool>,
}

impl PolicyUpdate {
    pub fn kick(enabled: bool) -> Self {
        Self {
            kick_enabled: Some(enabled),
            ban_enabled: None,
        }
    }

    pub fn ban(enabled: bool) -> Self {
        Self {
            kick_enabled: None,
            ban_enabled: Some(enabled),
        }
    }

    /// Apply this change on top of `current`.
    pub fn apply(self, current: GroupPolicy) -> GroupPolicy {
        GroupPolicy {
            kick_enabled: self.kick_enabled.unwrap_or(current.kick_enabled),
            ban_enabled: self.ban_enabled.unwrap_or(current.ban_enabled),
        }
    }
}

/// A known user and their cumulative warning count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub user_id: u64,
    pub display_name: String,
    pub warn_count: u32,
    pub first_seen: DateTime<Utc>,
}

/// Where a chat lives. `group_id` is `None` for private chats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChatRef {
    pub group_id: Option<u64>,
    pub channel_id: u64,
}

impl ChatRef {
    pub fn group(group_id: u64, channel_id: u64) -> Self {
        Self {
            group_id: Some(group_id),
            channel_id,
        }
    }

    pub fn private(channel_id: u64) -> Self {
        Self {
            group_id: None,
            channel_id,
        }
    }
}

/// Handle to a single message, enough to delete it later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRef {
    pub chat: ChatRef,
    pub message_id: u64,
}

/// An inbound chat message, already stripped of platform types.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub message: MessageRef,
    pub author_id: u64,
    pub author_name: String,
    pub text: String,
}

/// Which classifier stage flagged a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    /// A registry term was found in the text.
    Lexical { term: String },
    /// The external classifier named a term. `stored` tells whether it made it into the registry.
    Semantic { term: String, stored: bool },
}

impl Detection {
    pub fn term(&self) -> &str {
        match self {
            Detection::Lexical { term } | Detection::Semantic { term, .. } => term,
        }
    }
}

/// Classification result for a message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Clean,
    Offensive(Detection),
}

/// Result of one chat-admin action. Failures never abort the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Completed,
    Failed(String),
}

impl ActionOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ActionOutcome::Completed)
    }
}

/// Punitive actions a group policy can switch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sanction {
    Kick,
    Ban,
}

impl Sanction {
    pub fn past_tense(&self) -> &'static str {
        match self {
            Sanction::Kick => "kicked",
            Sanction::Ban => "banned",
        }
    }
}

impl std::fmt::Display for Sanction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sanction::Kick => write!(f, "kick"),
            Sanction::Ban => write!(f, "ban"),
        }
    }
}

/// Why the engine did not moderate a message at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotAGroup,
    EmptyText,
    Administrator,
}

/// What the engine did for an offensive message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnforcementReport {
    pub detection: Detection,
    pub deleted: ActionOutcome,
    pub policy: GroupPolicy,
    pub kicked: Option<ActionOutcome>,
    pub banned: Option<ActionOutcome>,
    pub notifications: Vec<ActionOutcome>,
    /// New warn count, `None` if recording the warning failed.
    pub warn_count: Option<u32>,
}

/// Terminal state of one message event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModerationOutcome {
    Skipped(SkipReason),
    Clean,
    Enforced(EnforcementReport),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_term() {
        assert_eq!(normalize_term("  Foo "), "foo");
        assert_eq!(normalize_term("BAR"), "bar");
    }

    #[test]
    fn test_validate_term_rejections() {
        assert_eq!(validate_term("   "), Err(TermRejection::Empty));
        assert_eq!(validate_term("two\nlines"), Err(TermRejection::Multiline));
        assert_eq!(
            validate_term(&"x".repeat(MAX_TERM_LEN + 1)),
            Err(TermRejection::TooLong)
        );
        assert_eq!(validate_term(" Idiot "), Ok("idiot".to_string()));
    }

    #[test]
    fn test_policy_update_keeps_unset_fields() {
        let current = GroupPolicy {
            kick_enabled: true,
            ban_enabled: false,
        };

        let updated = PolicyUpdate::ban(true).apply(current);

        assert_eq!(
            updated,
            GroupPolicy {
                kick_enabled: true,
                ban_enabled: true
            }
        );
    }
}
