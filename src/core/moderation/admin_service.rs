// Administrative commands - the only path that mutates the registry,
// group policies or the authorized-user set from chat.
//
// Every gated command is checked in this order: authorization, chat type,
// arguments. Nothing is written unless all three pass.

use super::authorization_gate::AuthorizationGate;
use super::bad_word_registry::{BadWordRegistry, RegistryError};
use super::group_policy_store::GroupPolicyStore;
use super::moderation_models::{normalize_term, ChatRef, PolicyUpdate, Sanction, UserRecord};
use super::moderation_store::{ModerationStore, StoreError};
use super::user_directory::UserDirectory;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Start,
    Kick,
    Ban,
    AddBadWords,
    RemoveBadWords,
    ListBadWords,
    ListUsers,
    Grant,
    Revoke,
}

impl CommandKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "start" => Some(CommandKind::Start),
            "kick" => Some(CommandKind::Kick),
            "ban" => Some(CommandKind::Ban),
            "bad" => Some(CommandKind::AddBadWords),
            "removebad" => Some(CommandKind::RemoveBadWords),
            "badwords" => Some(CommandKind::ListBadWords),
            "users" => Some(CommandKind::ListUsers),
            "grant" => Some(CommandKind::Grant),
            "revoke" => Some(CommandKind::Revoke),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CommandKind::Start => "start",
            CommandKind::Kick => "kick",
            CommandKind::Ban => "ban",
            CommandKind::AddBadWords => "bad",
            CommandKind::RemoveBadWords => "removebad",
            CommandKind::ListBadWords => "badwords",
            CommandKind::ListUsers => "users",
            CommandKind::Grant => "grant",
            CommandKind::Revoke => "revoke",
        }
    }

    /// Argument synopsis, without the command prefix.
    pub fn usage(&self) -> &'static str {
        match self {
            CommandKind::Kick => "kick <on/off>",
            CommandKind::Ban => "ban <on/off>",
            CommandKind::AddBadWords => "bad word1, word2, word3",
            CommandKind::RemoveBadWords => "removebad word1, word2, word3",
            CommandKind::Grant => "grant <user id>",
            CommandKind::Revoke => "revoke <user id>",
            other => other.name(),
        }
    }

    fn requires_authorization(&self) -> bool {
        !matches!(self, CommandKind::Start)
    }

    fn root_only(&self) -> bool {
        matches!(self, CommandKind::Grant | CommandKind::Revoke)
    }
}

/// Split a prefixed text command into its kind and raw argument string.
///
/// Returns `None` for anything that isn't one of our commands.
pub fn parse_command(text: &str, prefix: &str) -> Option<(CommandKind, String)> {
    let rest = text.trim_start().strip_prefix(prefix)?;
    let (name, args) = match rest.find(char::is_whitespace) {
        Some(idx) => rest.split_at(idx),
        None => (rest, ""),
    };
    // Accept "cmd@botname" as well
    let name = name.split('@').next().unwrap_or(name);
    let kind = CommandKind::from_name(name)?;
    Some((kind, args.trim().to_string()))
}

/// A command ready to execute.
#[derive(Debug, Clone)]
pub struct CommandInvocation {
    pub kind: CommandKind,
    pub args: String,
    pub invoker_id: u64,
    pub invoker_name: String,
    pub chat: ChatRef,
}

/// Result of a command, rendered by the chat layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandReply {
    Welcome {
        display_name: String,
    },
    PolicyUpdated {
        sanction: Sanction,
        enabled: bool,
    },
    BadWordsAdded {
        added: Vec<String>,
        skipped: Vec<String>,
        rejected: Vec<String>,
    },
    BadWordsRemoved {
        removed: Vec<String>,
        not_found: Vec<String>,
    },
    BadWordList(Vec<String>),
    UserList(Vec<UserRecord>),
    AccessGranted {
        user_id: u64,
        changed: bool,
    },
    AccessRevoked {
        user_id: u64,
        changed: bool,
    },
    Usage(CommandKind),
    Denied,
    GroupOnly,
    StorageFailure,
}

/// Comma-separated terms, normalized, empties dropped, duplicates removed (first wins).
pub fn split_terms(args: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for term in args.split(',').map(normalize_term) {
        if !term.is_empty() && !terms.contains(&term) {
            terms.push(term);
        }
    }
    terms
}

fn parse_toggle(args: &str) -> Option<bool> {
    let mut tokens = args.split_whitespace();
    let value = match tokens.next()?.to_lowercase().as_str() {
        "on" => true,
        "off" => false,
        _ => return None,
    };
    if tokens.next().is_some() {
        return None;
    }
    Some(value)
}

/// Accepts a raw id or a Discord mention like `<@123>` / `<@!123>`.
fn parse_user_id(args: &str) -> Option<u64> {
    let raw = args.trim();
    let raw = raw
        .strip_prefix("<@")
        .and_then(|r| r.strip_suffix('>'))
        .map(|r| r.trim_start_matches('!'))
        .unwrap_or(raw);
    raw.parse().ok()
}

pub struct AdminService<S: ModerationStore> {
    registry: Arc<BadWordRegistry<S>>,
    policies: Arc<GroupPolicyStore<S>>,
    users: Arc<UserDirectory<S>>,
    gate: Arc<AuthorizationGate<S>>,
}

impl<S: ModerationStore> AdminService<S> {
    pub fn new(
        registry: Arc<BadWordRegistry<S>>,
        policies: Arc<GroupPolicyStore<S>>,
        users: Arc<UserDirectory<S>>,
        gate: Arc<AuthorizationGate<S>>,
    ) -> Self {
        Self {
            registry,
            policies,
            users,
            gate,
        }
    }

    /// Run a command. Storage failures come back as [`CommandReply::StorageFailure`].
    pub async fn execute(&self, invocation: &CommandInvocation) -> CommandReply {
        match self.run(invocation).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(
                    command = invocation.kind.name(),
                    user_id = invocation.invoker_id,
                    error = %e,
                    "Command failed"
                );
                CommandReply::StorageFailure
            }
        }
    }

    async fn run(&self, inv: &CommandInvocation) -> Result<CommandReply, StoreError> {
        if inv.kind.requires_authorization() && !self.gate.is_authorized(inv.invoker_id).await? {
            tracing::warn!(
                command = inv.kind.name(),
                user_id = inv.invoker_id,
                "Unauthorized command attempt"
            );
            return Ok(CommandReply::Denied);
        }
        if inv.kind.root_only() && !self.gate.is_root(inv.invoker_id) {
            return Ok(CommandReply::Denied);
        }

        match inv.kind {
            CommandKind::Start => {
                self.users.ensure(inv.invoker_id, &inv.invoker_name).await?;
                Ok(CommandReply::Welcome {
                    display_name: inv.invoker_name.clone(),
                })
            }
            CommandKind::Kick => self.toggle(inv, Sanction::Kick).await,
            CommandKind::Ban => self.toggle(inv, Sanction::Ban).await,
            CommandKind::AddBadWords => self.add_bad_words(inv).await,
            CommandKind::RemoveBadWords => self.remove_bad_words(inv).await,
            CommandKind::ListBadWords => Ok(CommandReply::BadWordList(self.registry.list().await)),
            CommandKind::ListUsers => Ok(CommandReply::UserList(self.users.list().await?)),
            CommandKind::Grant => {
                let Some(user_id) = parse_user_id(&inv.args) else {
                    return Ok(CommandReply::Usage(inv.kind));
                };
                let changed = self.gate.grant(user_id).await?;
                Ok(CommandReply::AccessGranted { user_id, changed })
            }
            CommandKind::Revoke => {
                let Some(user_id) = parse_user_id(&inv.args) else {
                    return Ok(CommandReply::Usage(inv.kind));
                };
                let changed = self.gate.revoke(user_id).await?;
                Ok(CommandReply::AccessRevoked { user_id, changed })
            }
        }
    }

    async fn toggle(
        &self,
        inv: &CommandInvocation,
        sanction: Sanction,
    ) -> Result<CommandReply, StoreError> {
        let Some(group_id) = inv.chat.group_id else {
            return Ok(CommandReply::GroupOnly);
        };
        let Some(enabled) = parse_toggle(&inv.args) else {
            return Ok(CommandReply::Usage(inv.kind));
        };

        let update = match sanction {
            Sanction::Kick => PolicyUpdate::kick(enabled),
            Sanction::Ban => PolicyUpdate::ban(enabled),
        };
        self.policies.update(group_id, update).await?;

        Ok(CommandReply::PolicyUpdated { sanction, enabled })
    }

    async fn add_bad_words(&self, inv: &CommandInvocation) -> Result<CommandReply, StoreError> {
        let terms = split_terms(&inv.args);
        if terms.is_empty() {
            return Ok(CommandReply::Usage(inv.kind));
        }

        let mut added = Vec::new();
        let mut skipped = Vec::new();
        let mut rejected = Vec::new();
        for term in terms {
            match self.registry.add(&term).await {
                Ok(true) => added.push(term),
                Ok(false) => skipped.push(term),
                Err(RegistryError::InvalidTerm(_)) => rejected.push(term),
                Err(RegistryError::Store(e)) => return Err(e),
            }
        }

        tracing::info!(
            user_id = inv.invoker_id,
            added = added.len(),
            skipped = skipped.len(),
            "Bad words added"
        );
        Ok(CommandReply::BadWordsAdded {
            added,
            skipped,
            rejected,
        })
    }

    async fn remove_bad_words(&self, inv: &CommandInvocation) -> Result<CommandReply, StoreError> {
        let terms = split_terms(&inv.args);
        if terms.is_empty() {
            return Ok(CommandReply::Usage(inv.kind));
        }

        let mut removed = Vec::new();
        let mut not_found = Vec::new();
        for term in terms {
            if self.registry.remove(&term).await? {
                removed.push(term);
            } else {
                not_found.push(term);
            }
        }

        Ok(CommandReply::BadWordsRemoved { removed, not_found })
    }
}
