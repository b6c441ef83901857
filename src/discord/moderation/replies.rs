// Turns core command replies into Discord markdown.

use crate::core::moderation::CommandReply;

/// Discord rejects messages longer than this many characters.
pub const DISCORD_MESSAGE_LIMIT: usize = 2000;

fn code_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("`{}`", item))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn render_reply(reply: &CommandReply, prefix: &str) -> String {
    match reply {
        CommandReply::Welcome { display_name } => format!(
            "👋 Hi {}! I delete offensive messages in this server. Admins can manage me with `{}bad`.",
            display_name, prefix
        ),
        CommandReply::PolicyUpdated { sanction, enabled } => {
            let state = if *enabled { "enabled" } else { "disabled" };
            format!("✅ Auto-{} has been **{}**.", sanction, state)
        }
        CommandReply::BadWordsAdded {
            added,
            skipped,
            rejected,
        } => {
            let mut lines = Vec::new();
            if !added.is_empty() {
                lines.push(format!("✅ Added: **{}**", added.join(", ")));
            }
            if !skipped.is_empty() {
                lines.push(format!("⚠️ Already exists: {}", code_list(skipped)));
            }
            if !rejected.is_empty() {
                lines.push(format!("❌ Rejected: {}", code_list(rejected)));
            }
            if lines.is_empty() {
                "Nothing happened.".to_string()
            } else {
                lines.join("\n")
            }
        }
        CommandReply::BadWordsRemoved { removed, not_found } => {
            let mut lines = Vec::new();
            if !removed.is_empty() {
                lines.push(format!("🗑️ Removed: **{}**", removed.join(", ")));
            }
            if !not_found.is_empty() {
                lines.push(format!("⚠️ Not in the list: {}", code_list(not_found)));
            }
            if lines.is_empty() {
                "Nothing happened.".to_string()
            } else {
                lines.join("\n")
            }
        }
        CommandReply::BadWordList(words) => {
            if words.is_empty() {
                "The bad-word list is empty.".to_string()
            } else {
                format!("📝 Bad words ({}):\n{}", words.len(), code_list(words))
            }
        }
        CommandReply::UserList(users) => {
            if users.is_empty() {
                return "No users yet.".to_string();
            }
            let mut text = format!("👥 Known users ({}):", users.len());
            for user in users {
                let name = if user.display_name.is_empty() {
                    "unknown"
                } else {
                    user.display_name.as_str()
                };
                text.push_str(&format!(
                    "\n• {} (`{}`) - warnings: {}",
                    name, user.user_id, user.warn_count
                ));
            }
            text
        }
        CommandReply::AccessGranted { user_id, changed } => {
            if *changed {
                format!("✅ <@{}> can now use admin commands.", user_id)
            } else {
                format!("<@{}> was already authorized.", user_id)
            }
        }
        CommandReply::AccessRevoked { user_id, changed } => {
            if *changed {
                format!("✅ <@{}> can no longer use admin commands.", user_id)
            } else {
                format!("<@{}> was not authorized.", user_id)
            }
        }
        CommandReply::Usage(kind) => format!("Usage: `{}{}`", prefix, kind.usage()),
        CommandReply::Denied => "You are not authorized to use this command.".to_string(),
        CommandReply::GroupOnly => "This command can only be used in groups.".to_string(),
        CommandReply::StorageFailure => {
            "Something went wrong while saving. Please try again later.".to_string()
        }
    }
}

/// Split on line boundaries so each piece fits in one Discord message.
/// A single line longer than the limit is hard-split on chars.
pub fn split_for_discord(text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        let line_len = line.chars().count();
        let current_len = current.chars().count();

        if current_len > 0 && current_len + 1 + line_len > DISCORD_MESSAGE_LIMIT {
            chunks.push(std::mem::take(&mut current));
        }

        if line_len > DISCORD_MESSAGE_LIMIT {
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(DISCORD_MESSAGE_LIMIT) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::{CommandKind, Sanction, UserRecord};
    use chrono::Utc;

    #[test]
    fn test_added_reply_lists_each_bucket() {
        let reply = CommandReply::BadWordsAdded {
            added: vec!["foo".to_string(), "bar".to_string()],
            skipped: vec!["baz".to_string()],
            rejected: vec![],
        };
        assert_eq!(
            render_reply(&reply, "!"),
            "✅ Added: **foo, bar**\n⚠️ Already exists: `baz`"
        );
    }

    #[test]
    fn test_empty_result_says_nothing_happened() {
        let reply = CommandReply::BadWordsRemoved {
            removed: vec![],
            not_found: vec![],
        };
        assert_eq!(render_reply(&reply, "!"), "Nothing happened.");
    }

    #[test]
    fn test_usage_uses_prefix() {
        assert_eq!(
            render_reply(&CommandReply::Usage(CommandKind::Kick), "!"),
            "Usage: `!kick <on/off>`"
        );
        assert_eq!(
            render_reply(&CommandReply::Usage(CommandKind::AddBadWords), "/"),
            "Usage: `/bad word1, word2, word3`"
        );
    }

    #[test]
    fn test_policy_and_denied_replies() {
        let reply = CommandReply::PolicyUpdated {
            sanction: Sanction::Ban,
            enabled: false,
        };
        assert_eq!(render_reply(&reply, "!"), "✅ Auto-ban has been **disabled**.");
        assert_eq!(
            render_reply(&CommandReply::Denied, "!"),
            "You are not authorized to use this command."
        );
    }

    #[test]
    fn test_user_list() {
        let reply = CommandReply::UserList(vec![UserRecord {
            user_id: 7,
            display_name: "Alice".to_string(),
            warn_count: 2,
            first_seen: Utc::now(),
        }]);
        assert_eq!(
            render_reply(&reply, "!"),
            "👥 Known users (1):\n• Alice (`7`) - warnings: 2"
        );
    }

    #[test]
    fn test_split_keeps_short_text_whole() {
        assert_eq!(split_for_discord("a\nb"), vec!["a\nb".to_string()]);
        assert!(split_for_discord("").is_empty());
    }

    #[test]
    fn test_split_long_text() {
        let line = "x".repeat(1500);
        let text = format!("{}\n{}", line, line);
        let chunks = split_for_discord(&text);
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.chars().count() <= DISCORD_MESSAGE_LIMIT));

        let huge = "y".repeat(4500);
        let chunks = split_for_discord(&huge);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].len(), 500);
    }
}
