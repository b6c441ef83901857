// Discord implementation of the engine's chat transport.
//
// Groups are guilds, chats are channels. Administrators are the guild owner
// plus every member holding a role with the ADMINISTRATOR permission.
//
// The cache is only trusted when it holds every member of the guild; large
// guilds are not fully chunked, and a missing member must never turn an
// admin into a moderation target.

use crate::core::moderation::{ChatRef, ChatTransport, MessageRef, TransportError};
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::collections::HashSet;
use std::sync::Arc;

/// Largest page the guild members endpoint returns.
const MEMBER_PAGE_SIZE: u64 = 1000;

fn api_error(e: serenity::Error) -> TransportError {
    TransportError::Api(e.to_string())
}

fn guild_of(chat: &ChatRef) -> Result<serenity::GuildId, TransportError> {
    chat.group_id
        .map(serenity::GuildId::new)
        .ok_or(TransportError::NotAGroup)
}

fn collect_admins<'a>(
    owner_id: serenity::UserId,
    roles: impl Iterator<Item = &'a serenity::Role>,
    members: impl Iterator<Item = &'a serenity::Member>,
) -> HashSet<u64> {
    let admin_roles: HashSet<serenity::RoleId> = roles
        .filter(|role| role.permissions.administrator())
        .map(|role| role.id)
        .collect();

    let mut ids: HashSet<u64> = members
        .filter(|member| member.roles.iter().any(|r| admin_roles.contains(r)))
        .map(|member| member.user.id.get())
        .collect();
    ids.insert(owner_id.get());
    ids
}

fn member_cache_complete(cached_members: usize, member_count: u64) -> bool {
    cached_members as u64 >= member_count
}

/// Cursor for the next members page, or `None` once a short page came back.
fn next_page_after(page_len: usize, last_user_id: Option<u64>) -> Option<u64> {
    if (page_len as u64) < MEMBER_PAGE_SIZE {
        return None;
    }
    last_user_id
}

#[derive(Clone)]
pub struct DiscordChatTransport {
    http: Arc<serenity::Http>,
    cache: Arc<serenity::Cache>,
}

impl DiscordChatTransport {
    pub fn new(http: Arc<serenity::Http>, cache: Arc<serenity::Cache>) -> Self {
        Self { http, cache }
    }

    // The cache guard is not Send, so it must not live across an await.
    fn admins_from_cache(&self, guild_id: serenity::GuildId) -> Option<HashSet<u64>> {
        let guild = self.cache.guild(guild_id)?;
        if !member_cache_complete(guild.members.len(), guild.member_count) {
            tracing::debug!(
                guild_id = guild_id.get(),
                cached = guild.members.len(),
                total = guild.member_count,
                "Member cache incomplete"
            );
            return None;
        }
        Some(collect_admins(
            guild.owner_id,
            guild.roles.values(),
            guild.members.values(),
        ))
    }

    async fn admins_from_http(
        &self,
        guild_id: serenity::GuildId,
    ) -> Result<HashSet<u64>, TransportError> {
        let guild = self.http.get_guild(guild_id).await.map_err(api_error)?;

        let mut members: Vec<serenity::Member> = Vec::new();
        let mut after = None;
        loop {
            let page = self
                .http
                .get_guild_members(guild_id, Some(MEMBER_PAGE_SIZE), after)
                .await
                .map_err(api_error)?;
            let cursor = next_page_after(page.len(), page.last().map(|m| m.user.id.get()));
            members.extend(page);
            match cursor {
                Some(last) => after = Some(last),
                None => break,
            }
        }

        Ok(collect_admins(
            guild.owner_id,
            guild.roles.values(),
            members.iter(),
        ))
    }
}

#[async_trait]
impl ChatTransport for DiscordChatTransport {
    async fn send_message(&self, chat: &ChatRef, text: &str) -> Result<(), TransportError> {
        serenity::ChannelId::new(chat.channel_id)
            .say(&self.http, text)
            .await
            .map_err(api_error)?;
        Ok(())
    }

    async fn delete_message(&self, message: &MessageRef) -> Result<(), TransportError> {
        serenity::ChannelId::new(message.chat.channel_id)
            .delete_message(&self.http, serenity::MessageId::new(message.message_id))
            .await
            .map_err(api_error)
    }

    async fn kick(&self, chat: &ChatRef, user_id: u64) -> Result<(), TransportError> {
        guild_of(chat)?
            .kick(&self.http, serenity::UserId::new(user_id))
            .await
            .map_err(api_error)
    }

    async fn ban(&self, chat: &ChatRef, user_id: u64) -> Result<(), TransportError> {
        // Keep the user's message history; the offending message is already gone
        guild_of(chat)?
            .ban(&self.http, serenity::UserId::new(user_id), 0)
            .await
            .map_err(api_error)
    }

    async fn list_administrators(&self, chat: &ChatRef) -> Result<HashSet<u64>, TransportError> {
        let guild_id = guild_of(chat)?;
        if let Some(ids) = self.admins_from_cache(guild_id) {
            return Ok(ids);
        }
        tracing::debug!(guild_id = guild_id.get(), "Guild not cached, fetching admins over HTTP");
        self.admins_from_http(guild_id).await
    }
}
