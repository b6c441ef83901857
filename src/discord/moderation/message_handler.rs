// Inbound message routing: prefixed admin commands go to the admin service,
// everything else is moderated in its own task.

use crate::core::moderation::{
    parse_command, ChatRef, CommandInvocation, IncomingMessage, MessageRef,
};
use crate::discord::moderation::replies::{render_reply, split_for_discord};
use crate::discord::moderation::transport::DiscordChatTransport;
use crate::discord::{Data, Error};
use poise::serenity_prelude as serenity;
use std::sync::Arc;

fn display_name(user: &serenity::User) -> String {
    user.global_name.clone().unwrap_or_else(|| user.name.clone())
}

pub async fn handle_message(
    ctx: &serenity::Context,
    msg: &serenity::Message,
    data: &Data,
) -> Result<(), Error> {
    // Ignore bot messages (including our own)
    if msg.author.bot {
        return Ok(());
    }

    let channel_id = msg.channel_id.get();
    let chat = match msg.guild_id {
        Some(guild_id) => ChatRef::group(guild_id.get(), channel_id),
        None => ChatRef::private(channel_id),
    };

    if let Some((kind, args)) = parse_command(&msg.content, &data.command_prefix) {
        let invocation = CommandInvocation {
            kind,
            args,
            invoker_id: msg.author.id.get(),
            invoker_name: display_name(&msg.author),
            chat,
        };

        let reply = data.admin.execute(&invocation).await;
        for chunk in split_for_discord(&render_reply(&reply, &data.command_prefix)) {
            msg.channel_id.say(&ctx.http, chunk).await?;
        }
        return Ok(());
    }

    let incoming = IncomingMessage {
        message: MessageRef {
            chat,
            message_id: msg.id.get(),
        },
        author_id: msg.author.id.get(),
        author_name: display_name(&msg.author),
        text: msg.content.clone(),
    };

    let engine = Arc::clone(&data.engine);
    let transport = DiscordChatTransport::new(ctx.http.clone(), ctx.cache.clone());
    tokio::spawn(async move {
        let outcome = engine.handle_message(&transport, &incoming).await;
        tracing::debug!(
            message_id = incoming.message.message_id,
            ?outcome,
            "Message handled"
        );
    });

    Ok(())
}

/// Drop the cached admin list after role or membership changes.
pub fn invalidate_admins(data: &Data, guild_id: serenity::GuildId) {
    data.engine.admin_cache().invalidate(guild_id.get());
}
