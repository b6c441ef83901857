// Slash commands for moderation admin.
//
// **Notice the pattern:**
// 1. Extract primitive data from Discord types
// 2. Call core service
// 3. Render the reply
//
// Authorization is enforced by `AdminService`, not by Discord permissions,
// so slash and text commands behave identically.

use crate::core::moderation::{
    AdminService, ChatRef, CommandInvocation, CommandKind, EnforcementEngine, SemanticClassifier,
};
use crate::discord::moderation::replies::{render_reply, split_for_discord};
use crate::infra::moderation::SqliteModerationStore;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

pub type ModerationEngine = EnforcementEngine<SqliteModerationStore, Box<dyn SemanticClassifier>>;

/// Shared state handed to every command and event.
pub struct Data {
    pub engine: Arc<ModerationEngine>,
    pub admin: Arc<AdminService<SqliteModerationStore>>,
    /// Prefix for text commands, e.g. "!".
    pub command_prefix: String,
}

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum Toggle {
    #[name = "on"]
    On,
    #[name = "off"]
    Off,
}

impl Toggle {
    fn as_arg(&self) -> &'static str {
        match self {
            Toggle::On => "on",
            Toggle::Off => "off",
        }
    }
}

/// Where the command was issued from.
fn chat_of(ctx: &Context<'_>) -> ChatRef {
    let channel_id = ctx.channel_id().get();
    match ctx.guild_id() {
        Some(guild_id) => ChatRef::group(guild_id.get(), channel_id),
        None => ChatRef::private(channel_id),
    }
}

async fn run(ctx: Context<'_>, kind: CommandKind, args: String) -> Result<(), Error> {
    let author = ctx.author();
    let invocation = CommandInvocation {
        kind,
        args,
        invoker_id: author.id.get(),
        invoker_name: author
            .global_name
            .clone()
            .unwrap_or_else(|| author.name.clone()),
        chat: chat_of(&ctx),
    };

    let reply = ctx.data().admin.execute(&invocation).await;
    for chunk in split_for_discord(&render_reply(&reply, "/")) {
        ctx.say(chunk).await?;
    }
    Ok(())
}

/// Register yourself with the bot.
#[poise::command(slash_command)]
pub async fn start(ctx: Context<'_>) -> Result<(), Error> {
    run(ctx, CommandKind::Start, String::new()).await
}

/// Turn kicking offenders on or off for this server.
#[poise::command(slash_command, guild_only)]
pub async fn kick(
    ctx: Context<'_>,
    #[description = "Kick users who post offensive messages"] state: Toggle,
) -> Result<(), Error> {
    run(ctx, CommandKind::Kick, state.as_arg().to_string()).await
}

/// Turn banning offenders on or off for this server.
#[poise::command(slash_command, guild_only)]
pub async fn ban(
    ctx: Context<'_>,
    #[description = "Ban users who post offensive messages"] state: Toggle,
) -> Result<(), Error> {
    run(ctx, CommandKind::Ban, state.as_arg().to_string()).await
}

/// Add words to the bad-word list.
#[poise::command(slash_command)]
pub async fn bad(
    ctx: Context<'_>,
    #[description = "Comma-separated words, e.g. word1, word2"] words: String,
) -> Result<(), Error> {
    run(ctx, CommandKind::AddBadWords, words).await
}

/// Remove words from the bad-word list.
#[poise::command(slash_command)]
pub async fn removebad(
    ctx: Context<'_>,
    #[description = "Comma-separated words, e.g. word1, word2"] words: String,
) -> Result<(), Error> {
    run(ctx, CommandKind::RemoveBadWords, words).await
}

/// Show the bad-word list.
#[poise::command(slash_command)]
pub async fn badwords(ctx: Context<'_>) -> Result<(), Error> {
    run(ctx, CommandKind::ListBadWords, String::new()).await
}

/// Show known users and their warning counts.
#[poise::command(slash_command)]
pub async fn users(ctx: Context<'_>) -> Result<(), Error> {
    run(ctx, CommandKind::ListUsers, String::new()).await
}

/// Allow a user to run admin commands.
#[poise::command(slash_command)]
pub async fn grant(
    ctx: Context<'_>,
    #[description = "User to authorize"] user: serenity::User,
) -> Result<(), Error> {
    run(ctx, CommandKind::Grant, user.id.get().to_string()).await
}

/// Take admin command access away from a user.
#[poise::command(slash_command)]
pub async fn revoke(
    ctx: Context<'_>,
    #[description = "User to de-authorize"] user: serenity::User,
) -> Result<(), Error> {
    run(ctx, CommandKind::Revoke, user.id.get().to_string()).await
}

/// Every slash command, for framework registration.
pub fn all() -> Vec<poise::Command<Data, Error>> {
    vec![
        start(),
        kick(),
        ban(),
        bad(),
        removebad(),
        badwords(),
        users(),
        grant(),
        revoke(),
    ]
}
