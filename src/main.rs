// This is the entry point of the moderation bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (SQLite, classifier APIs)
// - `discord/` = Discord-specific adapters (commands, events)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Set up the Discord framework
// 4. Register commands and event handlers

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

mod app_config;

use crate::app_config::{AppConfig, ClassifierProvider};
use crate::core::moderation::{
    AdminService, AuthorizationGate, BadWordRegistry, EnforcementEngine, GroupPolicyStore,
    MessageClassifier, ModerationStore, SemanticClassifier, UserDirectory,
};
use crate::discord::moderation as discord_moderation;
use crate::discord::{Data, Error};
use crate::infra::classifier::{GeminiClassifier, OpenRouterClassifier};
use crate::infra::moderation::SqliteModerationStore;
use anyhow::Context as _;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Event handler for non-command Discord events.
async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Message { new_message } => {
            discord_moderation::handle_message(ctx, new_message, data).await?;
        }
        // Admin lists change with roles and member role assignments
        serenity::FullEvent::GuildRoleUpdate { new, .. } => {
            discord_moderation::invalidate_admins(data, new.guild_id);
        }
        serenity::FullEvent::GuildRoleDelete { guild_id, .. } => {
            discord_moderation::invalidate_admins(data, *guild_id);
        }
        serenity::FullEvent::GuildMemberUpdate { event, .. } => {
            discord_moderation::invalidate_admins(data, event.guild_id);
        }
        _ => {}
    }

    Ok(())
}

fn build_classifier(config: &AppConfig) -> Box<dyn SemanticClassifier> {
    let api_key = config.classifier_api_key.clone();
    let model = config.classifier_model.clone();
    match config.classifier_provider {
        ClassifierProvider::Gemini => Box::new(GeminiClassifier::new(api_key, model)),
        ClassifierProvider::OpenRouter => Box::new(OpenRouterClassifier::new(api_key, model)),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    // RUST_LOG controls verbosity, defaulting to info
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // This is the "composition root" where we wire everything together.

    let store = Arc::new(
        SqliteModerationStore::connect(&config.database_path)
            .await
            .with_context(|| {
                format!(
                    "Failed to open moderation database at {}",
                    config.database_path.display()
                )
            })?,
    );
    store
        .initialize()
        .await
        .context("Failed to migrate moderation database")?;

    let registry = Arc::new(BadWordRegistry::new(Arc::clone(&store)));
    let loaded = registry
        .load()
        .await
        .context("Failed to load bad-word registry")?;
    tracing::info!(terms = loaded, "Bad-word registry loaded");

    let policies = Arc::new(GroupPolicyStore::new(Arc::clone(&store)));
    let users = Arc::new(UserDirectory::new(Arc::clone(&store)));
    let gate = Arc::new(AuthorizationGate::new(
        Arc::clone(&store),
        config.root_admin_id,
    ));
    if config.root_admin_id.is_none() {
        tracing::warn!("ROOT_ADMIN_ID is not set; only previously granted users can run admin commands");
    }

    let classifier = Arc::new(MessageClassifier::new(
        Arc::clone(&registry),
        build_classifier(&config),
        config.classifier_timeout,
    ));
    tracing::info!(
        provider = ?config.classifier_provider,
        model = %config.classifier_model,
        "Semantic classifier configured"
    );

    let engine = Arc::new(EnforcementEngine::new(
        classifier,
        Arc::clone(&policies),
        Arc::clone(&users),
        config.admin_cache_ttl,
        config.chat_action_timeout,
    ));
    let admin = Arc::new(AdminService::new(registry, policies, users, gate));

    // Create the data structure that will be shared across all commands
    let data = Data {
        engine,
        admin,
        command_prefix: config.command_prefix.clone(),
    };

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================

    let intents = serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::DIRECT_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT // Required to read message content
        | serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MEMBERS;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: discord::commands::moderation::all(),
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(|ctx, ready, framework| {
            Box::pin(async move {
                tracing::info!(bot = %ready.user.name, "Bot is starting up");

                // Register slash commands globally (can take up to an hour to propagate)
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                tracing::info!("Commands registered, bot is ready");
                Ok(data)
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(&config.discord_token, intents)
        .framework(framework)
        .await
        .context("Error creating client")?;

    // Ctrl-C stops every shard; in-flight moderation tasks are dropped with the runtime
    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown requested");
            shard_manager.shutdown_all().await;
        }
    });

    client.start().await.context("Error running bot")?;
    Ok(())
}
