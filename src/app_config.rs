// Runtime configuration, read from the process environment (after `.env`).

use anyhow::{anyhow, Context};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_DATABASE_PATH: &str = "data/moderation.db";
const DEFAULT_COMMAND_PREFIX: &str = "!";
const DEFAULT_CLASSIFIER_TIMEOUT_SECS: u64 = 10;
const DEFAULT_CHAT_ACTION_TIMEOUT_SECS: u64 = 5;
const DEFAULT_ADMIN_CACHE_TTL_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierProvider {
    Gemini,
    OpenRouter,
}

impl ClassifierProvider {
    fn parse(value: &str) -> anyhow::Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "gemini" => Ok(ClassifierProvider::Gemini),
            "openrouter" => Ok(ClassifierProvider::OpenRouter),
            other => Err(anyhow!(
                "Unknown CLASSIFIER_PROVIDER '{}' (expected 'gemini' or 'openrouter')",
                other
            )),
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ClassifierProvider::Gemini => "gemini-2.5-flash",
            ClassifierProvider::OpenRouter => "deepseek/deepseek-chat-v3.1:free",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub discord_token: String,
    /// Super-admin; always authorized, and the only one who may grant/revoke.
    pub root_admin_id: Option<u64>,
    pub database_path: PathBuf,
    pub command_prefix: String,
    pub classifier_provider: ClassifierProvider,
    pub classifier_api_key: String,
    pub classifier_model: String,
    pub classifier_timeout: Duration,
    pub chat_action_timeout: Duration,
    /// Zero disables caching of admin lists.
    pub admin_cache_ttl: Duration,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as unset
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let discord_token = get("DISCORD_TOKEN").context(
            "Missing DISCORD_TOKEN environment variable! Create a .env file with your bot token.",
        )?;

        let root_admin_id = get("ROOT_ADMIN_ID")
            .map(|v| v.trim().parse::<u64>())
            .transpose()
            .context("ROOT_ADMIN_ID must be a numeric user id")?;

        let classifier_provider = match get("CLASSIFIER_PROVIDER") {
            Some(value) => ClassifierProvider::parse(&value)?,
            None => ClassifierProvider::Gemini,
        };

        let classifier_api_key = get("CLASSIFIER_API_KEY")
            .context("Missing CLASSIFIER_API_KEY environment variable!")?;

        let classifier_model = get("CLASSIFIER_MODEL")
            .unwrap_or_else(|| classifier_provider.default_model().to_string());

        let secs = |key: &str, default: u64| -> anyhow::Result<Duration> {
            let value = match get(key) {
                Some(v) => v
                    .trim()
                    .parse::<u64>()
                    .with_context(|| format!("{} must be a whole number of seconds", key))?,
                None => default,
            };
            Ok(Duration::from_secs(value))
        };

        Ok(Self {
            discord_token,
            root_admin_id,
            database_path: PathBuf::from(
                get("DATABASE_PATH").unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string()),
            ),
            command_prefix: get("COMMAND_PREFIX")
                .map(|p| p.trim().to_string())
                .unwrap_or_else(|| DEFAULT_COMMAND_PREFIX.to_string()),
            classifier_provider,
            classifier_api_key,
            classifier_model,
            classifier_timeout: secs("CLASSIFIER_TIMEOUT_SECS", DEFAULT_CLASSIFIER_TIMEOUT_SECS)?,
            chat_action_timeout: secs(
                "CHAT_ACTION_TIMEOUT_SECS",
                DEFAULT_CHAT_ACTION_TIMEOUT_SECS,
            )?,
            admin_cache_ttl: secs("ADMIN_CACHE_TTL_SECS", DEFAULT_ADMIN_CACHE_TTL_SECS)?,
        })
    }
}
