// SQLite-backed moderation store.
//
// Tables:
// - bad_words: Normalized offensive terms
// - group_config: Per-group kick/ban toggles
// - users: Known users and their warn counts
// - authorized_users: Users allowed to run admin commands
//
// Policy updates and warn increments are single UPSERT ... RETURNING
// statements, so concurrent writers never lose an update.

use crate::core::moderation::{GroupPolicy, ModerationStore, PolicyUpdate, StoreError, UserRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Row, Sqlite};
use std::path::Path;

fn storage_error(e: sqlx::Error) -> StoreError {
    StoreError::StorageError(e.to_string())
}

pub struct SqliteModerationStore {
    pool: Pool<Sqlite>,
}

impl SqliteModerationStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database file at `path`.
    pub async fn connect(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;

        Ok(Self::new(pool))
    }
}

#[async_trait]
impl ModerationStore for SqliteModerationStore {
    async fn initialize(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS bad_words (
                word TEXT PRIMARY KEY
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS group_config (
                group_id INTEGER PRIMARY KEY,
                kick_enabled BOOLEAN NOT NULL DEFAULT 0,
                ban_enabled BOOLEAN NOT NULL DEFAULT 0
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                user_id INTEGER PRIMARY KEY,
                display_name TEXT NOT NULL DEFAULT '',
                warn_count INTEGER NOT NULL DEFAULT 0,
                first_seen TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS authorized_users (
                user_id INTEGER PRIMARY KEY
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(())
    }

    async fn add_bad_word(&self, term: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("INSERT OR IGNORE INTO bad_words (word) VALUES (?)")
            .bind(term)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_bad_word(&self, term: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM bad_words WHERE word = ?")
            .bind(term)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_bad_words(&self) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query("SELECT word FROM bad_words ORDER BY word")
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(rows.iter().map(|row| row.get("word")).collect())
    }

    async fn get_group_policy(&self, group_id: u64) -> Result<Option<GroupPolicy>, StoreError> {
        let row = sqlx::query("SELECT kick_enabled, ban_enabled FROM group_config WHERE group_id = ?")
            .bind(group_id as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;

        Ok(row.map(|row| GroupPolicy {
            kick_enabled: row.get::<i64, _>("kick_enabled") != 0,
            ban_enabled: row.get::<i64, _>("ban_enabled") != 0,
        }))
    }

    async fn update_group_policy(
        &self,
        group_id: u64,
        update: PolicyUpdate,
    ) -> Result<GroupPolicy, StoreError> {
        // NULL binds mean "leave as is"; a fresh row falls back to disabled
        let row = sqlx::query(
            r#"
            INSERT INTO group_config (group_id, kick_enabled, ban_enabled)
            VALUES (?, COALESCE(?, 0), COALESCE(?, 0))
            ON CONFLICT(group_id) DO UPDATE SET
                kick_enabled = COALESCE(?, kick_enabled),
                ban_enabled = COALESCE(?, ban_enabled)
            RETURNING kick_enabled, ban_enabled
            "#,
        )
        .bind(group_id as i64)
        .bind(update.kick_enabled)
        .bind(update.ban_enabled)
        .bind(update.kick_enabled)
        .bind(update.ban_enabled)
        .fetch_one(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(GroupPolicy {
            kick_enabled: row.get::<i64, _>("kick_enabled") != 0,
            ban_enabled: row.get::<i64, _>("ban_enabled") != 0,
        })
    }

    async fn ensure_user(&self, user_id: u64, display_name: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, display_name, warn_count, first_seen)
            VALUES (?, ?, 0, ?)
            ON CONFLICT(user_id) DO NOTHING
            "#,
        )
        .bind(user_id as i64)
        .bind(display_name)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(())
    }

    async fn increment_warn_count(&self, user_id: u64) -> Result<u32, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO users (user_id, display_name, warn_count, first_seen)
            VALUES (?, '', 1, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                warn_count = warn_count + 1
            RETURNING warn_count
            "#,
        )
        .bind(user_id as i64)
        .bind(Utc::now().to_rfc3339())
        .fetch_one(&self.pool)
        .await
        .map_err(storage_error)?;

        let count: i64 = row.get("warn_count");
        Ok(count as u32)
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT user_id, display_name, warn_count, first_seen FROM users ORDER BY user_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        let mut users = Vec::with_capacity(rows.len());
        for row in rows {
            let first_seen_str: String = row.get("first_seen");
            let first_seen = DateTime::parse_from_rfc3339(&first_seen_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now());

            users.push(UserRecord {
                user_id: row.get::<i64, _>("user_id") as u64,
                display_name: row.get("display_name"),
                warn_count: row.get::<i64, _>("warn_count") as u32,
                first_seen,
            });
        }
        Ok(users)
    }

    async fn add_authorized_user(&self, user_id: u64) -> Result<bool, StoreError> {
        let result = sqlx::query("INSERT OR IGNORE INTO authorized_users (user_id) VALUES (?)")
            .bind(user_id as i64)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_authorized_user(&self, user_id: u64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM authorized_users WHERE user_id = ?")
            .bind(user_id as i64)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn is_authorized_user(&self, user_id: u64) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 FROM authorized_users WHERE user_id = ?")
            .bind(user_id as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(row.is_some())
    }
}
