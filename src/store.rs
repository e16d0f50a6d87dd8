//! SQLite-backed persistence for users, sessions and dashboard state

use chrono::{DateTime, Utc};
use sqlx::migrate::{MigrateError, Migrator};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::data::User;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Upper bound on pooled SQLite connections
const MAX_CONNECTIONS: u32 = 5;

/// Errors from the backing store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] MigrateError),

    #[error("failed to create database directory: {0}")]
    Io(#[from] std::io::Error),
}

/// Handle to the dashboard database
///
/// Cheap to clone; clones share the underlying pool.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Opens a pool for `database_url`, creating the database file and its
    /// directory if missing
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        if let Some(dir) = options.get_filename().parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Wraps an existing pool
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Applies pending schema migrations
    pub async fn migrate(&self) -> Result<(), StoreError> {
        MIGRATOR.run(&self.pool).await?;
        debug!("database migrations applied");
        Ok(())
    }

    /// Looks up a user by name
    pub async fn user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, tailscale_ip FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// Inserts a new user and returns the stored record
    #[instrument(skip(self, password_hash))]
    pub async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (username, password_hash) VALUES (?, ?)
             RETURNING id, username, password_hash, tailscale_ip",
        )
        .bind(username)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    /// Records a session token for `user_id` valid until `expires_at`
    pub async fn create_session(
        &self,
        user_id: i64,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO sessions (user_id, token, expires_at) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(token)
            .bind(expires_at.timestamp())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Resolves a session token to its user, ignoring sessions expired at `now`
    pub async fn session_user(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT u.id, u.username, u.password_hash, u.tailscale_ip
             FROM sessions s JOIN users u ON u.id = s.user_id
             WHERE s.token = ? AND s.expires_at > ?",
        )
        .bind(token)
        .bind(now.timestamp())
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// Deletes a session; returns whether one existed
    pub async fn delete_session(&self, token: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Inserts or replaces a widget value
    pub async fn save_widget_data(
        &self,
        user_id: i64,
        widget_name: &str,
        widget_key: &str,
        value_json: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO widget_data (user_id, widget_name, widget_key, value_json)
             VALUES (?, ?, ?, ?)
             ON CONFLICT (user_id, widget_name, widget_key)
             DO UPDATE SET value_json = excluded.value_json, updated_at = CURRENT_TIMESTAMP",
        )
        .bind(user_id)
        .bind(widget_name)
        .bind(widget_key)
        .bind(value_json)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Reads a widget value as raw JSON text
    pub async fn widget_data(
        &self,
        user_id: i64,
        widget_name: &str,
        widget_key: &str,
    ) -> Result<Option<String>, StoreError> {
        let row = sqlx::query(
            "SELECT value_json FROM widget_data
             WHERE user_id = ? AND widget_name = ? AND widget_key = ?",
        )
        .bind(user_id)
        .bind(widget_name)
        .bind(widget_key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|row| row.get("value_json")))
    }

    /// Inserts or replaces a user setting
    pub async fn save_setting(
        &self,
        user_id: i64,
        key: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO settings (user_id, setting_key, setting_value)
             VALUES (?, ?, ?)
             ON CONFLICT (user_id, setting_key)
             DO UPDATE SET setting_value = excluded.setting_value, updated_at = CURRENT_TIMESTAMP",
        )
        .bind(user_id)
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn setting(&self, user_id: i64, key: &str) -> Result<Option<String>, StoreError> {
        let row = sqlx::query(
            "SELECT setting_value FROM settings WHERE user_id = ? AND setting_key = ?",
        )
        .bind(user_id)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|row| row.get("setting_value")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    async fn create_test_store() -> Store {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = Store::from_pool(pool);
        store.migrate().await.unwrap();
        store
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 15, hour, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_create_and_find_user() {
        let store = create_test_store().await;

        let created = store.create_user("admin", "hash").await.unwrap();
        let found = store.user_by_username("admin").await.unwrap();

        assert_eq!(found, Some(created.clone()));
        assert_eq!(created.username, "admin");
        assert_eq!(created.tailscale_ip, None);
        assert!(store.user_by_username("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_is_rejected() {
        let store = create_test_store().await;

        store.create_user("admin", "hash").await.unwrap();
        let result = store.create_user("admin", "other").await;

        assert!(matches!(result, Err(StoreError::Database(_))));
    }

    #[tokio::test]
    async fn test_session_user_respects_expiry() {
        let store = create_test_store().await;
        let user = store.create_user("admin", "hash").await.unwrap();

        store.create_session(user.id, "tok", at(14)).await.unwrap();

        assert_eq!(store.session_user("tok", at(13)).await.unwrap(), Some(user));
        assert!(store.session_user("tok", at(14)).await.unwrap().is_none());
        assert!(store.session_user("other", at(13)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_session() {
        let store = create_test_store().await;
        let user = store.create_user("admin", "hash").await.unwrap();
        store
            .create_session(user.id, "tok", at(12) + Duration::hours(24))
            .await
            .unwrap();

        assert!(store.delete_session("tok").await.unwrap());
        assert!(!store.delete_session("tok").await.unwrap());
        assert!(store.session_user("tok", at(12)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_widget_data_upsert() {
        let store = create_test_store().await;
        let user = store.create_user("admin", "hash").await.unwrap();

        store
            .save_widget_data(user.id, "notes", "text", r#""first""#)
            .await
            .unwrap();
        store
            .save_widget_data(user.id, "notes", "text", r#""second""#)
            .await
            .unwrap();

        let value = store.widget_data(user.id, "notes", "text").await.unwrap();
        assert_eq!(value.as_deref(), Some(r#""second""#));
        assert!(store.widget_data(user.id, "notes", "other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_settings_upsert() {
        let store = create_test_store().await;
        let user = store.create_user("admin", "hash").await.unwrap();

        assert!(store.setting(user.id, "theme").await.unwrap().is_none());
        store.save_setting(user.id, "theme", "dark").await.unwrap();
        store.save_setting(user.id, "theme", "light").await.unwrap();

        assert_eq!(
            store.setting(user.id, "theme").await.unwrap().as_deref(),
            Some("light")
        );
    }

    #[tokio::test]
    async fn test_connect_creates_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("homedash.db");
        let url = format!("sqlite://{}", path.display());

        let store = Store::connect(&url).await.unwrap();
        store.migrate().await.unwrap();

        assert!(path.exists());
    }
}
