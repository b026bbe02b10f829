//! Settings database access
//!
//! Read/write settings from the settings table (key-value store), and the
//! two [`SettingsStore`] backends the engine persists its queue through.

use crate::error::{Error, Result};
use crate::playback::services::SettingsStore;
use async_trait::async_trait;
use sqlx::{Pool, Sqlite};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Mutex;

/// Generic setting getter
///
/// Returns `None` if the key is absent, and an error if the stored value
/// does not parse as `T`.
pub async fn get_setting<T: FromStr>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await?;

    match value {
        Some(s) => match s.parse::<T>() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => Err(Error::Config(format!(
                "Failed to parse setting '{}' value: {}",
                key, s
            ))),
        },
        None => Ok(None),
    }
}

/// Generic setting setter (insert or update)
pub async fn set_setting<T: ToString>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value)
        VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await?;

    Ok(())
}

pub async fn delete_setting(db: &Pool<Sqlite>, key: &str) -> Result<()> {
    sqlx::query("DELETE FROM settings WHERE key = ?")
        .bind(key)
        .execute(db)
        .await?;
    Ok(())
}

/// Settings store backed by the `settings` table
#[derive(Clone)]
pub struct SqliteSettings {
    db: Pool<Sqlite>,
}

impl SqliteSettings {
    pub fn new(db: Pool<Sqlite>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SettingsStore for SqliteSettings {
    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        get_setting::<String>(&self.db, key).await
    }

    async fn put_string(&self, key: &str, value: &str) -> Result<()> {
        set_setting(&self.db, key, value).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        delete_setting(&self.db, key).await
    }
}

/// Process-local settings store
#[derive(Default)]
pub struct MemorySettings {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.values
            .lock()
            .map_err(|_| Error::Internal("settings lock poisoned".to_string()))
    }
}

#[async_trait]
impl SettingsStore for MemorySettings {
    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    async fn put_string(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}
