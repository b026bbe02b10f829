//! Database initialization
//!
//! Opens the player database, creates the tables the player needs and fills
//! in missing default settings.

use crate::error::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tracing::info;

/// File name of the player database inside the data folder
pub const DATABASE_FILE: &str = "segue.db";

/// Open (creating if needed) the database in `data_folder`
pub async fn open_database(data_folder: &Path) -> Result<Pool<Sqlite>> {
    std::fs::create_dir_all(data_folder)?;
    let path = data_folder.join(DATABASE_FILE);
    info!("Opening database {}", path.display());

    let options = SqliteConnectOptions::new()
        .filename(&path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Create the player tables if they do not exist
pub async fn create_tables(pool: &Pool<Sqlite>) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tracks (
            id INTEGER PRIMARY KEY,
            title TEXT,
            artist TEXT,
            artist_id INTEGER,
            album TEXT,
            album_id INTEGER,
            mime_type TEXT,
            folder_path TEXT,
            file_path TEXT NOT NULL,
            duration_ms INTEGER
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS genres (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS genre_tracks (
            genre_id INTEGER NOT NULL REFERENCES genres(id),
            track_id INTEGER NOT NULL REFERENCES tracks(id),
            PRIMARY KEY (genre_id, track_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Insert default values for settings that are missing
pub async fn init_settings_defaults(pool: &Pool<Sqlite>) -> Result<()> {
    let defaults = [
        // Fade length in seconds; 0 disables fading
        ("fade_seconds", "0"),
        ("crossfade_enabled", "0"),
        // Identifies the storage volume the saved queue belongs to
        ("volume_id", "0"),
    ];

    for (key, default_value) in defaults {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM settings WHERE key = ?)")
                .bind(key)
                .fetch_one(pool)
                .await?;

        if !exists {
            sqlx::query("INSERT INTO settings (key, value) VALUES (?, ?)")
                .bind(key)
                .bind(default_value)
                .execute(pool)
                .await?;

            info!("Initialized setting '{}' with default value: {}", key, default_value);
        }
    }

    Ok(())
}

/// Create tables and defaults
pub async fn initialize_database(pool: &Pool<Sqlite>) -> Result<()> {
    info!("Initializing database structures");
    create_tables(pool).await?;
    init_settings_defaults(pool).await?;
    info!("Database initialization complete");
    Ok(())
}
