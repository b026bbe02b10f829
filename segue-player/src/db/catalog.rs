//! Media catalog queries
//!
//! Read-only view of the `tracks`, `genres` and `genre_tracks` tables.
//! Populating them is the media library's job.

use crate::db::settings::get_setting;
use crate::error::Result;
use crate::playback::services::{Catalog, Genre, TrackMetadata};
use crate::playback::types::TrackSource;
use async_trait::async_trait;
use segue_common::events::TrackId;
use sqlx::{Pool, Row, Sqlite};
use std::path::PathBuf;

/// Setting holding the id of the mounted storage volume
pub const VOLUME_ID_KEY: &str = "volume_id";

/// [`Catalog`] over the player database
///
/// Relative `file_path`s resolve against `library_root`.
#[derive(Clone)]
pub struct SqliteCatalog {
    db: Pool<Sqlite>,
    library_root: PathBuf,
}

impl SqliteCatalog {
    pub fn new(db: Pool<Sqlite>, library_root: PathBuf) -> Self {
        Self { db, library_root }
    }
}

#[async_trait]
impl Catalog for SqliteCatalog {
    async fn track_metadata(&self, id: TrackId) -> Result<Option<TrackMetadata>> {
        let row = sqlx::query(
            r#"
            SELECT title, artist, artist_id, album, album_id, mime_type, folder_path
            FROM tracks WHERE id = ?
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(|row| TrackMetadata {
            title: row.get("title"),
            artist: row.get("artist"),
            artist_id: row.get("artist_id"),
            album: row.get("album"),
            album_id: row.get("album_id"),
            mime_type: row.get("mime_type"),
            folder_path: row.get("folder_path"),
        }))
    }

    async fn genre_for_track(&self, id: TrackId) -> Result<Option<Genre>> {
        let row = sqlx::query(
            r#"
            SELECT g.id, g.name
            FROM genres g
            JOIN genre_tracks gt ON gt.genre_id = g.id
            WHERE gt.track_id = ?
            ORDER BY gt.rowid
            LIMIT 1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(|row| Genre {
            id: row.get("id"),
            name: row.get("name"),
        }))
    }

    async fn track_source(&self, id: TrackId) -> Result<Option<TrackSource>> {
        let row = sqlx::query("SELECT file_path, duration_ms FROM tracks WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.db)
            .await?;

        Ok(row.map(|row| {
            let file_path: String = row.get("file_path");
            TrackSource {
                track_id: id,
                path: self.library_root.join(file_path),
                duration_ms: row.get("duration_ms"),
            }
        }))
    }

    async fn volume_id(&self) -> Result<i64> {
        Ok(get_setting::<i64>(&self.db, VOLUME_ID_KEY).await?.unwrap_or(0))
    }
}
