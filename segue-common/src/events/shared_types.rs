//! Shared type definitions for event data

use serde::{Deserialize, Serialize};

/// Opaque key into the track catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub i64);

impl From<i64> for TrackId {
    fn from(id: i64) -> Self {
        TrackId(id)
    }
}

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Denormalized description of the current track, mirrored to presenters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct NowPlaying {
    pub track_id: Option<TrackId>,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub artist_id: Option<i64>,
    pub album: Option<String>,
    pub album_id: Option<i64>,
    pub genre: Option<String>,
    pub genre_id: Option<i64>,
    pub mime_type: Option<String>,
    pub folder_path: Option<String>,
}
