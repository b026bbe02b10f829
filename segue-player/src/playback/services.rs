//! Collaborator interfaces consumed by the engine
//!
//! The engine never talks to storage, the media catalog, the focus
//! arbiter or the UI directly. Each is injected at construction as a
//! trait object so the service binary can wire real backends and tests can
//! wire scripted ones.

use crate::error::Result;
use crate::playback::types::TrackSource;
use async_trait::async_trait;
use segue_common::events::{PlayerEvent, TrackId};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Setting keys used by the engine
pub mod keys {
    /// Encoded queue contents
    pub const QUEUE: &str = "queue";
    /// Storage volume the queue was saved against
    pub const CARD_ID: &str = "cardid";
    pub const CURRENT_POSITION: &str = "curpos";
    pub const SEEK_POSITION: &str = "seekpos";
    pub const REPEAT_MODE: &str = "repeatmode";
    pub const FADE_SECONDS: &str = "fade_seconds";
    pub const CROSSFADE_ENABLED: &str = "crossfade_enabled";
}

/// Catalog row for one track
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrackMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub artist_id: Option<i64>,
    pub album: Option<String>,
    pub album_id: Option<i64>,
    pub mime_type: Option<String>,
    pub folder_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

/// Queryable media catalog
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn track_metadata(&self, id: TrackId) -> Result<Option<TrackMetadata>>;

    /// Genre of a track. A track may belong to several; the first row wins.
    async fn genre_for_track(&self, id: TrackId) -> Result<Option<Genre>>;

    /// Playable source for a track, `None` if the catalog does not know it
    async fn track_source(&self, id: TrackId) -> Result<Option<TrackSource>>;

    /// Identity of the storage volume currently holding the media
    async fn volume_id(&self) -> Result<i64>;
}

/// Persistent key-value settings
///
/// Integer accessors are layered over the string ones; a value that fails to
/// parse reads as absent.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get_string(&self, key: &str) -> Result<Option<String>>;
    async fn put_string(&self, key: &str, value: &str) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;

    async fn get_int(&self, key: &str) -> Result<Option<i32>> {
        Ok(self.get_string(key).await?.and_then(|v| v.parse().ok()))
    }

    async fn put_int(&self, key: &str, value: i32) -> Result<()> {
        self.put_string(key, &value.to_string()).await
    }

    async fn get_long(&self, key: &str) -> Result<Option<i64>> {
        Ok(self.get_string(key).await?.and_then(|v| v.parse().ok()))
    }

    async fn put_long(&self, key: &str, value: i64) -> Result<()> {
        self.put_string(key, &value.to_string()).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusGrant {
    Granted,
    Denied,
}

/// Audio focus arbitration
///
/// Focus changes flow the other way, as engine commands.
pub trait FocusArbiter: Send + Sync {
    fn request_focus(&self) -> FocusGrant;
    fn abandon_focus(&self);
}

/// Sink for player notifications
pub trait Presenter: Send + Sync {
    fn publish(&self, event: PlayerEvent);
}

/// In-process focus arbiter: grants unless told to deny
#[derive(Debug, Default)]
pub struct LocalFocusArbiter {
    deny: AtomicBool,
    held: AtomicBool,
    requests: AtomicUsize,
}

impl LocalFocusArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent requests fail (another app holds exclusive focus)
    pub fn set_deny(&self, deny: bool) {
        self.deny.store(deny, Ordering::SeqCst);
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl FocusArbiter for LocalFocusArbiter {
    fn request_focus(&self) -> FocusGrant {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.deny.load(Ordering::SeqCst) {
            return FocusGrant::Denied;
        }
        self.held.store(true, Ordering::SeqCst);
        FocusGrant::Granted
    }

    fn abandon_focus(&self) {
        self.held.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_arbiter_grants_and_denies() {
        let arbiter = LocalFocusArbiter::new();
        assert_eq!(arbiter.request_focus(), FocusGrant::Granted);
        assert!(arbiter.is_held());

        arbiter.abandon_focus();
        arbiter.set_deny(true);
        assert_eq!(arbiter.request_focus(), FocusGrant::Denied);
        assert!(!arbiter.is_held());
        assert_eq!(arbiter.request_count(), 2);
    }
}
