//! Event types for the segue event system
//!
//! Provides the presenter-facing event definitions and the broadcast
//! EventBus that fans them out to SSE clients and other observers.

mod playback_types;
mod queue_types;
mod shared_types;

pub use playback_types::{EnqueueMode, FocusChange, PlaybackState, RepeatMode};
pub use queue_types::QueueChangeTrigger;
pub use shared_types::{NowPlaying, TrackId};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Player notifications
///
/// Emitted by the playback engine whenever externally visible state
/// changes, serialized with a `type` tag for SSE transmission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlayerEvent {
    /// Current track or its metadata changed
    MetadataChanged {
        now_playing: Option<NowPlaying>,
        /// Queue index of the current entry, -1 when the queue is empty
        queue_position: i64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The engine's "supposed to be playing" intent flipped
    PlayStateChanged {
        playing: bool,
        state: PlaybackState,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Queue contents or order changed
    QueueChanged {
        queue: Vec<TrackId>,
        position: i64,
        trigger: QueueChangeTrigger,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A track could not be opened
    ///
    /// Not emitted while reloading persisted state.
    PlaybackFailed {
        track_id: Option<TrackId>,
        reason: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Media session activated or deactivated
    SessionActiveChanged {
        active: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Foreground (ongoing notification) status changed
    ForegroundChanged {
        foreground: bool,
        now_playing: Option<NowPlaying>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    RepeatModeChanged {
        mode: RepeatMode,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl PlayerEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            PlayerEvent::MetadataChanged { .. } => "MetadataChanged",
            PlayerEvent::PlayStateChanged { .. } => "PlayStateChanged",
            PlayerEvent::QueueChanged { .. } => "QueueChanged",
            PlayerEvent::PlaybackFailed { .. } => "PlaybackFailed",
            PlayerEvent::SessionActiveChanged { .. } => "SessionActiveChanged",
            PlayerEvent::ForegroundChanged { .. } => "ForegroundChanged",
            PlayerEvent::RepeatModeChanged { .. } => "RepeatModeChanged",
        }
    }
}

/// Broadcast channel for player events
///
/// Slow subscribers lose the oldest events once `capacity` is exceeded.
pub struct EventBus {
    tx: broadcast::Sender<PlayerEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    ///
    /// ```
    /// use segue_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.capacity(), 100);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: PlayerEvent,
    ) -> Result<usize, broadcast::error::SendError<PlayerEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: PlayerEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
