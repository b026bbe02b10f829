//! Shared player state
//!
//! The engine publishes every notification here. `SharedState` fans them
//! out to SSE clients over the [`EventBus`] and folds them into a snapshot
//! the HTTP layer can read without a round trip to the engine task.

use crate::playback::services::Presenter;
use segue_common::events::{
    EventBus, NowPlaying, PlaybackState, PlayerEvent, RepeatMode, TrackId,
};
use serde::Serialize;
use std::sync::RwLock;
use tokio::sync::broadcast;
use tracing::warn;

/// Buffered events per SSE subscriber
const EVENT_CAPACITY: usize = 100;

/// Last known presenter-visible state
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlayerSnapshot {
    pub playing: bool,
    pub state: PlaybackState,
    pub now_playing: Option<NowPlaying>,
    pub queue: Vec<TrackId>,
    pub position: i64,
    pub repeat_mode: RepeatMode,
    pub session_active: bool,
    pub foreground: bool,
    pub last_failure: Option<String>,
}

/// Shared state accessible by the engine and the HTTP handlers
pub struct SharedState {
    events: EventBus,
    snapshot: RwLock<PlayerSnapshot>,
}

impl SharedState {
    pub fn new() -> Self {
        Self {
            events: EventBus::new(EVENT_CAPACITY),
            snapshot: RwLock::new(PlayerSnapshot {
                position: -1,
                ..Default::default()
            }),
        }
    }

    /// Subscribe to event stream for SSE
    pub fn subscribe_events(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        match self.snapshot.read() {
            Ok(snapshot) => snapshot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn apply(&self, event: &PlayerEvent) {
        let mut snapshot = match self.snapshot.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Player snapshot lock poisoned, recovering");
                poisoned.into_inner()
            }
        };

        match event {
            PlayerEvent::MetadataChanged {
                now_playing,
                queue_position,
                ..
            } => {
                snapshot.now_playing = now_playing.clone();
                snapshot.position = *queue_position;
            }
            PlayerEvent::PlayStateChanged { playing, state, .. } => {
                snapshot.playing = *playing;
                snapshot.state = *state;
            }
            PlayerEvent::QueueChanged { queue, position, .. } => {
                snapshot.queue = queue.clone();
                snapshot.position = *position;
            }
            PlayerEvent::PlaybackFailed { reason, .. } => {
                snapshot.last_failure = Some(reason.clone());
            }
            PlayerEvent::SessionActiveChanged { active, .. } => {
                snapshot.session_active = *active;
            }
            PlayerEvent::ForegroundChanged { foreground, .. } => {
                snapshot.foreground = *foreground;
            }
            PlayerEvent::RepeatModeChanged { mode, .. } => {
                snapshot.repeat_mode = *mode;
            }
        }
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

impl Presenter for SharedState {
    fn publish(&self, event: PlayerEvent) {
        self.apply(&event);
        // No SSE clients is fine
        self.events.emit_lossy(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use segue_common::events::QueueChangeTrigger;

    #[test]
    fn test_snapshot_defaults() {
        let state = SharedState::new();
        let snapshot = state.snapshot();
        assert!(!snapshot.playing);
        assert_eq!(snapshot.position, -1);
        assert!(snapshot.queue.is_empty());
    }

    #[test]
    fn test_events_fold_into_snapshot() {
        let state = SharedState::new();
        state.publish(PlayerEvent::QueueChanged {
            queue: vec![TrackId(3), TrackId(4)],
            position: 1,
            trigger: QueueChangeTrigger::Load,
            timestamp: Utc::now(),
        });
        state.publish(PlayerEvent::PlayStateChanged {
            playing: true,
            state: PlaybackState::Playing,
            timestamp: Utc::now(),
        });
        state.publish(PlayerEvent::RepeatModeChanged {
            mode: RepeatMode::All,
            timestamp: Utc::now(),
        });

        let snapshot = state.snapshot();
        assert_eq!(snapshot.queue, vec![TrackId(3), TrackId(4)]);
        assert_eq!(snapshot.position, 1);
        assert!(snapshot.playing);
        assert_eq!(snapshot.state, PlaybackState::Playing);
        assert_eq!(snapshot.repeat_mode, RepeatMode::All);
    }

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let state = SharedState::new();
        let mut rx = state.subscribe_events();

        state.publish(PlayerEvent::PlaybackFailed {
            track_id: Some(TrackId(9)),
            reason: "missing".to_string(),
            timestamp: Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type(), "PlaybackFailed");
        assert_eq!(state.snapshot().last_failure.as_deref(), Some("missing"));
    }
}
