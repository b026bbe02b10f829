//! Playback types shared across modules

use segue_common::events::TrackId;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// Consecutive open failures tolerated while skipping unplayable entries
pub const MAX_OPEN_FAILURES: u32 = 10;

/// Below this position, "previous" skips back instead of restarting the track
pub const RESTART_THRESHOLD_MS: i64 = 2000;

/// Distance from the end of a track at which `play()` advances instead of resuming
pub const NEAR_END_MS: i64 = 2000;

/// Identity of one of the two output slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SlotId {
    A,
    B,
}

impl SlotId {
    pub fn index(self) -> usize {
        match self {
            SlotId::A => 0,
            SlotId::B => 1,
        }
    }
}

impl std::fmt::Display for SlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SlotId::A => write!(f, "A"),
            SlotId::B => write!(f, "B"),
        }
    }
}

/// Raw state of one output slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
    #[default]
    NotPrepared,
    Prepared,
    Playing,
    Paused,
}

/// Everything a player resource needs to play one track
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackSource {
    pub track_id: TrackId,
    pub path: PathBuf,
    /// Known duration, if the catalog has one
    pub duration_ms: Option<i64>,
}

/// Engine timing knobs
///
/// Production values come from `Default`; tests shorten the delays.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Fade ramp cadence
    pub fade_tick: Duration,
    /// Pause between recreating a dead resource and acting on it
    pub resource_died_delay: Duration,
    /// Back-off before re-probing the catalog during startup reload
    pub reload_retry_delay: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fade_tick: Duration::from_millis(10),
            resource_died_delay: Duration::from_millis(2000),
            reload_retry_delay: Duration::from_secs(3),
        }
    }
}
