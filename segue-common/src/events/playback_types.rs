//! Playback-related type definitions
//!
//! Supporting types for playback state, repeat policy and audio focus.

use serde::{Deserialize, Serialize};

/// Logical "now playing" state of the engine (distinct from raw slot states)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    /// Nothing prepared, or queue exhausted / storage ejected
    #[default]
    Idle,
    /// A track is being bound to the current slot
    Preparing,
    Playing,
    Paused,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "idle"),
            PlaybackState::Preparing => write!(f, "preparing"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
        }
    }
}

/// Track-ended transition policy
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RepeatMode {
    #[default]
    None,
    Current,
    All,
    /// Stop once the current track finishes
    StopAfter,
}

impl RepeatMode {
    /// Integer code used in the settings store
    pub fn to_persisted(self) -> i32 {
        match self {
            RepeatMode::None => 0,
            RepeatMode::Current => 1,
            RepeatMode::All => 2,
            RepeatMode::StopAfter => 3,
        }
    }

    /// Restore a persisted code. Only `All` and `Current` survive a restart;
    /// every other value (including `StopAfter` and garbage) becomes `None`.
    pub fn from_persisted(code: i32) -> Self {
        match code {
            1 => RepeatMode::Current,
            2 => RepeatMode::All,
            _ => RepeatMode::None,
        }
    }
}

impl std::fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepeatMode::None => write!(f, "none"),
            RepeatMode::Current => write!(f, "current"),
            RepeatMode::All => write!(f, "all"),
            RepeatMode::StopAfter => write!(f, "stop_after"),
        }
    }
}

/// Where an enqueue places its tracks
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EnqueueMode {
    /// Append and jump to the first added track
    Now,
    /// Insert right after the current entry (appends when at the tail)
    Next,
    /// Append to the end of the queue
    Last,
}

/// Audio focus change signalled by the focus arbiter
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FocusChange {
    /// Focus lost for good (another player took over)
    Loss,
    /// Focus lost briefly (e.g. a call)
    LossTransient,
    /// Focus lost briefly, but playing quietly is acceptable
    LossTransientCanDuck,
    Gain,
}
