//! Playback engine
//!
//! Owns the queue and both output slots and orchestrates every transition
//! between tracks.
//!
//! **Module layout:**
//! - `core`: struct, construction, lifecycle, shared helpers
//! - `playback`: transport, track-ended policy, fades, crossfade, focus, resource death
//! - `queue`: queue mutations and re-anchoring
//! - `persistence`: saving and restoring queue state, storage eject/mount
//!
//! The engine is single-owner: it is driven by exactly one task (see
//! [`crate::playback::handle`]), so none of its methods need locking.

mod core;
mod persistence;
mod playback;
mod queue;

pub use self::core::{EngineServices, EngineStatus, PlaybackEngine, QueueSnapshot};

/// How a failed open of the current entry is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OpenMode {
    /// User-initiated: report the failure and go idle
    Direct,
    /// Track-ended: skip forward past unplayable entries
    SkipUnplayable,
    /// Restoring state: go idle without a failure notification
    Quiet,
}
