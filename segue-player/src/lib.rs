//! # Segue Player Library (segue-player)
//!
//! Playback-queue and dual-slot crossfade engine.
//!
//! **Purpose:** Own an ordered queue of catalog tracks, drive two audio
//! output slots so consecutive tracks can overlap, apply fade, duck and
//! crossfade ramps, persist the queue across restarts and expose the whole
//! thing over an HTTP/SSE control interface.
//!
//! **Architecture:** A single tokio task owns the [`PlaybackEngine`]; every
//! command, slot notification and fade timer is serialized through it.
//!
//! [`PlaybackEngine`]: playback::PlaybackEngine

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod playback;
pub mod state;

pub use error::{Error, Result};
pub use state::SharedState;
