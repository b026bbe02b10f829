//! # Segue Common Library
//!
//! Shared code for the Segue player service and its clients:
//! - Event types (`PlayerEvent`) and the broadcast `EventBus`
//! - Value types shared across the API boundary (track ids, repeat mode, now-playing)
//! - Configuration file and data folder resolution
//! - Log formatting helpers

pub mod config;
pub mod error;
pub mod events;
pub mod time;

pub use error::{Error, Result};
pub use events::{EventBus, PlayerEvent};
