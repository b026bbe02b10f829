//! Playback engine and queue management

pub mod engine;
pub mod fader;
pub mod handle;
pub mod queue;
pub mod services;
pub mod slot;
pub mod types;
pub mod virtual_player;

pub use engine::{EngineServices, EngineStatus, PlaybackEngine, QueueSnapshot};
pub use handle::{spawn_engine, EngineHandle};
pub use queue::Queue;
pub use virtual_player::VirtualPlayerFactory;
