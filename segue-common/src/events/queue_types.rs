//! Queue change type definitions

use serde::{Deserialize, Serialize};

/// Why the queue changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum QueueChangeTrigger {
    Enqueue,
    Load,
    Remove,
    Move,
    Shuffle,
    Uniqueify,
    Interleave,
    /// Queue restored from the settings store (startup or storage remount)
    Reload,
    StorageEjected,
}

impl std::fmt::Display for QueueChangeTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueChangeTrigger::Enqueue => write!(f, "Enqueue"),
            QueueChangeTrigger::Load => write!(f, "Load"),
            QueueChangeTrigger::Remove => write!(f, "Remove"),
            QueueChangeTrigger::Move => write!(f, "Move"),
            QueueChangeTrigger::Shuffle => write!(f, "Shuffle"),
            QueueChangeTrigger::Uniqueify => write!(f, "Uniqueify"),
            QueueChangeTrigger::Interleave => write!(f, "Interleave"),
            QueueChangeTrigger::Reload => write!(f, "Reload"),
            QueueChangeTrigger::StorageEjected => write!(f, "StorageEjected"),
        }
    }
}
