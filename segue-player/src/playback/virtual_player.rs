//! Clock-driven player resource
//!
//! Stands in for a real decoder/output device: "plays" a file by tracking
//! wall-clock time against the track's catalog duration, and reports the
//! end of the track from a timer task.

use crate::error::{Error, Result};
use crate::playback::slot::{PlayerFactory, PlayerResource, SlotEventSink};
use crate::playback::types::TrackSource;
use tokio::task::AbortHandle;
use tokio::time::{Duration, Instant};
use tracing::{debug, trace};

/// Duration assumed for tracks the catalog has no length for
pub const DEFAULT_TRACK_DURATION_MS: i64 = 180_000;

pub struct VirtualPlayer {
    events: SlotEventSink,
    default_duration_ms: i64,
    source: Option<TrackSource>,
    prepared: bool,
    duration_ms: i64,
    /// Position at the moment `started_at` was taken
    offset_ms: i64,
    started_at: Option<Instant>,
    volume: (f32, f32),
    end_timer: Option<AbortHandle>,
    released: bool,
}

impl VirtualPlayer {
    pub fn new(events: SlotEventSink, default_duration_ms: i64) -> Self {
        Self {
            events,
            default_duration_ms,
            source: None,
            prepared: false,
            duration_ms: 0,
            offset_ms: 0,
            started_at: None,
            volume: (1.0, 1.0),
            end_timer: None,
            released: false,
        }
    }

    pub fn volume(&self) -> (f32, f32) {
        self.volume
    }

    fn cancel_end_timer(&mut self) {
        if let Some(timer) = self.end_timer.take() {
            timer.abort();
        }
    }

    fn arm_end_timer(&mut self) {
        self.cancel_end_timer();
        let remaining = (self.duration_ms - self.position_ms()).max(0) as u64;
        let sink = self.events.clone();
        trace!("Slot {} ends in {}ms", sink.slot(), remaining);

        let task = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(remaining)).await;
            sink.track_ended();
        });
        self.end_timer = Some(task.abort_handle());
    }

    /// Freeze the clock at the current position
    fn halt(&mut self) {
        self.offset_ms = self.position_ms();
        self.started_at = None;
        self.cancel_end_timer();
    }
}

impl PlayerResource for VirtualPlayer {
    fn reset(&mut self) {
        self.cancel_end_timer();
        self.source = None;
        self.prepared = false;
        self.duration_ms = 0;
        self.offset_ms = 0;
        self.started_at = None;
    }

    fn set_source(&mut self, source: &TrackSource) -> Result<()> {
        if self.released {
            return Err(Error::InvalidState("player released".to_string()));
        }
        self.source = Some(source.clone());
        Ok(())
    }

    fn prepare(&mut self) -> Result<()> {
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| Error::InvalidState("no source set".to_string()))?;

        if !source.path.is_file() {
            return Err(Error::NotFound(format!(
                "audio file {} does not exist",
                source.path.display()
            )));
        }
        let duration = source.duration_ms.unwrap_or(self.default_duration_ms);
        if duration <= 0 {
            return Err(Error::Prepare {
                track: source.track_id,
                reason: format!("unusable duration {}ms", duration),
            });
        }

        debug!(
            "Virtual player prepared {} ({}ms)",
            source.path.display(),
            duration
        );
        self.duration_ms = duration;
        self.offset_ms = 0;
        self.prepared = true;
        Ok(())
    }

    fn start(&mut self) {
        if !self.prepared || self.started_at.is_some() {
            return;
        }
        self.started_at = Some(Instant::now());
        self.arm_end_timer();
    }

    fn pause(&mut self) {
        self.halt();
    }

    fn stop(&mut self) {
        self.halt();
        self.offset_ms = 0;
    }

    fn release(&mut self) {
        self.reset();
        self.released = true;
    }

    /// A finished track reads as stopped until it is restarted or re-prepared
    fn is_playing(&self) -> bool {
        self.started_at.is_some() && self.position_ms() < self.duration_ms
    }

    fn duration_ms(&self) -> i64 {
        if self.prepared {
            self.duration_ms
        } else {
            -1
        }
    }

    fn position_ms(&self) -> i64 {
        let elapsed = self
            .started_at
            .map(|t| t.elapsed().as_millis() as i64)
            .unwrap_or(0);
        (self.offset_ms + elapsed).min(self.duration_ms.max(0))
    }

    fn seek_to(&mut self, position_ms: i64) {
        self.offset_ms = position_ms.clamp(0, self.duration_ms.max(0));
        if self.started_at.is_some() {
            self.started_at = Some(Instant::now());
            self.arm_end_timer();
        }
    }

    fn set_volume(&mut self, left: f32, right: f32) {
        self.volume = (left, right);
    }
}

impl Drop for VirtualPlayer {
    fn drop(&mut self) {
        self.cancel_end_timer();
    }
}

/// Builds [`VirtualPlayer`]s for the engine's slots
pub struct VirtualPlayerFactory {
    default_duration_ms: i64,
}

impl VirtualPlayerFactory {
    pub fn new(default_duration_ms: i64) -> Self {
        Self {
            default_duration_ms,
        }
    }
}

impl Default for VirtualPlayerFactory {
    fn default() -> Self {
        Self::new(DEFAULT_TRACK_DURATION_MS)
    }
}

impl PlayerFactory for VirtualPlayerFactory {
    fn create(&self, events: SlotEventSink) -> Box<dyn PlayerResource> {
        Box::new(VirtualPlayer::new(events, self.default_duration_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::slot::{AudioOutputSlot, SlotEventKind};
    use crate::playback::types::SlotId;
    use segue_common::events::TrackId;
    use std::path::PathBuf;
    use std::sync::Arc;
    use tempfile::NamedTempFile;
    use tokio::sync::mpsc;

    fn source_for(path: PathBuf, duration_ms: Option<i64>) -> TrackSource {
        TrackSource {
            track_id: TrackId(7),
            path,
            duration_ms,
        }
    }

    #[tokio::test]
    async fn test_prepare_missing_file_fails() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut slot = AudioOutputSlot::new(SlotId::A, Arc::new(VirtualPlayerFactory::default()), tx);

        let result = slot.prepare(&source_for(PathBuf::from("/nonexistent/track.flac"), Some(1000)));
        assert!(result.is_err());
        assert!(!slot.is_initialized());
    }

    #[tokio::test]
    async fn test_track_end_reported() {
        let file = NamedTempFile::new().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut slot = AudioOutputSlot::new(SlotId::B, Arc::new(VirtualPlayerFactory::default()), tx);

        slot.prepare(&source_for(file.path().to_path_buf(), Some(40))).unwrap();
        assert_eq!(slot.duration(), 40);
        slot.start();
        assert!(slot.is_playing());

        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("track end not reported")
            .unwrap();
        assert_eq!(event.slot, SlotId::B);
        assert_eq!(event.kind, SlotEventKind::TrackEnded);
        assert_eq!(event.generation, slot.generation());
    }

    #[tokio::test]
    async fn test_pause_holds_position_and_suppresses_end() {
        let file = NamedTempFile::new().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut slot = AudioOutputSlot::new(SlotId::A, Arc::new(VirtualPlayerFactory::default()), tx);

        slot.prepare(&source_for(file.path().to_path_buf(), Some(60))).unwrap();
        slot.start();
        slot.pause();
        let held = slot.position();
        assert!(!slot.is_playing());

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(slot.position(), held);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_seek_clamps_to_duration() {
        let file = NamedTempFile::new().unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut slot = AudioOutputSlot::new(SlotId::A, Arc::new(VirtualPlayerFactory::new(5_000)), tx);

        slot.prepare(&source_for(file.path().to_path_buf(), None)).unwrap();
        assert_eq!(slot.duration(), 5_000);
        assert_eq!(slot.seek(9_000), 5_000);
        assert_eq!(slot.position(), 5_000);
        assert_eq!(slot.seek(1_500), 1_500);
        assert_eq!(slot.position(), 1_500);
    }
}
