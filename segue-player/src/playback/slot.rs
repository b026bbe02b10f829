//! Audio output slots
//!
//! An [`AudioOutputSlot`] wraps exactly one [`PlayerResource`], the opaque
//! capability that actually renders audio. The engine owns two slots so an
//! incoming track can start while the outgoing one is still audible.
//!
//! Resources report completion and failure from whatever context they run
//! in by pushing a [`SlotEvent`] onto an unbounded channel; the engine task
//! drains that channel, so no slot state is touched off the engine task.
//!
//! Each event is stamped with the slot's generation at the time it was sent.
//! The generation advances on every prepare, stop and recreate, which makes
//! events from a superseded binding recognisably stale.

use crate::error::{Error, Result};
use crate::playback::types::{SlotId, SlotState, TrackSource};
use segue_common::events::TrackId;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Asynchronous slot notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotEventKind {
    /// Playback reached the end of the track
    TrackEnded,
    /// The underlying resource failed and must be recreated
    ResourceDied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotEvent {
    pub slot: SlotId,
    pub generation: u64,
    pub kind: SlotEventKind,
}

/// Handle given to a player resource for reporting back to the engine
#[derive(Debug, Clone)]
pub struct SlotEventSink {
    slot: SlotId,
    generation: Arc<AtomicU64>,
    tx: mpsc::UnboundedSender<SlotEvent>,
}

impl SlotEventSink {
    pub fn slot(&self) -> SlotId {
        self.slot
    }

    pub fn track_ended(&self) {
        self.send(SlotEventKind::TrackEnded);
    }

    pub fn resource_died(&self) {
        self.send(SlotEventKind::ResourceDied);
    }

    fn send(&self, kind: SlotEventKind) {
        let event = SlotEvent {
            slot: self.slot,
            generation: self.generation.load(Ordering::SeqCst),
            kind,
        };
        // Receiver gone means the engine is shutting down
        let _ = self.tx.send(event);
    }
}

/// The opaque playback capability behind a slot
///
/// Implementations must be cheap to call: every method runs on the engine
/// task. Completion is reported through the [`SlotEventSink`] handed to
/// [`PlayerFactory::create`].
pub trait PlayerResource: Send + Sync {
    /// Drop any bound source and return to the idle state
    fn reset(&mut self);
    fn set_source(&mut self, source: &TrackSource) -> Result<()>;
    fn prepare(&mut self) -> Result<()>;
    fn start(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);
    /// Free the resource for good
    fn release(&mut self);
    fn is_playing(&self) -> bool;
    fn duration_ms(&self) -> i64;
    fn position_ms(&self) -> i64;
    fn seek_to(&mut self, position_ms: i64);
    fn set_volume(&mut self, left: f32, right: f32);
}

/// Creates player resources for slots, initially and after resource death
pub trait PlayerFactory: Send + Sync {
    fn create(&self, events: SlotEventSink) -> Box<dyn PlayerResource>;
}

/// One of the engine's two output units
pub struct AudioOutputSlot {
    id: SlotId,
    factory: Arc<dyn PlayerFactory>,
    events: mpsc::UnboundedSender<SlotEvent>,
    generation: Arc<AtomicU64>,
    /// `None` once released
    resource: Option<Box<dyn PlayerResource>>,
    state: SlotState,
    gain: f32,
    track: Option<TrackId>,
}

impl AudioOutputSlot {
    pub fn new(
        id: SlotId,
        factory: Arc<dyn PlayerFactory>,
        events: mpsc::UnboundedSender<SlotEvent>,
    ) -> Self {
        let generation = Arc::new(AtomicU64::new(0));
        let sink = SlotEventSink {
            slot: id,
            generation: Arc::clone(&generation),
            tx: events.clone(),
        };
        let resource = factory.create(sink);
        Self {
            id,
            factory,
            events,
            generation,
            resource: Some(resource),
            state: SlotState::NotPrepared,
            gain: 1.0,
            track: None,
        }
    }

    pub fn id(&self) -> SlotId {
        self.id
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> SlotState {
        self.state
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Track currently bound to this slot
    pub fn track(&self) -> Option<TrackId> {
        self.track
    }

    fn bump_generation(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Bind `source` and prepare it synchronously.
    ///
    /// On failure the slot is left uninitialised; the error is for the
    /// caller to report, never fatal.
    pub fn prepare(&mut self, source: &TrackSource) -> Result<()> {
        self.bump_generation();
        self.state = SlotState::NotPrepared;
        self.track = None;

        let Some(resource) = self.resource.as_mut() else {
            return Err(Error::InvalidState(format!("slot {} already released", self.id)));
        };

        resource.reset();
        let bound = resource
            .set_source(source)
            .and_then(|_| resource.prepare());

        match bound {
            Ok(()) => {
                self.state = SlotState::Prepared;
                self.track = Some(source.track_id);
                debug!("Slot {} prepared track {}", self.id, source.track_id);
                Ok(())
            }
            Err(e) => {
                resource.reset();
                Err(Error::Prepare {
                    track: source.track_id,
                    reason: e.to_string(),
                })
            }
        }
    }

    pub fn start(&mut self) {
        if !self.is_initialized() {
            return;
        }
        if let Some(resource) = self.resource.as_mut() {
            resource.start();
            self.state = SlotState::Playing;
        }
    }

    pub fn pause(&mut self) {
        if self.state != SlotState::Playing {
            return;
        }
        if let Some(resource) = self.resource.as_mut() {
            resource.pause();
            self.state = SlotState::Paused;
        }
    }

    /// Stop and unbind. Always succeeds.
    pub fn stop(&mut self) {
        if let Some(resource) = self.resource.as_mut() {
            if self.state != SlotState::NotPrepared {
                resource.stop();
            }
            resource.reset();
        }
        self.bump_generation();
        self.state = SlotState::NotPrepared;
        self.track = None;
    }

    pub fn is_initialized(&self) -> bool {
        self.state != SlotState::NotPrepared
    }

    pub fn is_playing(&self) -> bool {
        self.is_initialized() && self.resource.as_ref().is_some_and(|r| r.is_playing())
    }

    /// Track duration in ms, `-1` when not initialised
    pub fn duration(&self) -> i64 {
        match self.resource.as_ref() {
            Some(r) if self.is_initialized() => r.duration_ms(),
            _ => -1,
        }
    }

    /// Playback position in ms, `-1` when not initialised
    pub fn position(&self) -> i64 {
        match self.resource.as_ref() {
            Some(r) if self.is_initialized() => r.position_ms(),
            _ => -1,
        }
    }

    /// Seek, clamped to `[0, duration]`. Returns the position applied.
    pub fn seek(&mut self, position_ms: i64) -> i64 {
        if !self.is_initialized() {
            return -1;
        }
        let duration = self.duration();
        let target = position_ms.clamp(0, duration.max(0));
        if let Some(resource) = self.resource.as_mut() {
            resource.seek_to(target);
        }
        target
    }

    /// Apply `gain` to both channels
    pub fn set_volume(&mut self, gain: f32) {
        self.gain = gain.clamp(0.0, 1.0);
        if let Some(resource) = self.resource.as_mut() {
            resource.set_volume(self.gain, self.gain);
        }
    }

    /// Replace a dead resource with a fresh one
    pub fn recreate(&mut self) {
        if let Some(mut old) = self.resource.take() {
            old.release();
        } else {
            warn!("Slot {} recreate after release ignored", self.id);
            return;
        }
        self.bump_generation();
        let sink = SlotEventSink {
            slot: self.id,
            generation: Arc::clone(&self.generation),
            tx: self.events.clone(),
        };
        let mut resource = self.factory.create(sink);
        resource.set_volume(self.gain, self.gain);
        self.resource = Some(resource);
        self.state = SlotState::NotPrepared;
        self.track = None;
    }

    /// Free the resource. Terminal: later calls are no-ops.
    pub fn release(&mut self) {
        match self.resource.take() {
            Some(mut resource) => {
                resource.release();
                self.bump_generation();
                self.state = SlotState::NotPrepared;
                self.track = None;
            }
            None => warn!("Slot {} released twice", self.id),
        }
    }

    pub fn is_released(&self) -> bool {
        self.resource.is_none()
    }
}
