//! Core playback engine - construction, lifecycle and shared helpers
//!
//! **Responsibilities:**
//! - PlaybackEngine struct definition and initialization
//! - Lifecycle control (start, shutdown)
//! - Opening the current queue entry onto a slot
//! - Presenter notifications and the status snapshot

use super::OpenMode;
use crate::error::{Error, Result};
use crate::playback::fader::{FadeKind, FadeScheduler};
use crate::playback::queue::Queue;
use crate::playback::services::{Catalog, FocusArbiter, Presenter, SettingsStore};
use crate::playback::slot::{AudioOutputSlot, PlayerFactory, SlotEvent, SlotEventKind};
use crate::playback::types::{EngineConfig, SlotId, MAX_OPEN_FAILURES};
use segue_common::events::{
    NowPlaying, PlaybackState, PlayerEvent, QueueChangeTrigger, RepeatMode, TrackId,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Collaborators injected into the engine
#[derive(Clone)]
pub struct EngineServices {
    pub catalog: Arc<dyn Catalog>,
    pub settings: Arc<dyn SettingsStore>,
    pub focus: Arc<dyn FocusArbiter>,
    pub presenter: Arc<dyn Presenter>,
    pub players: Arc<dyn PlayerFactory>,
}

/// Point-in-time view of the engine for the control API
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub state: PlaybackState,
    /// Intent-level play flag
    pub playing: bool,
    /// Queue index of the current entry, -1 when unset
    pub position: i64,
    pub seek_ms: i64,
    pub duration_ms: i64,
    pub repeat_mode: RepeatMode,
    pub now_playing: Option<NowPlaying>,
    pub queue_length: usize,
    pub fade_seconds: i64,
    pub crossfade_enabled: bool,
    pub paused_by_transient_loss: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueueSnapshot {
    pub tracks: Vec<TrackId>,
    pub position: i64,
}

/// The playback-queue and dual-slot crossfade engine
pub struct PlaybackEngine {
    pub(super) config: EngineConfig,
    pub(super) catalog: Arc<dyn Catalog>,
    pub(super) settings: Arc<dyn SettingsStore>,
    pub(super) focus: Arc<dyn FocusArbiter>,
    pub(super) presenter: Arc<dyn Presenter>,

    pub(super) queue: Queue,
    pub(super) slots: [AudioOutputSlot; 2],
    /// Index into `slots` of the current slot; the other one is "next"
    pub(super) current: usize,
    pub(super) fades: FadeScheduler,
    pub(super) repeat_mode: RepeatMode,
    pub(super) state: PlaybackState,

    pub(super) is_supposed_to_be_playing: bool,
    pub(super) paused_by_transient_loss: bool,
    pub(super) session_active: bool,
    pub(super) foreground: bool,
    pub(super) now_playing: Option<NowPlaying>,

    /// Cleared while removable storage is ejected
    pub(super) saveable: bool,
    pub(super) volume_id: i64,
    pub(super) open_failures: u32,

    pub(super) fade_seconds: i64,
    pub(super) crossfade_enabled: bool,
}

impl PlaybackEngine {
    /// Create an engine and the receiving end of its slot event channel.
    ///
    /// The receiver must be drained by whoever drives the engine; events
    /// are fed back through [`PlaybackEngine::on_slot_event`].
    pub fn new(
        services: EngineServices,
        config: EngineConfig,
    ) -> (Self, mpsc::UnboundedReceiver<SlotEvent>) {
        let (slot_tx, slot_rx) = mpsc::unbounded_channel();
        let slots = [
            AudioOutputSlot::new(SlotId::A, Arc::clone(&services.players), slot_tx.clone()),
            AudioOutputSlot::new(SlotId::B, Arc::clone(&services.players), slot_tx),
        ];

        let engine = Self {
            config,
            catalog: services.catalog,
            settings: services.settings,
            focus: services.focus,
            presenter: services.presenter,
            queue: Queue::new(),
            slots,
            current: 0,
            fades: FadeScheduler::new(),
            repeat_mode: RepeatMode::None,
            state: PlaybackState::Idle,
            is_supposed_to_be_playing: false,
            paused_by_transient_loss: false,
            session_active: false,
            foreground: false,
            now_playing: None,
            saveable: true,
            volume_id: 0,
            open_failures: 0,
            fade_seconds: 0,
            crossfade_enabled: false,
        };
        (engine, slot_rx)
    }

    /// Load fade settings and restore the persisted queue
    pub async fn start(&mut self) -> Result<()> {
        info!("Starting playback engine");

        self.volume_id = match self.catalog.volume_id().await {
            Ok(id) => id,
            Err(e) => {
                warn!("Could not determine storage volume id: {}", e);
                0
            }
        };
        self.load_fade_settings().await;

        self.saveable = false;
        self.reload_queue().await;
        self.saveable = true;

        self.emit_queue_changed(QueueChangeTrigger::Reload);
        info!(
            "Playback engine ready: {} tracks queued, position {}",
            self.queue.len(),
            self.queue.position_i64()
        );
        Ok(())
    }

    /// Persist state and release both slots. The engine is unusable afterwards.
    pub async fn shutdown(&mut self) {
        if self.is_supposed_to_be_playing {
            error!("Playback engine torn down while playing");
        }
        self.save_queue(true).await;
        self.fades.cancel_all();
        for slot in self.slots.iter_mut() {
            if !slot.is_released() {
                slot.release();
            }
        }
        self.focus.abandon_focus();
        self.set_session_active(false);
        info!("Playback engine stopped");
    }

    // ---- accessors ----------------------------------------------------

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn repeat_mode(&self) -> RepeatMode {
        self.repeat_mode
    }

    pub fn is_supposed_to_be_playing(&self) -> bool {
        self.is_supposed_to_be_playing
    }

    pub fn paused_by_transient_loss(&self) -> bool {
        self.paused_by_transient_loss
    }

    pub fn now_playing(&self) -> Option<&NowPlaying> {
        self.now_playing.as_ref()
    }

    pub fn is_saveable(&self) -> bool {
        self.saveable
    }

    pub fn fades(&self) -> &FadeScheduler {
        &self.fades
    }

    pub fn current_slot(&self) -> &AudioOutputSlot {
        &self.slots[self.current]
    }

    pub fn next_slot(&self) -> &AudioOutputSlot {
        &self.slots[1 - self.current]
    }

    pub fn status(&self) -> EngineStatus {
        let slot = self.current_slot();
        EngineStatus {
            state: self.state,
            playing: self.is_supposed_to_be_playing,
            position: self.queue.position_i64(),
            seek_ms: slot.position(),
            duration_ms: slot.duration(),
            repeat_mode: self.repeat_mode,
            now_playing: self.now_playing.clone(),
            queue_length: self.queue.len(),
            fade_seconds: self.fade_seconds,
            crossfade_enabled: self.crossfade_enabled,
            paused_by_transient_loss: self.paused_by_transient_loss,
        }
    }

    pub fn queue_snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            tracks: self.queue.as_slice().to_vec(),
            position: self.queue.position_i64(),
        }
    }

    // ---- event loop entry points -------------------------------------

    /// Earliest pending timer, for the driving task to sleep on
    pub fn next_deadline(&self) -> Option<Instant> {
        self.fades.next_deadline()
    }

    /// Run every timer due at `now`
    pub async fn fire_due_timers(&mut self, now: Instant) {
        for kind in self.fades.take_due(now) {
            self.on_timer(kind).await;
        }
    }

    /// Handle a slot notification re-dispatched onto the engine task
    pub async fn on_slot_event(&mut self, event: SlotEvent) {
        let index = event.slot.index();
        let live = self.slots[index].generation();
        if event.generation != live {
            debug!(
                "Ignoring stale {:?} from slot {} (generation {} != {})",
                event.kind, event.slot, event.generation, live
            );
            return;
        }

        match event.kind {
            SlotEventKind::TrackEnded if index == self.current => self.on_track_ended().await,
            SlotEventKind::TrackEnded => {
                debug!("Incoming slot {} ended before the outgoing one", event.slot);
                self.slots[index].stop();
            }
            SlotEventKind::ResourceDied => self.on_resource_died(index),
        }
    }

    // ---- shared helpers ----------------------------------------------

    pub(super) fn cur(&self) -> &AudioOutputSlot {
        &self.slots[self.current]
    }

    pub(super) fn cur_mut(&mut self) -> &mut AudioOutputSlot {
        &mut self.slots[self.current]
    }

    pub(super) fn next_index(&self) -> usize {
        1 - self.current
    }

    pub(super) fn swap_slots(&mut self) {
        self.current = self.next_index();
        debug!("Slot {} is now current", self.cur().id());
    }

    /// Stop a pre-buffered or crossfading next slot
    pub(super) fn stop_next_slot(&mut self) {
        self.fades.cancel(FadeKind::CrossfadeStep);
        let next = self.next_index();
        if self.slots[next].is_initialized() {
            debug!("Stopping pre-buffered slot {}", self.slots[next].id());
            self.slots[next].stop();
        }
    }

    pub(super) fn publish(&self, event: PlayerEvent) {
        self.presenter.publish(event);
    }

    /// Flip the play intent, notifying only on an actual change
    pub(super) fn set_playing_intent(&mut self, playing: bool) {
        if self.is_supposed_to_be_playing == playing {
            return;
        }
        self.is_supposed_to_be_playing = playing;
        self.publish(PlayerEvent::PlayStateChanged {
            playing,
            state: self.state,
            timestamp: chrono::Utc::now(),
        });
    }

    pub(super) fn set_foreground(&mut self, foreground: bool) {
        if self.foreground == foreground {
            return;
        }
        self.foreground = foreground;
        self.publish(PlayerEvent::ForegroundChanged {
            foreground,
            now_playing: self.now_playing.clone(),
            timestamp: chrono::Utc::now(),
        });
    }

    pub(super) fn set_session_active(&mut self, active: bool) {
        if self.session_active == active {
            return;
        }
        self.session_active = active;
        self.publish(PlayerEvent::SessionActiveChanged {
            active,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Cancel ramps and leave the foreground
    pub(super) fn go_idle(&mut self, state: PlaybackState) {
        self.fades.cancel_many(&FadeKind::RAMPS);
        self.state = state;
        self.set_foreground(false);
    }

    pub(super) fn emit_queue_changed(&self, trigger: QueueChangeTrigger) {
        self.publish(PlayerEvent::QueueChanged {
            queue: self.queue.as_slice().to_vec(),
            position: self.queue.position_i64(),
            trigger,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Bind `id` to slot `index`, starting silent if fading is enabled
    pub(super) async fn prepare_slot(&mut self, index: usize, id: TrackId) -> Result<()> {
        let source = self
            .catalog
            .track_source(id)
            .await?
            .ok_or_else(|| Error::Prepare {
                track: id,
                reason: "not in catalog".to_string(),
            })?;

        self.slots[index].prepare(&source)?;
        let gain = if self.fade_seconds > 0 { 0.0 } else { 1.0 };
        self.slots[index].set_volume(gain);
        Ok(())
    }

    /// Bind the current queue entry to the current slot, leaving it paused.
    ///
    /// Returns `false` (and goes idle) if nothing could be opened.
    pub(crate) async fn open_current(&mut self, mode: OpenMode) -> bool {
        self.cur_mut().stop();

        loop {
            let Some(id) = self.queue.current_id() else {
                return false;
            };
            self.state = PlaybackState::Preparing;

            let err = match self.prepare_slot(self.current, id).await {
                Ok(()) => {
                    self.open_failures = 0;
                    self.state = PlaybackState::Paused;
                    self.refresh_now_playing().await;
                    return true;
                }
                Err(e) => e,
            };
            warn!("Failed to open track {}: {}", id, err);

            if mode == OpenMode::SkipUnplayable
                && self.open_failures < MAX_OPEN_FAILURES
                && self.queue.len() > 1
            {
                self.open_failures += 1;
                if let Some(next) = self.upcoming_position() {
                    debug!("Skipping to queue position {}", next);
                    self.queue.set_position(Some(next));
                    continue;
                }
            }

            self.open_failures = 0;
            if mode != OpenMode::Quiet {
                self.publish(PlayerEvent::PlaybackFailed {
                    track_id: Some(id),
                    reason: err.to_string(),
                    timestamp: chrono::Utc::now(),
                });
            }
            self.go_idle(PlaybackState::Idle);
            self.set_playing_intent(false);
            return false;
        }
    }

    /// Queue index the track-ended policy would move to
    ///
    /// `All` wraps at the tail; `None` stops there. `Current` and
    /// `StopAfter` never move on.
    pub(super) fn upcoming_position(&self) -> Option<usize> {
        let position = self.queue.position()?;
        match self.repeat_mode {
            RepeatMode::Current | RepeatMode::StopAfter => None,
            _ if position + 1 < self.queue.len() => Some(position + 1),
            RepeatMode::All => Some(0),
            RepeatMode::None => None,
        }
    }

    /// Look up and publish metadata for the track on the current slot
    pub(super) async fn refresh_now_playing(&mut self) {
        let Some(id) = self.cur().track() else {
            self.now_playing = None;
            self.publish_metadata();
            return;
        };

        let metadata = match self.catalog.track_metadata(id).await {
            Ok(metadata) => metadata.unwrap_or_default(),
            Err(e) => {
                warn!("Metadata lookup for track {} failed: {}", id, e);
                Default::default()
            }
        };
        let genre = match self.catalog.genre_for_track(id).await {
            Ok(genre) => genre,
            Err(e) => {
                warn!("Genre lookup for track {} failed: {}", id, e);
                None
            }
        };

        self.now_playing = Some(NowPlaying {
            track_id: Some(id),
            title: metadata.title,
            artist: metadata.artist,
            artist_id: metadata.artist_id,
            album: metadata.album,
            album_id: metadata.album_id,
            genre_id: genre.as_ref().map(|g| g.id),
            genre: genre.map(|g| g.name),
            mime_type: metadata.mime_type,
            folder_path: metadata.folder_path,
        });
        self.publish_metadata();

        if self.foreground {
            self.publish(PlayerEvent::ForegroundChanged {
                foreground: true,
                now_playing: self.now_playing.clone(),
                timestamp: chrono::Utc::now(),
            });
        }
    }

    pub(super) fn publish_metadata(&self) {
        self.publish(PlayerEvent::MetadataChanged {
            now_playing: self.now_playing.clone(),
            queue_position: self.queue.position_i64(),
            timestamp: chrono::Utc::now(),
        });
    }
}
