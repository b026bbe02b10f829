//! Test helpers for segue-player integration tests
//!
//! Provides reusable test infrastructure:
//! - ScriptedPlayers: player factory whose resources tests can inspect and
//!   drive (end a track, kill a resource, fail a prepare)
//! - MemoryCatalog: in-memory catalog with optional lookup delays
//! - RecordingPresenter: collects every published event
//! - Harness: an engine wired to all of the above

#![allow(dead_code)]

use async_trait::async_trait;
use segue_common::events::{PlayerEvent, TrackId};
use segue_player::db::MemorySettings;
use segue_player::error::{Error, Result};
use segue_player::playback::fader::FadeKind;
use segue_player::playback::services::{
    Catalog, Genre, LocalFocusArbiter, Presenter, TrackMetadata,
};
use segue_player::playback::slot::{PlayerFactory, PlayerResource, SlotEvent, SlotEventSink};
use segue_player::playback::types::{EngineConfig, SlotId, TrackSource};
use segue_player::playback::{EngineServices, PlaybackEngine};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub const TRACK_DURATION_MS: i64 = 180_000;

pub fn ids(raw: &[i64]) -> Vec<TrackId> {
    raw.iter().copied().map(TrackId).collect()
}

/// Engine timings shortened for tests
pub fn test_config() -> EngineConfig {
    EngineConfig {
        fade_tick: Duration::from_millis(10),
        resource_died_delay: Duration::from_millis(50),
        reload_retry_delay: Duration::from_millis(20),
    }
}

// ============================================================================
// Scripted player resources
// ============================================================================

/// Observable state of one scripted player
#[derive(Debug, Clone, Default)]
pub struct PlayerProbe {
    pub track: Option<TrackId>,
    pub prepared: bool,
    pub playing: bool,
    pub position_ms: i64,
    pub duration_ms: i64,
    pub volume: f32,
    pub released: bool,
}

#[derive(Default)]
struct Rig {
    players: HashMap<SlotId, PlayerProbe>,
    sinks: HashMap<SlotId, SlotEventSink>,
    failing: HashSet<TrackId>,
    created: usize,
}

/// Factory for scripted players sharing one inspectable rig
#[derive(Clone, Default)]
pub struct ScriptedPlayers {
    rig: Arc<Mutex<Rig>>,
}

impl ScriptedPlayers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every prepare of `id` fail
    pub fn fail_track(&self, id: i64) {
        self.rig.lock().unwrap().failing.insert(TrackId(id));
    }

    pub fn heal_track(&self, id: i64) {
        self.rig.lock().unwrap().failing.remove(&TrackId(id));
    }

    pub fn probe(&self, slot: SlotId) -> PlayerProbe {
        self.rig
            .lock()
            .unwrap()
            .players
            .get(&slot)
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_position(&self, slot: SlotId, position_ms: i64) {
        if let Some(player) = self.rig.lock().unwrap().players.get_mut(&slot) {
            player.position_ms = position_ms;
        }
    }

    /// Report the end of the track on `slot`, as the platform would
    pub fn end_track(&self, slot: SlotId) {
        let sink = self.rig.lock().unwrap().sinks.get(&slot).cloned();
        if let Some(sink) = sink {
            sink.track_ended();
        }
    }

    /// Report the death of the resource behind `slot`
    pub fn kill(&self, slot: SlotId) {
        let sink = self.rig.lock().unwrap().sinks.get(&slot).cloned();
        if let Some(sink) = sink {
            sink.resource_died();
        }
    }

    pub fn created(&self) -> usize {
        self.rig.lock().unwrap().created
    }
}

impl PlayerFactory for ScriptedPlayers {
    fn create(&self, events: SlotEventSink) -> Box<dyn PlayerResource> {
        let slot = events.slot();
        let mut rig = self.rig.lock().unwrap();
        rig.created += 1;
        rig.players.insert(
            slot,
            PlayerProbe {
                volume: 1.0,
                ..Default::default()
            },
        );
        rig.sinks.insert(slot, events);
        Box::new(ScriptedPlayer {
            slot,
            rig: Arc::clone(&self.rig),
        })
    }
}

struct ScriptedPlayer {
    slot: SlotId,
    rig: Arc<Mutex<Rig>>,
}

impl ScriptedPlayer {
    fn with<T>(&self, f: impl FnOnce(&mut PlayerProbe) -> T) -> T {
        let mut rig = self.rig.lock().unwrap();
        let probe = rig.players.entry(self.slot).or_default();
        f(probe)
    }
}

impl PlayerResource for ScriptedPlayer {
    fn reset(&mut self) {
        self.with(|p| {
            p.track = None;
            p.prepared = false;
            p.playing = false;
            p.position_ms = 0;
        });
    }

    fn set_source(&mut self, source: &TrackSource) -> Result<()> {
        let duration = source.duration_ms.unwrap_or(TRACK_DURATION_MS);
        self.with(|p| {
            p.track = Some(source.track_id);
            p.duration_ms = duration;
        });
        Ok(())
    }

    fn prepare(&mut self) -> Result<()> {
        let mut rig = self.rig.lock().unwrap();
        let track = rig.players.get(&self.slot).and_then(|p| p.track);
        if let Some(id) = track {
            if rig.failing.contains(&id) {
                return Err(Error::Io(std::io::Error::other("corrupt stream")));
            }
        }
        if let Some(p) = rig.players.get_mut(&self.slot) {
            p.prepared = true;
        }
        Ok(())
    }

    fn start(&mut self) {
        self.with(|p| p.playing = true);
    }

    fn pause(&mut self) {
        self.with(|p| p.playing = false);
    }

    fn stop(&mut self) {
        self.with(|p| p.playing = false);
    }

    fn release(&mut self) {
        self.with(|p| {
            p.playing = false;
            p.released = true;
        });
    }

    fn is_playing(&self) -> bool {
        self.with(|p| p.playing)
    }

    fn duration_ms(&self) -> i64 {
        self.with(|p| p.duration_ms)
    }

    fn position_ms(&self) -> i64 {
        self.with(|p| p.position_ms)
    }

    fn seek_to(&mut self, position_ms: i64) {
        self.with(|p| p.position_ms = position_ms);
    }

    fn set_volume(&mut self, left: f32, _right: f32) {
        self.with(|p| p.volume = left);
    }
}

// ============================================================================
// Catalog
// ============================================================================

#[derive(Default)]
pub struct MemoryCatalog {
    tracks: Mutex<HashMap<TrackId, TrackMetadata>>,
    genres: Mutex<HashMap<TrackId, Genre>>,
    /// Remaining source lookups that report the track as unknown
    hidden: Mutex<HashMap<TrackId, u32>>,
    volume: AtomicI64,
}

impl MemoryCatalog {
    pub fn with_tracks(raw: &[i64]) -> Self {
        let catalog = Self::default();
        for &id in raw {
            catalog.add_track(id);
        }
        catalog
    }

    pub fn add_track(&self, id: i64) {
        self.tracks.lock().unwrap().insert(
            TrackId(id),
            TrackMetadata {
                title: Some(format!("Track {}", id)),
                artist: Some("Test Artist".to_string()),
                artist_id: Some(1),
                album: Some("Test Album".to_string()),
                album_id: Some(2),
                mime_type: Some("audio/mpeg".to_string()),
                folder_path: Some("/virtual".to_string()),
            },
        );
    }

    pub fn remove_track(&self, id: i64) {
        self.tracks.lock().unwrap().remove(&TrackId(id));
    }

    pub fn set_genre(&self, id: i64, genre_id: i64, name: &str) {
        self.genres.lock().unwrap().insert(
            TrackId(id),
            Genre {
                id: genre_id,
                name: name.to_string(),
            },
        );
    }

    /// Report `id` as unknown for the next `lookups` source queries
    pub fn hide_for(&self, id: i64, lookups: u32) {
        self.hidden.lock().unwrap().insert(TrackId(id), lookups);
    }

    pub fn set_volume_id(&self, volume: i64) {
        self.volume.store(volume, Ordering::SeqCst);
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn track_metadata(&self, id: TrackId) -> Result<Option<TrackMetadata>> {
        Ok(self.tracks.lock().unwrap().get(&id).cloned())
    }

    async fn genre_for_track(&self, id: TrackId) -> Result<Option<Genre>> {
        Ok(self.genres.lock().unwrap().get(&id).cloned())
    }

    async fn track_source(&self, id: TrackId) -> Result<Option<TrackSource>> {
        {
            let mut hidden = self.hidden.lock().unwrap();
            if let Some(remaining) = hidden.get_mut(&id) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Ok(None);
                }
            }
        }
        if !self.tracks.lock().unwrap().contains_key(&id) {
            return Ok(None);
        }
        Ok(Some(TrackSource {
            track_id: id,
            path: PathBuf::from(format!("/virtual/{}.mp3", id)),
            duration_ms: Some(TRACK_DURATION_MS),
        }))
    }

    async fn volume_id(&self) -> Result<i64> {
        Ok(self.volume.load(Ordering::SeqCst))
    }
}

// ============================================================================
// Presenter
// ============================================================================

#[derive(Default)]
pub struct RecordingPresenter {
    events: Mutex<Vec<PlayerEvent>>,
}

impl RecordingPresenter {
    pub fn events(&self) -> Vec<PlayerEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    pub fn count(&self, event_type: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.event_type() == event_type)
            .count()
    }

    pub fn last(&self, event_type: &str) -> Option<PlayerEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|e| e.event_type() == event_type)
            .cloned()
    }
}

impl Presenter for RecordingPresenter {
    fn publish(&self, event: PlayerEvent) {
        self.events.lock().unwrap().push(event);
    }
}

// ============================================================================
// Engine harness
// ============================================================================

/// An engine plus handles on every collaborator, driven directly by the test
pub struct Harness {
    pub engine: PlaybackEngine,
    pub slot_events: mpsc::UnboundedReceiver<SlotEvent>,
    pub players: ScriptedPlayers,
    pub catalog: Arc<MemoryCatalog>,
    pub settings: Arc<MemorySettings>,
    pub focus: Arc<LocalFocusArbiter>,
    pub presenter: Arc<RecordingPresenter>,
}

impl Harness {
    /// Started engine over a catalog holding `tracks`
    pub async fn new(tracks: &[i64]) -> Self {
        Self::build(
            Arc::new(MemoryCatalog::with_tracks(tracks)),
            Arc::new(MemorySettings::new()),
        )
        .await
    }

    /// Started engine over existing collaborators (for restart scenarios)
    pub async fn build(catalog: Arc<MemoryCatalog>, settings: Arc<MemorySettings>) -> Self {
        let players = ScriptedPlayers::new();
        let focus = Arc::new(LocalFocusArbiter::new());
        let presenter = Arc::new(RecordingPresenter::default());

        let services = EngineServices {
            catalog: catalog.clone(),
            settings: settings.clone(),
            focus: focus.clone(),
            presenter: presenter.clone(),
            players: Arc::new(players.clone()),
        };
        let (mut engine, slot_events) = PlaybackEngine::new(services, test_config());
        engine.start().await.unwrap();

        Self {
            engine,
            slot_events,
            players,
            catalog,
            settings,
            focus,
            presenter,
        }
    }

    /// Deliver every queued slot event to the engine
    pub async fn pump(&mut self) {
        while let Ok(event) = self.slot_events.try_recv() {
            self.engine.on_slot_event(event).await;
        }
    }

    /// End the track on the current slot and let the engine react
    pub async fn end_current_track(&mut self) {
        let slot = self.engine.current_slot().id();
        self.players.end_track(slot);
        self.pump().await;
    }

    /// Fire the pending `kind` timer once (plus anything due before it)
    pub async fn fire(&mut self, kind: FadeKind) {
        if let Some(deadline) = self.engine.fades().deadline(kind) {
            self.engine.fire_due_timers(deadline).await;
        }
    }

    /// Fire `kind` until it stops rescheduling itself. Returns the tick count.
    pub async fn drain_timer(&mut self, kind: FadeKind) -> usize {
        let mut ticks = 0;
        while let Some(deadline) = self.engine.fades().deadline(kind) {
            self.engine.fire_due_timers(deadline).await;
            ticks += 1;
            assert!(ticks < 10_000, "{:?} never settled", kind);
        }
        ticks
    }

    pub fn current_track(&self) -> Option<TrackId> {
        self.engine.current_slot().track()
    }

    pub fn position(&self) -> i64 {
        self.engine.queue().position_i64()
    }

    pub fn queue(&self) -> Vec<TrackId> {
        self.engine.queue().as_slice().to_vec()
    }
}
