//! Engine task and command handle
//!
//! Exactly one task owns the [`PlaybackEngine`]. It serialises user
//! commands, slot notifications and fade timers through a single
//! `tokio::select!` loop, so no two engine operations ever interleave and a
//! track ending can never race a user pressing "next".
//!
//! Everything else talks to the engine through a cloneable [`EngineHandle`].

use crate::error::{Error, Result};
use crate::playback::engine::{EngineStatus, PlaybackEngine, QueueSnapshot};
use crate::playback::slot::SlotEvent;
use segue_common::events::{EnqueueMode, FocusChange, RepeatMode, TrackId};
use std::future::Future;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, trace};

const COMMAND_CHANNEL_CAPACITY: usize = 64;

type Responder<T> = oneshot::Sender<Result<T>>;

/// Requests accepted by the engine task
#[derive(Debug)]
pub enum EngineCommand {
    Play(Responder<()>),
    Pause(Responder<()>),
    TogglePause(Responder<()>),
    Stop(Responder<()>),
    Next(Responder<()>),
    Previous(Responder<()>),
    PreviousOrRestart(Responder<()>),
    Seek(i64, Responder<i64>),
    SetRepeatMode(RepeatMode, Responder<()>),
    Enqueue {
        ids: Vec<TrackId>,
        mode: EnqueueMode,
        respond: Responder<()>,
    },
    Load {
        ids: Vec<TrackId>,
        position: i64,
        respond: Responder<()>,
    },
    RemoveTracks {
        first: usize,
        last: usize,
        respond: Responder<usize>,
    },
    RemoveTrack(TrackId, Responder<usize>),
    MoveQueueItem {
        from: usize,
        to: usize,
        respond: Responder<()>,
    },
    Shuffle(Responder<()>),
    Uniqueify(Responder<usize>),
    Interleave {
        ids: Vec<TrackId>,
        current_count: usize,
        new_count: usize,
        respond: Responder<()>,
    },
    FocusChanged(FocusChange, Responder<()>),
    StorageEjected(Responder<()>),
    StorageMounted(Responder<()>),
    SetFade {
        fade_seconds: i64,
        crossfade_enabled: bool,
        respond: Responder<()>,
    },
    Status(Responder<EngineStatus>),
    Queue(Responder<QueueSnapshot>),
    Shutdown(Responder<()>),
}

/// Cloneable handle to the engine task
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineCommand>,
}

impl EngineHandle {
    async fn request<T>(&self, make: impl FnOnce(Responder<T>) -> EngineCommand) -> Result<T> {
        let (respond, response) = oneshot::channel();
        self.tx
            .send(make(respond))
            .await
            .map_err(|_| Error::EngineStopped)?;
        response.await.map_err(|_| Error::EngineStopped)?
    }

    pub async fn play(&self) -> Result<()> {
        self.request(EngineCommand::Play).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.request(EngineCommand::Pause).await
    }

    pub async fn toggle_pause(&self) -> Result<()> {
        self.request(EngineCommand::TogglePause).await
    }

    pub async fn stop(&self) -> Result<()> {
        self.request(EngineCommand::Stop).await
    }

    pub async fn next(&self) -> Result<()> {
        self.request(EngineCommand::Next).await
    }

    pub async fn previous(&self) -> Result<()> {
        self.request(EngineCommand::Previous).await
    }

    pub async fn previous_or_restart(&self) -> Result<()> {
        self.request(EngineCommand::PreviousOrRestart).await
    }

    pub async fn seek(&self, position_ms: i64) -> Result<i64> {
        self.request(|r| EngineCommand::Seek(position_ms, r)).await
    }

    pub async fn set_repeat_mode(&self, mode: RepeatMode) -> Result<()> {
        self.request(|r| EngineCommand::SetRepeatMode(mode, r)).await
    }

    pub async fn enqueue(&self, ids: Vec<TrackId>, mode: EnqueueMode) -> Result<()> {
        self.request(|respond| EngineCommand::Enqueue { ids, mode, respond })
            .await
    }

    pub async fn load(&self, ids: Vec<TrackId>, position: i64) -> Result<()> {
        self.request(|respond| EngineCommand::Load {
            ids,
            position,
            respond,
        })
        .await
    }

    pub async fn remove_tracks(&self, first: usize, last: usize) -> Result<usize> {
        self.request(|respond| EngineCommand::RemoveTracks {
            first,
            last,
            respond,
        })
        .await
    }

    pub async fn remove_track(&self, id: TrackId) -> Result<usize> {
        self.request(|r| EngineCommand::RemoveTrack(id, r)).await
    }

    pub async fn move_queue_item(&self, from: usize, to: usize) -> Result<()> {
        self.request(|respond| EngineCommand::MoveQueueItem { from, to, respond })
            .await
    }

    pub async fn shuffle(&self) -> Result<()> {
        self.request(EngineCommand::Shuffle).await
    }

    pub async fn uniqueify(&self) -> Result<usize> {
        self.request(EngineCommand::Uniqueify).await
    }

    pub async fn interleave(
        &self,
        ids: Vec<TrackId>,
        current_count: usize,
        new_count: usize,
    ) -> Result<()> {
        self.request(|respond| EngineCommand::Interleave {
            ids,
            current_count,
            new_count,
            respond,
        })
        .await
    }

    pub async fn focus_changed(&self, change: FocusChange) -> Result<()> {
        self.request(|r| EngineCommand::FocusChanged(change, r)).await
    }

    pub async fn storage_ejected(&self) -> Result<()> {
        self.request(EngineCommand::StorageEjected).await
    }

    pub async fn storage_mounted(&self) -> Result<()> {
        self.request(EngineCommand::StorageMounted).await
    }

    pub async fn set_fade(&self, fade_seconds: i64, crossfade_enabled: bool) -> Result<()> {
        self.request(|respond| EngineCommand::SetFade {
            fade_seconds,
            crossfade_enabled,
            respond,
        })
        .await
    }

    pub async fn status(&self) -> Result<EngineStatus> {
        self.request(EngineCommand::Status).await
    }

    pub async fn queue(&self) -> Result<QueueSnapshot> {
        self.request(EngineCommand::Queue).await
    }

    /// Ask the engine task to persist state, release its slots and exit
    pub async fn shutdown(&self) -> Result<()> {
        self.request(EngineCommand::Shutdown).await
    }
}

/// Spawn the engine task. The engine should already be started.
pub fn spawn_engine(
    engine: PlaybackEngine,
    slot_events: mpsc::UnboundedReceiver<SlotEvent>,
) -> (EngineHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
    let task = tokio::spawn(run_engine(engine, rx, slot_events));
    (EngineHandle { tx }, task)
}

async fn run_engine(
    mut engine: PlaybackEngine,
    mut commands: mpsc::Receiver<EngineCommand>,
    mut slot_events: mpsc::UnboundedReceiver<SlotEvent>,
) {
    info!("Engine task started");

    loop {
        let deadline = engine.next_deadline();

        tokio::select! {
            biased;

            // Slot notifications first, so a finished track is handled
            // before any command queued behind it
            Some(event) = slot_events.recv() => {
                trace!("Slot event: {:?}", event);
                engine.on_slot_event(event).await;
            }

            command = commands.recv() => {
                let Some(command) = command else {
                    debug!("All engine handles dropped");
                    engine.shutdown().await;
                    break;
                };
                if !dispatch(&mut engine, command).await {
                    break;
                }
            }

            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                engine.fire_due_timers(Instant::now()).await;
            }
        }
    }

    info!("Engine task exited");
}

async fn reply<T, F>(respond: Responder<T>, operation: F)
where
    F: Future<Output = Result<T>>,
{
    // Caller may have given up waiting
    let _ = respond.send(operation.await);
}

/// Run one command. Returns `false` when the loop should exit.
async fn dispatch(engine: &mut PlaybackEngine, command: EngineCommand) -> bool {
    trace!("Engine command: {:?}", command);
    match command {
        EngineCommand::Play(r) => reply(r, engine.play()).await,
        EngineCommand::Pause(r) => reply(r, engine.pause()).await,
        EngineCommand::TogglePause(r) => reply(r, engine.toggle_pause()).await,
        EngineCommand::Stop(r) => reply(r, engine.stop()).await,
        EngineCommand::Next(r) => reply(r, engine.next()).await,
        EngineCommand::Previous(r) => reply(r, engine.previous()).await,
        EngineCommand::PreviousOrRestart(r) => reply(r, engine.previous_or_restart()).await,
        EngineCommand::Seek(ms, r) => reply(r, engine.seek(ms)).await,
        EngineCommand::SetRepeatMode(mode, r) => reply(r, engine.set_repeat_mode(mode)).await,
        EngineCommand::Enqueue { ids, mode, respond } => {
            reply(respond, engine.enqueue(&ids, mode)).await
        }
        EngineCommand::Load {
            ids,
            position,
            respond,
        } => reply(respond, engine.load(&ids, position)).await,
        EngineCommand::RemoveTracks {
            first,
            last,
            respond,
        } => reply(respond, engine.remove_tracks(first, last)).await,
        EngineCommand::RemoveTrack(id, r) => reply(r, engine.remove_track(id)).await,
        EngineCommand::MoveQueueItem { from, to, respond } => {
            reply(respond, engine.move_queue_item(from, to)).await
        }
        EngineCommand::Shuffle(r) => reply(r, engine.shuffle()).await,
        EngineCommand::Uniqueify(r) => reply(r, engine.uniqueify()).await,
        EngineCommand::Interleave {
            ids,
            current_count,
            new_count,
            respond,
        } => reply(respond, engine.interleave(&ids, current_count, new_count)).await,
        EngineCommand::FocusChanged(change, r) => reply(r, engine.on_focus_change(change)).await,
        EngineCommand::StorageEjected(r) => reply(r, engine.on_storage_ejected()).await,
        EngineCommand::StorageMounted(r) => reply(r, engine.on_storage_mounted()).await,
        EngineCommand::SetFade {
            fade_seconds,
            crossfade_enabled,
            respond,
        } => reply(respond, engine.set_fade(fade_seconds, crossfade_enabled)).await,
        EngineCommand::Status(r) => {
            let _ = r.send(Ok(engine.status()));
        }
        EngineCommand::Queue(r) => {
            let _ = r.send(Ok(engine.queue_snapshot()));
        }
        EngineCommand::Shutdown(r) => {
            engine.shutdown().await;
            let _ = r.send(Ok(()));
            return false;
        }
    }
    true
}
