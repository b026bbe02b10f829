//! Engine task tests
//!
//! Drive the engine through its command handle so slot events and fade
//! timers are delivered by the task's own select loop.

mod helpers;

use helpers::{ids, Harness, ScriptedPlayers};
use segue_common::events::{EnqueueMode, PlaybackState, TrackId};
use segue_player::playback::services::{keys, SettingsStore};
use segue_player::playback::types::SlotId;
use segue_player::playback::{spawn_engine, EngineHandle};
use segue_player::db::MemorySettings;
use segue_player::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

type Running = (EngineHandle, JoinHandle<()>, ScriptedPlayers, Arc<MemorySettings>);

/// Split a harness: the engine goes to its task, the probes stay with the test
async fn running(tracks: &[i64]) -> Running {
    let Harness {
        engine,
        slot_events,
        players,
        settings,
        ..
    } = Harness::new(tracks).await;
    let (handle, task) = spawn_engine(engine, slot_events);
    (handle, task, players, settings)
}

/// Poll `check` until it holds or a few seconds have passed
async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..500 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test]
async fn test_commands_round_trip_through_task() {
    let (handle, _task, _players, _settings) = running(&[1, 2, 3]).await;

    handle.load(ids(&[1, 2, 3]), 1).await.unwrap();
    let status = handle.status().await.unwrap();
    assert_eq!(status.position, 1);
    assert!(status.playing);
    assert_eq!(status.state, PlaybackState::Playing);
    assert_eq!(status.queue_length, 3);

    handle.enqueue(ids(&[9]), EnqueueMode::Last).await.unwrap();
    let queue = handle.queue().await.unwrap();
    assert_eq!(queue.tracks, ids(&[1, 2, 3, 9]));
    assert_eq!(queue.position, 1);

    assert_eq!(handle.seek(2_500).await.unwrap(), 2_500);
    assert_eq!(handle.remove_track(TrackId(9)).await.unwrap(), 1);
}

#[tokio::test]
async fn test_errors_reach_the_caller() {
    let (handle, _task, _players, _settings) = running(&[1]).await;

    let result = handle.load(ids(&[1]), 3).await;
    assert!(matches!(result, Err(Error::BadRequest(_))));

    // The task keeps serving after a failed command
    assert_eq!(handle.status().await.unwrap().position, -1);
}

#[tokio::test]
async fn test_track_end_is_handled_by_task() {
    let (handle, _task, players, _settings) = running(&[1, 2, 3]).await;
    handle.load(ids(&[1, 2, 3]), 0).await.unwrap();

    players.end_track(SlotId::A);

    let h = &handle;
    let advanced = eventually(|| async move { h.status().await.unwrap().position == 1 }).await;
    assert!(advanced);
    let status = handle.status().await.unwrap();
    assert_eq!(status.now_playing.and_then(|n| n.track_id), Some(TrackId(2)));
    assert!(status.playing);
}

#[tokio::test]
async fn test_fade_in_driven_by_task_timers() {
    let (handle, _task, players, _settings) = running(&[1]).await;
    handle.set_fade(1, false).await.unwrap();

    handle.load(ids(&[1]), 0).await.unwrap();
    assert!(players.probe(SlotId::A).volume < 1.0);

    let p = &players;
    let faded_in = eventually(|| async move { p.probe(SlotId::A).volume >= 1.0 }).await;
    assert!(faded_in);
}

#[tokio::test]
async fn test_shutdown_saves_and_releases() {
    let (handle, task, players, settings) = running(&[1, 2]).await;
    handle.load(ids(&[1, 2]), 1).await.unwrap();
    handle.pause().await.unwrap();

    handle.shutdown().await.unwrap();
    task.await.unwrap();

    assert!(matches!(handle.status().await, Err(Error::EngineStopped)));
    assert!(matches!(handle.play().await, Err(Error::EngineStopped)));
    assert!(players.probe(SlotId::A).released);
    assert!(players.probe(SlotId::B).released);
    assert_eq!(
        settings.get_string(keys::QUEUE).await.unwrap().as_deref(),
        Some("1;2;")
    );
    assert_eq!(settings.get_int(keys::CURRENT_POSITION).await.unwrap(), Some(1));
}

#[tokio::test]
async fn test_dropping_every_handle_stops_task() {
    let (handle, task, players, _settings) = running(&[1]).await;
    let second = handle.clone();
    handle.load(ids(&[1]), 0).await.unwrap();

    drop(handle);
    drop(second);

    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("engine task did not exit")
        .unwrap();
    assert!(players.probe(SlotId::A).released);
}
