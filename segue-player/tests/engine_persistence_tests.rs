//! Queue persistence tests
//!
//! Saves go through the settings store; a restart is simulated by building
//! a second engine over the same catalog and settings.

mod helpers;

use helpers::{ids, Harness, TRACK_DURATION_MS};
use segue_common::events::{
    EnqueueMode, PlaybackState, PlayerEvent, QueueChangeTrigger, RepeatMode, TrackId,
};
use segue_player::playback::services::{keys, SettingsStore};

async fn restart(h: &Harness) -> Harness {
    Harness::build(h.catalog.clone(), h.settings.clone()).await
}

async fn saved_queue(h: &Harness) -> Option<String> {
    h.settings.get_string(keys::QUEUE).await.unwrap()
}

#[tokio::test]
async fn test_fresh_start_has_empty_queue() {
    let h = Harness::new(&[1, 2]).await;

    assert!(h.queue().is_empty());
    assert_eq!(h.position(), -1);
    assert_eq!(h.engine.state(), PlaybackState::Idle);
    assert!(matches!(
        h.presenter.last("QueueChanged"),
        Some(PlayerEvent::QueueChanged { trigger: QueueChangeTrigger::Reload, .. })
    ));
}

#[tokio::test]
async fn test_full_save_writes_every_key() {
    let mut h = Harness::new(&[1, 2, 18]).await;

    h.engine.load(&ids(&[1, 2, 18]), 1).await.unwrap();

    assert_eq!(saved_queue(&h).await.as_deref(), Some("1;2;21;"));
    assert_eq!(h.settings.get_long(keys::CARD_ID).await.unwrap(), Some(0));
    assert_eq!(h.settings.get_int(keys::CURRENT_POSITION).await.unwrap(), Some(1));
    assert_eq!(h.settings.get_long(keys::SEEK_POSITION).await.unwrap(), Some(0));
    assert_eq!(h.settings.get_int(keys::REPEAT_MODE).await.unwrap(), Some(0));
}

#[tokio::test]
async fn test_partial_save_leaves_queue_alone() {
    let mut h = Harness::new(&[1, 2]).await;
    h.engine.load(&ids(&[1, 2]), 0).await.unwrap();
    h.settings.put_string(keys::QUEUE, "9;").await.unwrap();

    h.engine.seek(1_000).await.unwrap();
    h.engine.set_repeat_mode(RepeatMode::Current).await.unwrap();

    assert_eq!(saved_queue(&h).await.as_deref(), Some("9;"));
    assert_eq!(h.settings.get_long(keys::SEEK_POSITION).await.unwrap(), Some(1_000));
    assert_eq!(h.settings.get_int(keys::REPEAT_MODE).await.unwrap(), Some(1));
}

#[tokio::test]
async fn test_restart_restores_queue_paused() {
    let mut h = Harness::new(&[1, 2, 3]).await;
    h.engine.load(&ids(&[1, 2, 3]), 2).await.unwrap();
    h.engine.set_repeat_mode(RepeatMode::All).await.unwrap();
    h.engine.seek(42_000).await.unwrap();

    let restored = restart(&h).await;

    assert_eq!(restored.queue(), ids(&[1, 2, 3]));
    assert_eq!(restored.position(), 2);
    assert_eq!(restored.current_track(), Some(TrackId(3)));
    assert_eq!(restored.engine.status().seek_ms, 42_000);
    assert_eq!(restored.engine.repeat_mode(), RepeatMode::All);
    assert_eq!(restored.engine.state(), PlaybackState::Paused);
    assert!(!restored.engine.is_supposed_to_be_playing());
    assert!(!restored.engine.current_slot().is_playing());
    assert_eq!(restored.presenter.count("PlaybackFailed"), 0);
    assert_eq!(
        restored.engine.now_playing().and_then(|n| n.track_id),
        Some(TrackId(3))
    );
}

#[tokio::test]
async fn test_stop_after_is_not_restored() {
    let mut h = Harness::new(&[1]).await;
    h.engine.load(&ids(&[1]), 0).await.unwrap();
    h.engine.set_repeat_mode(RepeatMode::StopAfter).await.unwrap();

    let restored = restart(&h).await;

    assert_eq!(restored.engine.repeat_mode(), RepeatMode::None);
    assert_eq!(restored.queue(), ids(&[1]));
}

#[tokio::test]
async fn test_volume_mismatch_discards_queue() {
    let mut h = Harness::new(&[1, 2]).await;
    h.engine.load(&ids(&[1, 2]), 0).await.unwrap();
    h.engine.seek(5_000).await.unwrap();
    h.catalog.set_volume_id(7);

    let restored = restart(&h).await;

    assert!(restored.queue().is_empty());
    assert_eq!(restored.position(), -1);
    assert_eq!(restored.engine.state(), PlaybackState::Idle);
    assert!(restored.engine.now_playing().is_none());
    assert_eq!(h.settings.get_long(keys::SEEK_POSITION).await.unwrap(), None);
}

#[tokio::test]
async fn test_malformed_queue_discarded() {
    let h = Harness::new(&[1, 2]).await;
    h.settings.put_long(keys::CARD_ID, 0).await.unwrap();
    h.settings.put_string(keys::QUEUE, "zz;").await.unwrap();
    h.settings.put_int(keys::CURRENT_POSITION, 0).await.unwrap();

    let restored = restart(&h).await;

    assert!(restored.queue().is_empty());
    assert_eq!(restored.position(), -1);
}

#[tokio::test]
async fn test_out_of_range_position_discards_queue() {
    let h = Harness::new(&[1, 2]).await;
    h.settings.put_long(keys::CARD_ID, 0).await.unwrap();
    h.settings.put_string(keys::QUEUE, "1;2;").await.unwrap();
    h.settings.put_int(keys::CURRENT_POSITION, 5).await.unwrap();

    let restored = restart(&h).await;

    assert!(restored.queue().is_empty());
    assert_eq!(restored.position(), -1);
}

#[tokio::test]
async fn test_catalog_catching_up_is_retried() {
    let mut h = Harness::new(&[1, 2, 3]).await;
    h.engine.load(&ids(&[1, 2, 3]), 1).await.unwrap();
    h.catalog.hide_for(2, 1);

    let restored = restart(&h).await;

    assert_eq!(restored.queue(), ids(&[1, 2, 3]));
    assert_eq!(restored.position(), 1);
    assert_eq!(restored.current_track(), Some(TrackId(2)));
}

#[tokio::test]
async fn test_catalog_still_missing_discards_queue() {
    let mut h = Harness::new(&[1, 2, 3]).await;
    h.engine.load(&ids(&[1, 2, 3]), 1).await.unwrap();
    h.catalog.hide_for(2, 5);

    let restored = restart(&h).await;

    assert!(restored.queue().is_empty());
    assert_eq!(restored.engine.state(), PlaybackState::Idle);
}

#[tokio::test]
async fn test_out_of_range_seek_restores_at_start() {
    let mut h = Harness::new(&[1, 2]).await;
    h.engine.load(&ids(&[1, 2]), 0).await.unwrap();

    h.settings
        .put_long(keys::SEEK_POSITION, TRACK_DURATION_MS + 1)
        .await
        .unwrap();
    let restored = restart(&h).await;
    assert_eq!(restored.queue(), ids(&[1, 2]));
    assert_eq!(restored.engine.status().seek_ms, 0);

    h.settings.put_long(keys::SEEK_POSITION, -30).await.unwrap();
    let restored = restart(&h).await;
    assert_eq!(restored.engine.status().seek_ms, 0);
}

#[tokio::test]
async fn test_storage_eject_and_mount() {
    let mut h = Harness::new(&[1, 2, 3]).await;
    h.engine.load(&ids(&[1, 2]), 1).await.unwrap();

    h.engine.on_storage_ejected().await.unwrap();

    assert!(!h.engine.is_saveable());
    assert_eq!(h.engine.state(), PlaybackState::Idle);
    assert!(!h.engine.is_supposed_to_be_playing());
    assert!(h.engine.now_playing().is_none());
    assert!(matches!(
        h.presenter.last("QueueChanged"),
        Some(PlayerEvent::QueueChanged { trigger: QueueChangeTrigger::StorageEjected, .. })
    ));

    // Mutations while ejected are not persisted
    h.engine.enqueue(&ids(&[3]), EnqueueMode::Last).await.unwrap();
    assert_eq!(saved_queue(&h).await.as_deref(), Some("1;2;"));

    h.engine.on_storage_mounted().await.unwrap();

    assert!(h.engine.is_saveable());
    assert_eq!(h.queue(), ids(&[1, 2]));
    assert_eq!(h.position(), 1);
    assert_eq!(h.current_track(), Some(TrackId(2)));
    assert_eq!(h.engine.state(), PlaybackState::Paused);
    assert!(matches!(
        h.presenter.last("QueueChanged"),
        Some(PlayerEvent::QueueChanged { trigger: QueueChangeTrigger::Reload, .. })
    ));
}

#[tokio::test]
async fn test_mount_of_other_volume_clears_queue() {
    let mut h = Harness::new(&[1, 2]).await;
    h.engine.load(&ids(&[1, 2]), 0).await.unwrap();
    h.engine.on_storage_ejected().await.unwrap();

    h.catalog.set_volume_id(3);
    h.engine.on_storage_mounted().await.unwrap();

    assert!(h.queue().is_empty());
    assert_eq!(h.position(), -1);
    assert!(h.engine.is_saveable());
}

#[tokio::test]
async fn test_fade_settings_survive_restart() {
    let mut h = Harness::new(&[1]).await;
    h.engine.set_fade(4, true).await.unwrap();

    let restored = restart(&h).await;
    let status = restored.engine.status();

    assert_eq!(status.fade_seconds, 4);
    assert!(status.crossfade_enabled);
}
