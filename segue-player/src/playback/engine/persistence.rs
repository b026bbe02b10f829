//! Queue state persistence
//!
//! **Responsibilities:**
//! - Full saves (queue contents + volume id + position/seek/repeat mode)
//!   and partial saves (position/seek/repeat mode only)
//! - Restoring the saved queue at startup and after storage remount
//! - Storage eject / mount handling
//! - Fade settings
//!
//! Restoring fails closed: anything inconsistent discards the whole queue.

use super::{OpenMode, PlaybackEngine};
use crate::error::Result;
use crate::playback::queue::Queue;
use crate::playback::services::keys;
use segue_common::events::{PlaybackState, QueueChangeTrigger, RepeatMode};
use segue_common::time::format_millis;
use tracing::{debug, info, warn};

impl PlaybackEngine {
    /// Persist queue state unless saving is suspended
    pub(super) async fn save_queue(&self, full: bool) {
        if !self.saveable {
            debug!("Queue not saveable, skipping save");
            return;
        }
        if let Err(e) = self.write_queue_state(full).await {
            warn!("Failed to save queue state: {}", e);
        }
    }

    async fn write_queue_state(&self, full: bool) -> Result<()> {
        let settings = &self.settings;
        if full {
            settings.put_string(keys::QUEUE, &self.queue.encode()).await?;
            settings.put_long(keys::CARD_ID, self.volume_id).await?;
        }
        settings
            .put_int(keys::CURRENT_POSITION, self.queue.position_i64() as i32)
            .await?;
        if self.cur().is_initialized() {
            settings
                .put_long(keys::SEEK_POSITION, self.cur().position())
                .await?;
        }
        settings
            .put_int(keys::REPEAT_MODE, self.repeat_mode.to_persisted())
            .await?;
        Ok(())
    }

    /// Restore the saved queue. Failures leave an empty queue.
    pub(super) async fn reload_queue(&mut self) {
        match self.try_reload_queue().await {
            Ok(true) => info!(
                "Restored {} queued tracks at position {}",
                self.queue.len(),
                self.queue.position_i64()
            ),
            Ok(false) => self.discard_restored_queue().await,
            Err(e) => {
                warn!("Restoring saved queue failed: {}", e);
                self.discard_restored_queue().await;
            }
        }
    }

    async fn try_reload_queue(&mut self) -> Result<bool> {
        let saved_volume = self.settings.get_long(keys::CARD_ID).await?;
        if saved_volume != Some(self.volume_id) {
            debug!(
                "Saved queue belongs to volume {:?}, current volume is {}",
                saved_volume, self.volume_id
            );
            return Ok(false);
        }

        let ids = match self.settings.get_string(keys::QUEUE).await? {
            Some(encoded) => Queue::decode(&encoded),
            None => Vec::new(),
        };
        if ids.is_empty() {
            return Ok(false);
        }

        let position = self.settings.get_int(keys::CURRENT_POSITION).await?.unwrap_or(0);
        if position < 0 || position as usize >= ids.len() {
            warn!(
                "Saved position {} out of range for {} tracks, discarding queue",
                position,
                ids.len()
            );
            return Ok(false);
        }

        self.queue.restore(ids);
        self.queue.set_position(Some(position as usize));
        let Some(id) = self.queue.current_id() else {
            return Ok(false);
        };

        // The media index may still be catching up right after boot
        if self.catalog.track_source(id).await?.is_none() {
            info!(
                "Track {} not in catalog yet, retrying in {:?}",
                id, self.config.reload_retry_delay
            );
            tokio::time::sleep(self.config.reload_retry_delay).await;
            if self.catalog.track_source(id).await?.is_none() {
                warn!("Track {} still missing, discarding saved queue", id);
                return Ok(false);
            }
        }

        if !self.open_current(OpenMode::Quiet).await || !self.cur().is_initialized() {
            return Ok(false);
        }

        let seek = self.settings.get_long(keys::SEEK_POSITION).await?.unwrap_or(0);
        let duration = self.cur().duration();
        let seek = if seek >= 0 && seek < duration { seek } else { 0 };
        self.cur_mut().seek(seek);
        debug!("Restored track {} at {}", id, format_millis(seek));

        let mode = self.settings.get_int(keys::REPEAT_MODE).await?.unwrap_or(0);
        self.repeat_mode = RepeatMode::from_persisted(mode);
        Ok(true)
    }

    /// Drop the restored queue along with its stale seek offset
    async fn discard_restored_queue(&mut self) {
        self.queue.clear();
        self.cur_mut().stop();
        self.state = PlaybackState::Idle;
        self.now_playing = None;
        if let Err(e) = self.settings.remove(keys::SEEK_POSITION).await {
            warn!("Failed to clear saved seek position: {}", e);
        }
    }

    /// Removable storage is going away: save, stop and suspend saving
    pub async fn on_storage_ejected(&mut self) -> Result<()> {
        info!("Storage ejected, stopping playback");
        self.save_queue(true).await;
        self.saveable = false;
        self.stop().await?;
        self.now_playing = None;
        self.emit_queue_changed(QueueChangeTrigger::StorageEjected);
        self.publish_metadata();
        Ok(())
    }

    /// Storage is back: re-read the volume id and restore the saved queue
    pub async fn on_storage_mounted(&mut self) -> Result<()> {
        info!("Storage mounted, restoring queue");
        match self.catalog.volume_id().await {
            Ok(id) => self.volume_id = id,
            Err(e) => warn!("Could not refresh storage volume id: {}", e),
        }
        self.reload_queue().await;
        self.saveable = true;
        self.emit_queue_changed(QueueChangeTrigger::Reload);
        self.publish_metadata();
        Ok(())
    }

    pub(super) async fn load_fade_settings(&mut self) {
        match self.settings.get_long(keys::FADE_SECONDS).await {
            Ok(value) => self.fade_seconds = value.unwrap_or(0).max(0),
            Err(e) => warn!("Could not read fade setting: {}", e),
        }
        match self.settings.get_int(keys::CROSSFADE_ENABLED).await {
            Ok(value) => self.crossfade_enabled = value.unwrap_or(0) != 0,
            Err(e) => warn!("Could not read crossfade setting: {}", e),
        }
    }

    /// Change fade duration and crossfade flag, persisting both
    pub async fn set_fade(&mut self, fade_seconds: i64, crossfade_enabled: bool) -> Result<()> {
        self.fade_seconds = fade_seconds.max(0);
        self.crossfade_enabled = crossfade_enabled;
        info!(
            "Fade set to {}s (crossfade {})",
            self.fade_seconds,
            if crossfade_enabled { "on" } else { "off" }
        );

        self.settings
            .put_long(keys::FADE_SECONDS, self.fade_seconds)
            .await?;
        self.settings
            .put_int(keys::CROSSFADE_ENABLED, i32::from(crossfade_enabled))
            .await?;

        if self.cur().is_playing() {
            self.stop_next_slot();
            self.schedule_fade_out();
        }
        Ok(())
    }
}
