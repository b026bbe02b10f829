//! Queue operations
//!
//! **Responsibilities:**
//! - Enqueue policies (now / next / last) and whole-queue loads
//! - Removal with re-anchoring of the current entry
//! - Move, shuffle, uniqueify, interleave
//!
//! Every mutation here publishes a queue-changed event and performs a full
//! save.

use super::{OpenMode, PlaybackEngine};
use crate::error::{Error, Result};
use crate::playback::fader::FadeKind;
use crate::playback::queue::Removal;
use segue_common::events::{EnqueueMode, PlaybackState, QueueChangeTrigger, TrackId};
use tracing::{debug, info};

impl PlaybackEngine {
    /// Add tracks to the queue.
    ///
    /// `Next` inserts after the current entry, or appends when already at
    /// the tail. `Now` appends and jumps to the first added track. Adding
    /// to a queue without a position starts playback at its first entry.
    pub async fn enqueue(&mut self, ids: &[TrackId], mode: EnqueueMode) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        info!("Enqueue {} tracks ({:?})", ids.len(), mode);
        let had_position = self.queue.position().is_some();

        match (mode, self.queue.position()) {
            (EnqueueMode::Next, Some(p)) if p + 1 < self.queue.len() => {
                self.queue.insert(ids, (p + 1) as i64);
            }
            _ => {
                let first_added = self.queue.len();
                self.queue.append(ids);

                if mode == EnqueueMode::Now {
                    self.emit_queue_changed(QueueChangeTrigger::Enqueue);
                    if self.jump_to(first_added).await {
                        self.play().await?;
                    }
                    self.save_queue(true).await;
                    return Ok(());
                }
            }
        }

        self.emit_queue_changed(QueueChangeTrigger::Enqueue);
        if !had_position && self.jump_to(0).await {
            self.play().await?;
        }
        self.save_queue(true).await;
        Ok(())
    }

    /// Replace the queue with `ids` and start playing at `position`.
    ///
    /// If `ids` equals the current queue only the position changes.
    pub async fn load(&mut self, ids: &[TrackId], position: i64) -> Result<()> {
        if ids.is_empty() {
            debug!("Ignoring load of an empty list");
            return Ok(());
        }
        let position = position.max(0) as usize;
        if position >= ids.len() {
            return Err(Error::BadRequest(format!(
                "position {} out of range for {} tracks",
                position,
                ids.len()
            )));
        }

        if self.queue.as_slice() != ids {
            self.queue.insert(ids, -1);
            self.emit_queue_changed(QueueChangeTrigger::Load);
        } else {
            debug!("Loaded list matches current queue, repositioning only");
        }

        if self.jump_to(position).await {
            self.play().await?;
        }
        self.save_queue(true).await;
        Ok(())
    }

    /// Remove queue entries `first..=last`. Returns the number removed.
    pub async fn remove_tracks(&mut self, first: usize, last: usize) -> Result<usize> {
        let removal = self.queue.remove(first, last);
        self.finish_removal(removal).await
    }

    /// Remove every occurrence of `id`. Returns the number removed.
    pub async fn remove_track(&mut self, id: TrackId) -> Result<usize> {
        let removal = self.queue.remove_id(id);
        self.finish_removal(removal).await
    }

    async fn finish_removal(&mut self, removal: Removal) -> Result<usize> {
        if removal.removed == 0 {
            return Ok(0);
        }
        debug!(
            "Removed {} queue entries (current removed: {})",
            removal.removed, removal.current_removed
        );
        if removal.current_removed {
            self.reanchor().await?;
        }
        self.emit_queue_changed(QueueChangeTrigger::Remove);
        self.save_queue(true).await;
        Ok(removal.removed)
    }

    /// Re-establish playback at the current position after the entry there
    /// changed, keeping the play/pause state.
    async fn reanchor(&mut self) -> Result<()> {
        let was_playing = self.is_supposed_to_be_playing;
        self.stop_next_slot();
        self.fades.cancel_many(&FadeKind::RAMPS);

        if self.queue.is_empty() {
            self.cur_mut().stop();
            self.go_idle(PlaybackState::Idle);
            self.set_playing_intent(false);
            self.now_playing = None;
            self.publish_metadata();
            return Ok(());
        }

        if self.open_current(OpenMode::Direct).await && was_playing {
            self.play().await?;
        }
        Ok(())
    }

    pub async fn move_queue_item(&mut self, from: usize, to: usize) -> Result<()> {
        if self.queue.is_empty() {
            return Ok(());
        }
        self.queue.move_item(from, to);
        self.emit_queue_changed(QueueChangeTrigger::Move);
        self.save_queue(true).await;
        Ok(())
    }

    /// Shuffle everything except the current entry
    pub async fn shuffle(&mut self) -> Result<()> {
        self.queue.shuffle(&mut rand::thread_rng());
        self.emit_queue_changed(QueueChangeTrigger::Shuffle);
        self.save_queue(true).await;
        Ok(())
    }

    /// Drop duplicate ids. Only allowed while not playing.
    pub async fn uniqueify(&mut self) -> Result<usize> {
        if self.is_supposed_to_be_playing {
            debug!("Not removing duplicates while playing");
            return Ok(0);
        }
        let removal = self.queue.dedup(false);
        if removal.removed == 0 {
            return Ok(0);
        }
        if removal.current_removed {
            self.reanchor().await?;
        }
        self.emit_queue_changed(QueueChangeTrigger::Uniqueify);
        self.save_queue(true).await;
        Ok(removal.removed)
    }

    /// Merge `ids` into the queue, alternating runs of `current_count`
    /// existing and `new_count` new entries.
    pub async fn interleave(
        &mut self,
        ids: &[TrackId],
        current_count: usize,
        new_count: usize,
    ) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let had_position = self.queue.position().is_some();
        self.queue.interleave(ids, current_count, new_count);

        if !had_position {
            self.queue.set_position(Some(0));
            self.open_current(OpenMode::Direct).await;
        }
        self.emit_queue_changed(QueueChangeTrigger::Interleave);
        self.save_queue(true).await;
        Ok(())
    }
}
