//! Transport control and transitions
//!
//! **Responsibilities:**
//! - play / pause / stop / next / previous / seek / repeat mode
//! - Track-ended policy and slot role swaps
//! - Fade timers: duck, fade down/up, crossfade
//! - Audio focus reactions
//! - Resource death recovery

use super::{OpenMode, PlaybackEngine};
use crate::error::Result;
use crate::playback::fader::{self, FadeKind};
use crate::playback::services::FocusGrant;
use crate::playback::types::{NEAR_END_MS, RESTART_THRESHOLD_MS};
use segue_common::events::{FocusChange, PlaybackState, PlayerEvent, RepeatMode};
use segue_common::time::format_millis;
use tracing::{debug, info, warn};

impl PlaybackEngine {
    /// Start or resume playback of the current entry.
    ///
    /// Aborts without any state change if audio focus is denied. Near the
    /// end of a track (outside repeat-current) playback moves on to the
    /// next entry first.
    pub async fn play(&mut self) -> Result<()> {
        if self.focus.request_focus() == FocusGrant::Denied {
            warn!("Audio focus denied, not starting playback");
            return Ok(());
        }
        self.set_session_active(true);

        if !self.cur().is_initialized() {
            if self.queue.is_empty() {
                debug!("Play requested with an empty queue");
                return Ok(());
            }
            if self.queue.position().is_none() {
                self.queue.set_position(Some(0));
            }
            if !self.open_current(OpenMode::Direct).await {
                return Ok(());
            }
        }

        let duration = self.cur().duration();
        if self.repeat_mode != RepeatMode::Current
            && duration > NEAR_END_MS
            && self.cur().position() >= duration - NEAR_END_MS
        {
            debug!("Resuming near the end of the track, advancing");
            let target = self.wrapped_position(1);
            if !self.jump_to(target).await {
                return Ok(());
            }
        }

        self.stop_next_slot();
        self.begin_playback();
        Ok(())
    }

    /// Start the current slot and reset the fade timers to a fresh fade-in
    pub(super) fn begin_playback(&mut self) {
        self.cur_mut().start();
        self.fades.cancel_many(&FadeKind::OUTGOING);
        self.fades.schedule(FadeKind::FadeUp, self.config.fade_tick);
        self.schedule_fade_out();
        self.state = PlaybackState::Playing;
        self.set_foreground(true);
        self.set_playing_intent(true);
    }

    /// Arm the fade-out (or crossfade) trigger for the current track
    pub(super) fn schedule_fade_out(&mut self) {
        self.fades.cancel_many(&[FadeKind::FadeDown, FadeKind::Crossfade]);
        let slot = self.cur();
        if let Some(delay) = fader::fade_out_trigger(slot.duration(), slot.position(), self.fade_seconds) {
            let kind = if self.crossfade_enabled {
                FadeKind::Crossfade
            } else {
                FadeKind::FadeDown
            };
            debug!("{:?} scheduled in {:?}", kind, delay);
            self.fades.schedule(kind, delay);
        }
    }

    /// Pause playback on user request
    pub async fn pause(&mut self) -> Result<()> {
        self.paused_by_transient_loss = false;
        self.pause_playback().await;
        Ok(())
    }

    pub(super) async fn pause_playback(&mut self) {
        self.fades.cancel_many(&FadeKind::RAMPS);
        if self.is_supposed_to_be_playing || self.cur().is_playing() {
            self.stop_next_slot();
            if self.cur().is_playing() {
                self.cur_mut().pause();
            }
            self.go_idle(PlaybackState::Paused);
            self.set_playing_intent(false);
            self.save_queue(false).await;
        }
    }

    pub async fn toggle_pause(&mut self) -> Result<()> {
        if self.is_supposed_to_be_playing {
            self.pause().await
        } else {
            self.play().await
        }
    }

    /// Stop playback and unbind the current track. Queue and position are kept.
    pub async fn stop(&mut self) -> Result<()> {
        self.fades.cancel_many(&FadeKind::RAMPS);
        self.stop_next_slot();
        self.cur_mut().stop();
        self.go_idle(PlaybackState::Idle);
        self.set_playing_intent(false);
        Ok(())
    }

    /// Skip forward, wrapping past the end
    pub async fn next(&mut self) -> Result<()> {
        if self.queue.is_empty() {
            return Ok(());
        }
        let target = self.wrapped_position(1);
        if self.jump_to(target).await {
            self.play().await?;
        }
        Ok(())
    }

    /// Skip back, wrapping before the start
    pub async fn previous(&mut self) -> Result<()> {
        if self.queue.is_empty() {
            return Ok(());
        }
        let target = self.wrapped_position(-1);
        if self.jump_to(target).await {
            self.play().await?;
        }
        Ok(())
    }

    /// Skip back near the start of a track, otherwise restart it
    pub async fn previous_or_restart(&mut self) -> Result<()> {
        if self.cur().position() < RESTART_THRESHOLD_MS {
            self.previous().await
        } else {
            self.seek(0).await.map(|_| ())
        }
    }

    /// Seek within the current track. Returns the position applied, or -1
    /// when nothing is loaded.
    pub async fn seek(&mut self, position_ms: i64) -> Result<i64> {
        if !self.cur().is_initialized() {
            return Ok(-1);
        }
        self.stop_next_slot();
        self.fades.cancel_many(&[FadeKind::FadeDown, FadeKind::Crossfade]);

        let applied = self.cur_mut().seek(position_ms);
        debug!("Seek to {}", format_millis(applied));
        if self.cur().is_playing() {
            self.schedule_fade_out();
            if self.cur().gain() < 1.0 && !self.fades.is_pending(FadeKind::Duck) {
                self.fades.schedule(FadeKind::FadeUp, self.config.fade_tick);
            }
        }
        self.save_queue(false).await;
        Ok(applied)
    }

    pub async fn set_repeat_mode(&mut self, mode: RepeatMode) -> Result<()> {
        self.repeat_mode = mode;
        info!("Repeat mode set to {}", mode);
        self.publish(PlayerEvent::RepeatModeChanged {
            mode,
            timestamp: chrono::Utc::now(),
        });
        self.save_queue(false).await;
        Ok(())
    }

    /// Queue index `offset` steps from the current one, wrapping both ways
    pub(super) fn wrapped_position(&self, offset: i64) -> usize {
        let len = self.queue.len() as i64;
        match self.queue.position() {
            Some(p) if len > 0 => (p as i64 + offset).rem_euclid(len) as usize,
            _ => 0,
        }
    }

    /// Reposition the queue and open the entry there (user-initiated)
    pub(super) async fn jump_to(&mut self, position: usize) -> bool {
        self.stop_next_slot();
        self.fades.cancel_many(&FadeKind::RAMPS);
        self.queue.set_position(Some(position));
        self.open_current(OpenMode::Direct).await
    }

    /// The current slot finished its track
    pub(super) async fn on_track_ended(&mut self) {
        debug!("Track ended (repeat mode {})", self.repeat_mode);
        self.fades.cancel_many(&FadeKind::RAMPS);

        match self.repeat_mode {
            RepeatMode::StopAfter => {
                self.stop_next_slot();
                self.set_session_active(false);
                self.go_idle(PlaybackState::Idle);
                self.set_playing_intent(false);
            }
            RepeatMode::Current => {
                self.stop_next_slot();
                self.cur_mut().seek(0);
                if self.fade_seconds > 0 {
                    self.cur_mut().set_volume(0.0);
                }
                self.begin_playback();
            }
            RepeatMode::None | RepeatMode::All => self.advance_after_track_end().await,
        }
    }

    async fn advance_after_track_end(&mut self) {
        let Some(position) = self.upcoming_position() else {
            debug!("End of queue reached");
            self.stop_next_slot();
            self.go_idle(PlaybackState::Idle);
            self.set_playing_intent(false);
            return;
        };
        let expected = self.queue.get(position);

        self.cur_mut().stop();
        self.queue.set_position(Some(position));
        self.swap_slots();

        let prebuffered = self.cur().is_initialized() && self.cur().track() == expected;
        if prebuffered {
            debug!("Continuing with crossfaded slot {}", self.cur().id());
            self.open_failures = 0;
            self.refresh_now_playing().await;
        } else if !self.open_current(OpenMode::SkipUnplayable).await {
            return;
        }
        self.begin_playback();
    }

    // ---- fade timers --------------------------------------------------

    /// Run one step of the ramp `kind`
    pub async fn on_timer(&mut self, kind: FadeKind) {
        let tick = self.config.fade_tick;
        match kind {
            FadeKind::Duck => {
                let (gain, more) = fader::duck_step(self.cur().gain());
                self.cur_mut().set_volume(gain);
                if more {
                    self.fades.schedule(FadeKind::Duck, tick);
                }
            }
            FadeKind::FadeDown => self.fade_down_tick(),
            FadeKind::FadeUp => {
                let (gain, more) = fader::fade_up_step(self.cur().gain(), self.fade_seconds);
                self.cur_mut().set_volume(gain);
                if more {
                    self.fades.schedule(FadeKind::FadeUp, tick);
                }
            }
            FadeKind::Crossfade => self.start_crossfade().await,
            FadeKind::CrossfadeStep => self.crossfade_tick(),
            FadeKind::ResourceDied => self.on_resource_recovered().await,
        }
    }

    fn fade_down_tick(&mut self) {
        self.fades.cancel(FadeKind::FadeUp);
        let (gain, more) = fader::fade_down_step(self.cur().gain(), self.fade_seconds);
        self.cur_mut().set_volume(gain);
        if more {
            self.fades.schedule(FadeKind::FadeDown, self.config.fade_tick);
        }
    }

    /// Begin overlapping the upcoming track, or fall back to a plain fade-out
    async fn start_crossfade(&mut self) {
        self.fades.cancel(FadeKind::FadeUp);
        if !self.crossfade_enabled || !self.cur().is_playing() {
            self.fade_down_tick();
            return;
        }
        let Some(id) = self.upcoming_position().and_then(|p| self.queue.get(p)) else {
            debug!("No upcoming track, fading out instead of crossfading");
            self.fade_down_tick();
            return;
        };

        let next = self.next_index();
        if let Err(e) = self.prepare_slot(next, id).await {
            warn!("Crossfade prepare of track {} failed: {}", id, e);
            self.slots[next].stop();
            self.fade_down_tick();
            return;
        }

        info!("Crossfading into track {}", id);
        self.slots[next].set_volume(0.0);
        self.slots[next].start();
        self.fades.schedule(FadeKind::CrossfadeStep, self.config.fade_tick);
    }

    fn crossfade_tick(&mut self) {
        let next = self.next_index();
        if !self.slots[next].is_playing() {
            return;
        }
        let (out_gain, out_more) = fader::fade_down_step(self.cur().gain(), self.fade_seconds);
        let (in_gain, in_more) = fader::fade_up_step(self.slots[next].gain(), self.fade_seconds);
        self.cur_mut().set_volume(out_gain);
        self.slots[next].set_volume(in_gain);
        if out_more || in_more {
            self.fades.schedule(FadeKind::CrossfadeStep, self.config.fade_tick);
        }
    }

    // ---- focus --------------------------------------------------------

    pub async fn on_focus_change(&mut self, change: FocusChange) -> Result<()> {
        debug!("Audio focus change: {:?}", change);
        match change {
            FocusChange::Loss => {
                self.paused_by_transient_loss = false;
                self.focus.abandon_focus();
                self.pause_playback().await;
                self.set_session_active(false);
            }
            FocusChange::LossTransientCanDuck => {
                self.fades.cancel(FadeKind::FadeUp);
                self.fades.schedule(FadeKind::Duck, self.config.fade_tick);
            }
            FocusChange::LossTransient => {
                let was_playing = self.is_supposed_to_be_playing;
                self.pause_playback().await;
                self.paused_by_transient_loss = was_playing;
            }
            FocusChange::Gain => {
                if !self.cur().is_playing() && self.paused_by_transient_loss {
                    self.paused_by_transient_loss = false;
                    self.cur_mut().set_volume(0.0);
                    self.play().await?;
                } else if self.cur().is_playing() {
                    self.fades.cancel(FadeKind::Duck);
                    self.fades.schedule(FadeKind::FadeUp, self.config.fade_tick);
                }
            }
        }
        Ok(())
    }

    // ---- resource death -----------------------------------------------

    pub(super) fn on_resource_died(&mut self, index: usize) {
        warn!("Player resource for slot {} died, recreating", self.slots[index].id());
        self.slots[index].recreate();

        if index == self.current {
            self.fades.cancel_many(&FadeKind::RAMPS);
            self.stop_next_slot();
            self.fades
                .schedule(FadeKind::ResourceDied, self.config.resource_died_delay);
        } else {
            self.fades.cancel(FadeKind::CrossfadeStep);
        }
    }

    /// Follow-up once the recreated resource had time to settle
    async fn on_resource_recovered(&mut self) {
        if self.is_supposed_to_be_playing {
            info!("Resuming with the next track after resource death");
            if let Err(e) = self.next().await {
                warn!("Advancing after resource death failed: {}", e);
            }
        } else {
            info!("Re-preparing current track after resource death");
            self.open_current(OpenMode::Quiet).await;
        }
    }
}
