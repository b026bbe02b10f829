//! Fade scheduling
//!
//! Volume ramps are driven by one-shot timers on the engine task. Each timer
//! is keyed by its [`FadeKind`]; scheduling a kind replaces any deadline
//! already pending for it, which is how a new fade cancels the one it
//! supersedes. The engine sleeps until [`FadeScheduler::next_deadline`] and
//! then handles whatever [`FadeScheduler::take_due`] returns, one ramp step
//! per tick.
//!
//! # Ramps
//!
//! - **Duck**: -0.05 per tick down to a floor of 0.2
//! - **FadeDown**: -0.01/max(fade_seconds, 1) per tick down to 0
//! - **FadeUp**: +0.01/max(fade_seconds, 1) per tick up to 1
//! - **Crossfade**: starts the incoming slot; **CrossfadeStep** then ramps
//!   incoming up and outgoing down with the fade step
//!
//! All state lives on a single task, so the scheduler needs no locking.

use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;

/// Gain reduction per duck tick
pub const DUCK_STEP: f32 = 0.05;

/// Gain a duck settles at
pub const DUCK_FLOOR: f32 = 0.2;

/// Pending timer categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FadeKind {
    Duck,
    FadeDown,
    FadeUp,
    /// Fade-out trigger point when crossfading is enabled
    Crossfade,
    CrossfadeStep,
    /// Delayed follow-up after a player resource was recreated
    ResourceDied,
}

impl FadeKind {
    /// Timers cancelled when playback (re)starts or seeks
    pub const OUTGOING: [FadeKind; 4] = [
        FadeKind::Duck,
        FadeKind::FadeDown,
        FadeKind::Crossfade,
        FadeKind::CrossfadeStep,
    ];

    /// Every volume ramp (all kinds except the resource-death follow-up)
    pub const RAMPS: [FadeKind; 5] = [
        FadeKind::Duck,
        FadeKind::FadeDown,
        FadeKind::FadeUp,
        FadeKind::Crossfade,
        FadeKind::CrossfadeStep,
    ];
}

/// Timer table for the engine's fades
#[derive(Debug, Default)]
pub struct FadeScheduler {
    pending: HashMap<FadeKind, Instant>,
}

impl FadeScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `kind` to fire after `delay`, replacing any pending deadline
    pub fn schedule(&mut self, kind: FadeKind, delay: Duration) {
        self.schedule_at(kind, Instant::now() + delay);
    }

    pub fn schedule_at(&mut self, kind: FadeKind, deadline: Instant) {
        self.pending.insert(kind, deadline);
    }

    pub fn cancel(&mut self, kind: FadeKind) {
        self.pending.remove(&kind);
    }

    pub fn cancel_many(&mut self, kinds: &[FadeKind]) {
        for kind in kinds {
            self.pending.remove(kind);
        }
    }

    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }

    pub fn is_pending(&self, kind: FadeKind) -> bool {
        self.pending.contains_key(&kind)
    }

    pub fn deadline(&self, kind: FadeKind) -> Option<Instant> {
        self.pending.get(&kind).copied()
    }

    /// Earliest pending deadline
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().min().copied()
    }

    /// Remove and return every kind due at `now`, earliest first
    pub fn take_due(&mut self, now: Instant) -> Vec<FadeKind> {
        let mut due: Vec<(Instant, FadeKind)> = self
            .pending
            .iter()
            .filter(|(_, &deadline)| deadline <= now)
            .map(|(&kind, &deadline)| (deadline, kind))
            .collect();
        due.sort_by_key(|(deadline, _)| *deadline);

        for (_, kind) in &due {
            self.pending.remove(kind);
        }
        due.into_iter().map(|(_, kind)| kind).collect()
    }
}

/// Per-tick gain change for fade up/down
pub fn fade_step(fade_seconds: i64) -> f32 {
    0.01 / fade_seconds.max(1) as f32
}

/// Next duck gain and whether another tick is needed
pub fn duck_step(gain: f32) -> (f32, bool) {
    let next = gain - DUCK_STEP;
    if next > DUCK_FLOOR {
        (next, true)
    } else {
        (DUCK_FLOOR, false)
    }
}

/// Next fade-down gain and whether another tick is needed
pub fn fade_down_step(gain: f32, fade_seconds: i64) -> (f32, bool) {
    let next = gain - fade_step(fade_seconds);
    if next > 0.0 {
        (next, true)
    } else {
        (0.0, false)
    }
}

/// Next fade-up gain and whether another tick is needed
pub fn fade_up_step(gain: f32, fade_seconds: i64) -> (f32, bool) {
    let next = gain + fade_step(fade_seconds);
    if next < 1.0 {
        (next, true)
    } else {
        (1.0, false)
    }
}

/// Delay until the fade-out (or crossfade) should begin.
///
/// `remaining - fade_seconds * 1000`. `None` when fading is disabled, the
/// duration is unknown, or the track is too short for the configured fade
/// (logged as a warning).
pub fn fade_out_trigger(duration_ms: i64, position_ms: i64, fade_seconds: i64) -> Option<Duration> {
    if fade_seconds <= 0 || duration_ms <= 0 {
        return None;
    }
    let remaining = duration_ms - position_ms.max(0);
    let delay = remaining - fade_seconds * 1000;
    if delay < 0 {
        warn!(
            "Track too short for {}s fade ({}ms remaining), no fade-out scheduled",
            fade_seconds, remaining
        );
        return None;
    }
    Some(Duration::from_millis(delay as u64))
}
