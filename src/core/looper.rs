//! Seamless loop control for a single track.
//!
//! # Purpose
//!
//! Consumer media stacks are unreliable near end-of-media: end events get
//! silently dropped and position updates can stall. One detection signal is
//! not enough for a kiosk that must loop for days unattended, so three
//! independent signals converge on the same restart action:
//!
//! 1. **Position poll** - every `poll_interval_ms` the remaining time is
//!    checked against `end_threshold_ms`.
//! 2. **End-of-media event** - the backend's explicit status event, routed
//!    in via [`LoopController::on_end_of_media`].
//! 3. **Fallback deadline** - armed at (re)start for
//!    `duration - fallback_margin_ms` from now; fires only if the first two
//!    signals did not.
//!
//! All three paths call `perform_loop`: seek to zero, ensure playback is
//! active, re-arm the fallback deadline. A failed seek is logged and retried
//! on the next signal; a stuck track self-heals instead of staying dead.
//!
//! # Scheduling
//!
//! Deadlines are plain `Instant`s checked from the stage tick, not separate
//! threads (same pattern as the registry's recompute debouncer).
//!
//! # Used by
//!
//! - `entities::track` - owns one controller per track, pumps it every tick

use std::time::{Duration, Instant};

use log::{debug, trace, warn};

use crate::config::LoopTuning;
use crate::core::backend::PlayerBackend;

#[derive(Debug)]
pub struct LoopController {
    tuning: LoopTuning,
    armed: bool,
    next_poll: Option<Instant>,
    fallback_at: Option<Instant>,
    loops_performed: u64,
}

impl LoopController {
    pub fn new(tuning: LoopTuning) -> Self {
        Self {
            tuning,
            armed: false,
            next_poll: None,
            fallback_at: None,
            loops_performed: 0,
        }
    }

    /// Enable loop detection for media of the given duration.
    /// Called when the backend reports the media loaded (or after a swap).
    pub fn arm(&mut self, now: Instant, duration_ms: u64) {
        self.armed = true;
        self.next_poll = Some(now);
        self.rearm_fallback(now, duration_ms);
        trace!("loop controller armed, duration {duration_ms}ms");
    }

    /// Disable all detection timers. Called on stop/remove so a halted
    /// track cannot fire a spurious restart.
    pub fn disarm(&mut self) {
        self.armed = false;
        self.next_poll = None;
        self.fallback_at = None;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Total restarts performed over the controller's lifetime.
    pub fn loops_performed(&self) -> u64 {
        self.loops_performed
    }

    /// Signal (b): the backend reported an explicit end-of-media event.
    pub fn on_end_of_media(&mut self, now: Instant, player: &mut dyn PlayerBackend) {
        if !self.armed {
            return;
        }
        trace!("end-of-media event, restarting");
        self.perform_loop(now, player);
    }

    /// Run signals (a) and (c). Called once per stage tick.
    pub fn tick(&mut self, now: Instant, player: &mut dyn PlayerBackend) {
        if !self.armed {
            return;
        }

        // Signal (a): periodic position poll against known duration
        if self.next_poll.is_none_or(|t| now >= t) {
            self.next_poll = Some(now + Duration::from_millis(self.tuning.poll_interval_ms));
            let duration = player.duration_ms();
            if duration > 0 {
                let remaining = duration.saturating_sub(player.position_ms());
                if remaining < self.tuning.end_threshold_ms {
                    trace!("position poll: {remaining}ms remaining, restarting");
                    self.perform_loop(now, player);
                    return;
                }
            }
        }

        // Signal (c): fallback deadline for when (a) and (b) both failed us
        if let Some(at) = self.fallback_at
            && now >= at
        {
            debug!("fallback timer fired, forcing restart");
            self.perform_loop(now, player);
        }
    }

    /// The single restart action all signals converge on.
    fn perform_loop(&mut self, now: Instant, player: &mut dyn PlayerBackend) {
        match player.seek(0) {
            Ok(()) => {
                if !player.is_playing() {
                    player.play();
                }
                self.loops_performed += 1;
                self.rearm_fallback(now, player.duration_ms());
                trace!("loop restart #{} complete", self.loops_performed);
            }
            Err(e) => {
                // Not fatal: the next poll/event/deadline retries
                warn!("loop restart failed: {e:#}, retrying on next signal");
                self.fallback_at =
                    Some(now + Duration::from_millis(self.tuning.poll_interval_ms));
            }
        }
    }

    fn rearm_fallback(&mut self, now: Instant, duration_ms: u64) {
        if duration_ms == 0 {
            self.fallback_at = None;
            return;
        }
        let lead = duration_ms.saturating_sub(self.tuning.fallback_margin_ms);
        self.fallback_at = Some(now + Duration::from_millis(lead));
    }
}
