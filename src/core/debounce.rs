//! Debounced transform recompute - coalesces bursts of mutations.
//!
//! Remote control traffic tends to arrive in bursts (a finger dragging a
//! slider fires dozens of position updates per second). Rebuilding every
//! track transform on each one is wasted work, so mutations only mark
//! tracks dirty and schedule a flush here; after a short quiet window the
//! registry recomputes everything dirty in a single pass. A viewport resize
//! arriving mid-window joins the same batch instead of being lost.

use std::time::{Duration, Instant};

use log::trace;

#[derive(Debug, Clone)]
pub struct RecomputeDebouncer {
    /// Quiet window before the flush
    delay: Duration,
    deadline: Option<Instant>,
    /// Mutations coalesced into the pending batch (for logging)
    coalesced: u32,
}

impl RecomputeDebouncer {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            deadline: None,
            coalesced: 0,
        }
    }

    /// Schedule a flush. If one is already pending, resets the timer
    /// (debounce behavior) and counts the extra mutation into the batch.
    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
        self.coalesced += 1;
    }

    /// Check whether the batch should flush now. Returns the number of
    /// coalesced mutations if the quiet window elapsed, clearing the batch.
    pub fn tick(&mut self, now: Instant) -> Option<u32> {
        let deadline = self.deadline?;
        if now < deadline {
            return None;
        }
        self.deadline = None;
        let n = self.coalesced;
        self.coalesced = 0;
        trace!("recompute debouncer: flushing batch of {n}");
        Some(n)
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_flush_before_window() {
        let mut d = RecomputeDebouncer::new(10);
        let now = Instant::now();
        d.schedule(now);
        assert!(d.is_pending());
        assert_eq!(d.tick(now + Duration::from_millis(5)), None);
    }

    #[test]
    fn test_burst_coalesces_into_one_flush() {
        let mut d = RecomputeDebouncer::new(10);
        let now = Instant::now();
        for i in 0..5 {
            d.schedule(now + Duration::from_millis(i));
        }
        // Window counts from the last mutation
        assert_eq!(d.tick(now + Duration::from_millis(13)), None);
        assert_eq!(d.tick(now + Duration::from_millis(14)), Some(5));
        assert!(!d.is_pending());
        assert_eq!(d.tick(now + Duration::from_millis(30)), None);
    }
}
