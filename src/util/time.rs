//! Time utilities for frame pacing

use std::time::{Duration, Instant};

/// How many spin iterations pass between cancellation checks
const SPINS_PER_CHECK: u32 = 256;

/// Busy-wait until `deadline`.
///
/// Sleep granularity is too coarse for single-digit millisecond frame
/// budgets, so this spins. Every few hundred iterations it checks `cancelled`
/// and yields the core. Returns false if cancelled before the deadline.
pub fn spin_until<F>(deadline: Instant, cancelled: F) -> bool
where
    F: Fn() -> bool,
{
    let mut spins: u32 = 0;
    while Instant::now() < deadline {
        spins = spins.wrapping_add(1);
        if spins % SPINS_PER_CHECK == 0 {
            if cancelled() {
                return false;
            }
            std::thread::yield_now();
        } else {
            std::hint::spin_loop();
        }
    }
    true
}

/// A simple timer for measuring durations
#[derive(Debug, Clone)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn starting_at(start: Instant) -> Self {
        Self { start }
    }

    /// Time between the timer's start and `now`
    pub fn elapsed_at(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.start)
    }

    /// Restart at `now`, returning the time elapsed up to that point
    pub fn lap(&mut self, now: Instant) -> Duration {
        let elapsed = self.elapsed_at(now);
        self.start = now;
        elapsed
    }
}
