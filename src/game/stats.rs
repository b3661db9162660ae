//! Frame rate statistics

use std::time::{Duration, Instant};

/// FPS summary for one logging window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FpsReport {
    /// Frames in the window divided by the window length
    pub average: f64,
    /// Rate implied by the slowest frame in the window
    pub minimum: f64,
    pub frames: u32,
}

/// Accumulates frame times and reports once per interval
#[derive(Debug, Clone)]
pub struct FpsMeter {
    interval: Duration,
    window_start: Instant,
    frames: u32,
    longest_frame: Duration,
}

impl FpsMeter {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            window_start: now,
            frames: 0,
            longest_frame: Duration::ZERO,
        }
    }

    /// Record one frame. Returns a report and starts a new window once the
    /// interval has elapsed.
    pub fn record(&mut self, frame_time: Duration, now: Instant) -> Option<FpsReport> {
        self.frames += 1;
        self.longest_frame = self.longest_frame.max(frame_time);

        let window = now.saturating_duration_since(self.window_start);
        if window < self.interval {
            return None;
        }

        let average = self.frames as f64 / window.as_secs_f64();
        let minimum = if self.longest_frame.is_zero() {
            average
        } else {
            1.0 / self.longest_frame.as_secs_f64()
        };
        let report = FpsReport {
            average,
            minimum,
            frames: self.frames,
        };

        self.window_start = now;
        self.frames = 0;
        self.longest_frame = Duration::ZERO;
        Some(report)
    }
}
