//! Per-key timestamp log.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Ordered log of the instants at which requests for one key were allowed.
///
/// Timestamps are kept oldest first. Every timestamp may be stale at any given
/// moment; staleness is only resolved when [`TimestampLog::evict`] runs on the
/// next access to the key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimestampLog {
    timestamps: VecDeque<Instant>,
}

impl TimestampLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every timestamp that is not strictly newer than `window_start`.
    ///
    /// Returns the number of timestamps removed.
    pub fn evict(&mut self, window_start: Instant) -> usize {
        let mut evicted = 0;
        while let Some(&oldest) = self.timestamps.front() {
            if oldest > window_start {
                break;
            }
            self.timestamps.pop_front();
            evicted += 1;
        }
        evicted
    }

    /// Evict relative to `now` and a window length.
    ///
    /// When `now - window` is not representable there is nothing old enough to
    /// fall out of the window, so the log is left untouched.
    pub fn evict_outside(&mut self, now: Instant, window: Duration) -> usize {
        match now.checked_sub(window) {
            Some(window_start) => self.evict(window_start),
            None => 0,
        }
    }

    /// Append a timestamp, keeping the log in non-decreasing order.
    ///
    /// A timestamp older than the newest entry is clamped to it.
    pub fn record(&mut self, now: Instant) {
        let ts = match self.timestamps.back() {
            Some(&newest) if newest > now => newest,
            _ => now,
        };
        self.timestamps.push_back(ts);
    }

    /// The oldest retained timestamp.
    pub fn oldest(&self) -> Option<Instant> {
        self.timestamps.front().copied()
    }

    /// The newest retained timestamp.
    pub fn newest(&self) -> Option<Instant> {
        self.timestamps.back().copied()
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}
