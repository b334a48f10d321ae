// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Time utilities for PatternKey
//!
//! Monotonic tick counters and deadlines used to bound frame reception.

/// System tick counter (platform-specific resolution)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Ticks(u64);

impl Ticks {
    /// Create from raw tick count
    #[must_use]
    pub const fn new(ticks: u64) -> Self {
        Self(ticks)
    }

    /// Calculate elapsed ticks since this timestamp
    #[must_use]
    pub const fn elapsed(&self, now: Self) -> u64 {
        now.0.saturating_sub(self.0)
    }
}

/// Restartable deadline
///
/// The frame receiver restarts it on every accepted byte, so it measures
/// inactivity rather than total frame time.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    start: Ticks,
    timeout: u64,
}

impl Deadline {
    /// Create a new deadline
    #[must_use]
    pub const fn new(start: Ticks, timeout_ticks: u64) -> Self {
        Self {
            start,
            timeout: timeout_ticks,
        }
    }

    /// Check if the deadline has expired
    #[must_use]
    pub const fn is_expired(&self, now: Ticks) -> bool {
        self.start.elapsed(now) >= self.timeout
    }

    /// Restart the deadline from `now` with the same timeout
    pub fn restart(&mut self, now: Ticks) {
        self.start = now;
    }
}

/// Tick frequency for converting milliseconds to ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickFrequency {
    hz: u32,
}

impl TickFrequency {
    /// Create from frequency in Hz
    #[must_use]
    pub const fn from_hz(hz: u32) -> Self {
        Self { hz }
    }

    /// Convert milliseconds to ticks (at least one tick for a nonzero duration)
    #[must_use]
    pub const fn millis_to_ticks(&self, millis: u32) -> u64 {
        let ticks = ((millis as u64) * (self.hz as u64)) / 1_000;
        if ticks == 0 && millis > 0 {
            1
        } else {
            ticks
        }
    }
}
