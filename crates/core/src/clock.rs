// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time handling.
//!
//! Request stamps order competing governor requests, so tests need a clock
//! they can steer.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

/// A clock that provides wall-clock microseconds since the epoch.
pub trait Clock: Clone + Send + Sync {
    fn epoch_us(&self) -> u64;
}

/// Real system clock.
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn epoch_us(&self) -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_micros() as u64
    }
}

/// Fake clock for testing with controllable time.
#[derive(Clone)]
pub struct FakeClock {
    epoch_us: Arc<Mutex<u64>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self { epoch_us: Arc::new(Mutex::new(1_000_000)) }
    }

    /// Advance the clock by the given number of microseconds.
    pub fn advance_us(&self, us: u64) {
        *self.epoch_us.lock() += us;
    }

    /// Set the clock to a specific microsecond value.
    pub fn set_us(&self, us: u64) {
        *self.epoch_us.lock() = us;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn epoch_us(&self) -> u64 {
        *self.epoch_us.lock()
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
