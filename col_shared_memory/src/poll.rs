//! Bounded polling helpers.
//!
//! Every cross-process wait is a loop of "check, test the deadline, sleep a
//! fixed interval". The counterpart cannot take part in this process's
//! synchronization primitives, so there is no blocking alternative.

use std::time::{Duration, Instant};

/// Deadline of a polling loop. `None` timeout never expires.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    start: Instant,
    timeout: Option<Duration>,
}

impl Deadline {
    /// Start the clock now.
    pub fn start(timeout: Option<Duration>) -> Self {
        Self {
            start: Instant::now(),
            timeout,
        }
    }

    /// Time since the deadline was started.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Time left, `None` when unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.timeout.map(|t| t.saturating_sub(self.elapsed()))
    }

    /// Whether the timeout has elapsed.
    pub fn expired(&self) -> bool {
        self.remaining().is_some_and(|r| r.is_zero())
    }

    /// Sleep for `interval`, but never past the deadline.
    pub fn sleep(&self, interval: Duration) {
        let nap = match self.remaining() {
            Some(r) => interval.min(r),
            None => interval,
        };
        if !nap.is_zero() {
            std::thread::sleep(nap);
        }
    }

    /// Sleep until `at` after the start, but never past the deadline.
    ///
    /// Scheduling against the start keeps a fixed cadence: oversleeping one
    /// period does not push back the following ones.
    pub fn sleep_until(&self, at: Duration) {
        self.sleep(at.saturating_sub(self.elapsed()));
    }
}
