/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Monotonic time source for rate calculation.
pub trait Clock: Send + Sync {
    /// Nanoseconds elapsed since an arbitrary but fixed origin.
    fn tick_nanos(&self) -> u64;
}

pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        MonotonicClock {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        MonotonicClock::new()
    }
}

impl Clock for MonotonicClock {
    fn tick_nanos(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }
}

/// A clock that only moves when told to.
#[derive(Default)]
pub struct ManualClock {
    nanos: AtomicU64,
}

impl ManualClock {
    pub fn advance(&self, dur: Duration) {
        let nanos = u64::try_from(dur.as_nanos()).unwrap_or(u64::MAX);
        self.nanos.fetch_add(nanos, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn tick_nanos(&self) -> u64 {
        self.nanos.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual() {
        let clock = ManualClock::default();
        assert_eq!(clock.tick_nanos(), 0);
        clock.advance(Duration::from_millis(3));
        assert_eq!(clock.tick_nanos(), 3_000_000);
    }

    #[test]
    fn monotonic() {
        let clock = MonotonicClock::new();
        let t1 = clock.tick_nanos();
        let t2 = clock.tick_nanos();
        assert!(t2 >= t1);
    }
}
