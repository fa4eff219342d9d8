/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use portable_atomic::AtomicF64;

use crate::{Clock, MonotonicClock};

const TICK_INTERVAL_SECS: u64 = 5;
const TICK_INTERVAL_NANOS: u64 = TICK_INTERVAL_SECS * 1_000_000_000;

/// Exponentially weighted moving average of an event rate, in events per
/// second, updated once per tick interval.
struct Ewma {
    alpha: f64,
    rate: AtomicF64,
    uncounted: AtomicU64,
    initialized: AtomicBool,
}

impl Ewma {
    fn with_minutes(minutes: f64) -> Self {
        let alpha = 1.0 - (-(TICK_INTERVAL_SECS as f64) / 60.0 / minutes).exp();
        Ewma {
            alpha,
            rate: AtomicF64::new(0.0),
            uncounted: AtomicU64::new(0),
            initialized: AtomicBool::new(false),
        }
    }

    fn update(&self, n: u64) {
        self.uncounted.fetch_add(n, Ordering::Relaxed);
    }

    /// Only called by the thread that won the tick race in `Meter`.
    fn tick(&self) {
        let count = self.uncounted.swap(0, Ordering::Relaxed);
        let instant_rate = count as f64 / TICK_INTERVAL_SECS as f64;
        if self.initialized.load(Ordering::Relaxed) {
            let rate = self.rate.load(Ordering::Relaxed);
            self.rate
                .store(rate + self.alpha * (instant_rate - rate), Ordering::Relaxed);
        } else {
            self.rate.store(instant_rate, Ordering::Relaxed);
            self.initialized.store(true, Ordering::Relaxed);
        }
    }

    fn rate(&self) -> f64 {
        self.rate.load(Ordering::Relaxed)
    }
}

/// Event throughput with mean and 1/5/15 minute moving average rates.
pub struct Meter {
    clock: Arc<dyn Clock>,
    start_nanos: u64,
    last_tick: AtomicU64,
    count: AtomicU64,
    m1: Ewma,
    m5: Ewma,
    m15: Ewma,
}

impl Meter {
    pub fn new() -> Self {
        Meter::with_clock(Arc::new(MonotonicClock::new()))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let start_nanos = clock.tick_nanos();
        Meter {
            clock,
            start_nanos,
            last_tick: AtomicU64::new(start_nanos),
            count: AtomicU64::new(0),
            m1: Ewma::with_minutes(1.0),
            m5: Ewma::with_minutes(5.0),
            m15: Ewma::with_minutes(15.0),
        }
    }

    #[inline]
    pub fn mark(&self) {
        self.mark_n(1);
    }

    pub fn mark_n(&self, n: u64) {
        self.tick_if_necessary();
        self.count.fetch_add(n, Ordering::Relaxed);
        self.m1.update(n);
        self.m5.update(n);
        self.m15.update(n);
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn mean_rate(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            return 0.0;
        }
        let elapsed = self.clock.tick_nanos().saturating_sub(self.start_nanos);
        if elapsed == 0 {
            return 0.0;
        }
        count as f64 / elapsed as f64 * 1e9
    }

    pub fn one_minute_rate(&self) -> f64 {
        self.tick_if_necessary();
        self.m1.rate()
    }

    pub fn five_minute_rate(&self) -> f64 {
        self.tick_if_necessary();
        self.m5.rate()
    }

    pub fn fifteen_minute_rate(&self) -> f64 {
        self.tick_if_necessary();
        self.m15.rate()
    }

    fn tick_if_necessary(&self) {
        let old_tick = self.last_tick.load(Ordering::Acquire);
        let new_tick = self.clock.tick_nanos();
        let age = new_tick.saturating_sub(old_tick);
        if age < TICK_INTERVAL_NANOS {
            return;
        }

        let new_interval_start = new_tick - age % TICK_INTERVAL_NANOS;
        if self
            .last_tick
            .compare_exchange(
                old_tick,
                new_interval_start,
                Ordering::AcqRel,
                Ordering::Relaxed,
            )
            .is_ok()
        {
            let required_ticks = age / TICK_INTERVAL_NANOS;
            for _ in 0..required_ticks {
                self.m1.tick();
                self.m5.tick();
                self.m15.tick();
            }
        }
    }
}

impl Default for Meter {
    fn default() -> Self {
        Meter::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ManualClock;
    use std::time::Duration;

    #[test]
    fn no_events() {
        let clock = Arc::new(ManualClock::default());
        let meter = Meter::with_clock(clock.clone());
        clock.advance(Duration::from_secs(10));
        assert_eq!(meter.count(), 0);
        assert_eq!(meter.mean_rate(), 0.0);
        assert_eq!(meter.one_minute_rate(), 0.0);
        assert_eq!(meter.fifteen_minute_rate(), 0.0);
    }

    #[test]
    fn mean_rate() {
        let clock = Arc::new(ManualClock::default());
        let meter = Meter::with_clock(clock.clone());
        meter.mark_n(20);
        clock.advance(Duration::from_secs(10));
        assert_eq!(meter.count(), 20);
        assert!((meter.mean_rate() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn first_tick_takes_instant_rate() {
        let clock = Arc::new(ManualClock::default());
        let meter = Meter::with_clock(clock.clone());
        meter.mark_n(10);
        clock.advance(Duration::from_secs(5));
        // 10 events in one 5s tick
        assert!((meter.one_minute_rate() - 2.0).abs() < 1e-9);
        assert!((meter.five_minute_rate() - 2.0).abs() < 1e-9);
        assert!((meter.fifteen_minute_rate() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn rates_decay() {
        let clock = Arc::new(ManualClock::default());
        let meter = Meter::with_clock(clock.clone());
        meter.mark_n(10);
        clock.advance(Duration::from_secs(5));
        let m1 = meter.one_minute_rate();
        let m15 = meter.fifteen_minute_rate();

        clock.advance(Duration::from_secs(60));
        let m1_later = meter.one_minute_rate();
        let m15_later = meter.fifteen_minute_rate();
        assert!(m1_later < m1);
        assert!(m15_later < m15);
        // the short window forgets faster
        assert!(m1_later / m1 < m15_later / m15);
        // one minute of idle ticks leaves about e^-1 of the 1 minute rate
        assert!((m1_later / m1 - (-1.0f64).exp()).abs() < 0.01);
    }
}
