/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;
use std::time::{Duration, Instant};

use hdrhistogram::CreationError;

use crate::{Clock, Histogram, Meter, MonotonicClock, SamplingSnapshot};

/// Duration distribution in nanoseconds plus the invocation rate.
pub struct Timer {
    histogram: Histogram,
    meter: Meter,
}

impl Timer {
    pub fn new() -> Result<Self, CreationError> {
        Timer::with_clock(Arc::new(MonotonicClock::new()))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Result<Self, CreationError> {
        Ok(Timer {
            histogram: Histogram::new()?,
            meter: Meter::with_clock(clock),
        })
    }

    pub fn update(&self, dur: Duration) {
        let nanos = u64::try_from(dur.as_nanos()).unwrap_or(u64::MAX);
        self.histogram.update(nanos);
        self.meter.mark();
    }

    /// Run `f` and record how long it took.
    pub fn time<T, F>(&self, f: F) -> T
    where
        F: FnOnce() -> T,
    {
        let start = Instant::now();
        let r = f();
        self.update(start.elapsed());
        r
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.meter.count()
    }

    /// Duration statistics, in nanoseconds.
    #[inline]
    pub fn snapshot(&self) -> SamplingSnapshot {
        self.histogram.snapshot()
    }

    #[inline]
    pub fn mean_rate(&self) -> f64 {
        self.meter.mean_rate()
    }

    #[inline]
    pub fn one_minute_rate(&self) -> f64 {
        self.meter.one_minute_rate()
    }

    #[inline]
    pub fn five_minute_rate(&self) -> f64 {
        self.meter.five_minute_rate()
    }

    #[inline]
    pub fn fifteen_minute_rate(&self) -> f64 {
        self.meter.fifteen_minute_rate()
    }
}
