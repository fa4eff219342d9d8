/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// How a counter is reported, fixed when the counter is registered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CounterMode {
    /// Report the change since the previous report.
    Incremental,
    /// Report the running total.
    Cumulative,
}

pub struct Counter {
    mode: CounterMode,
    instance: u64,
    count: AtomicI64,
}

impl Counter {
    pub fn new(mode: CounterMode) -> Self {
        Counter {
            mode,
            instance: NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed),
            count: AtomicI64::new(0),
        }
    }

    #[inline]
    pub fn mode(&self) -> CounterMode {
        self.mode
    }

    /// Process wide serial of this counter.
    ///
    /// A counter removed and registered again under the same name gets a
    /// new serial, so state kept for the old one can be told apart.
    #[inline]
    pub fn instance(&self) -> u64 {
        self.instance
    }

    #[inline]
    pub fn inc(&self) {
        self.inc_by(1);
    }

    #[inline]
    pub fn inc_by(&self, n: i64) {
        self.count.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub fn dec(&self) {
        self.dec_by(1);
    }

    #[inline]
    pub fn dec_by(&self, n: i64) {
        self.count.fetch_sub(n, Ordering::Relaxed);
    }

    /// The running total since creation, for both modes.
    #[inline]
    pub fn count(&self) -> i64 {
        self.count.load(Ordering::Relaxed)
    }
}
