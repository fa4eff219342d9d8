/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Mutex;

use hdrhistogram::CreationError;

const SIGNIFICANT_FIGURES: u8 = 3;
/// Largest value the auto resizing histogram is able to track.
const MAX_TRACKABLE: u64 = u64::MAX / 2;

/// All time distribution of recorded values.
pub struct Histogram {
    inner: Mutex<hdrhistogram::Histogram<u64>>,
}

impl Histogram {
    pub fn new() -> Result<Self, CreationError> {
        Histogram::with_sigfig(SIGNIFICANT_FIGURES)
    }

    pub fn with_sigfig(sigfig: u8) -> Result<Self, CreationError> {
        let mut inner = hdrhistogram::Histogram::new(sigfig)?;
        inner.auto(true);
        Ok(Histogram {
            inner: Mutex::new(inner),
        })
    }

    /// Record `value`, values above the trackable range are clamped.
    pub fn update(&self, value: u64) {
        let mut inner = self.inner.lock().unwrap();
        // in range and auto resized, this only fails on counter overflow
        let _ = inner.record(value.min(MAX_TRACKABLE));
    }

    pub fn count(&self) -> u64 {
        let inner = self.inner.lock().unwrap();
        inner.len()
    }

    pub fn snapshot(&self) -> SamplingSnapshot {
        let inner = self.inner.lock().unwrap();
        SamplingSnapshot::new(&inner)
    }
}

/// Statistics of a histogram at one point in time.
///
/// An empty distribution reports zero for every statistic.
#[derive(Clone, Debug, PartialEq)]
pub struct SamplingSnapshot {
    count: u64,
    min: u64,
    max: u64,
    mean: f64,
    std_dev: f64,
    quantiles: [(f64, u64); 6],
}

impl SamplingSnapshot {
    const QUANTILES: [f64; 6] = [0.5, 0.75, 0.95, 0.98, 0.99, 0.999];

    fn new(h: &hdrhistogram::Histogram<u64>) -> Self {
        if h.is_empty() {
            return SamplingSnapshot {
                count: 0,
                min: 0,
                max: 0,
                mean: 0.0,
                std_dev: 0.0,
                quantiles: Self::QUANTILES.map(|q| (q, 0)),
            };
        }

        let quantiles = Self::QUANTILES.map(|q| (q, h.value_at_quantile(q)));
        SamplingSnapshot {
            count: h.len(),
            min: h.min(),
            max: h.max(),
            mean: h.mean(),
            std_dev: h.stdev(),
            quantiles,
        }
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.count
    }

    #[inline]
    pub fn min(&self) -> u64 {
        self.min
    }

    #[inline]
    pub fn max(&self) -> u64 {
        self.max
    }

    #[inline]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    #[inline]
    pub fn std_dev(&self) -> f64 {
        self.std_dev
    }

    #[inline]
    pub fn median(&self) -> u64 {
        self.value_at_quantile(0.5)
    }

    /// Value at one of the precomputed quantiles: 0.5, 0.75, 0.95, 0.98,
    /// 0.99 and 0.999. Other quantiles resolve to the next precomputed one.
    pub fn value_at_quantile(&self, quantile: f64) -> u64 {
        for (q, v) in &self.quantiles {
            if quantile <= *q {
                return *v;
            }
        }
        self.max
    }
}
