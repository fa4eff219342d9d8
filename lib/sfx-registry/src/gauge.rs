/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use sfx_types::MetricValue;

/// An instantaneous reading.
///
/// A read error aborts the flush that reads it, so implementations that
/// may fail transiently should fall back to a stable value themselves.
pub trait Gauge: Send + Sync {
    fn value(&self) -> anyhow::Result<MetricValue>;
}

impl<F> Gauge for F
where
    F: Fn() -> anyhow::Result<MetricValue> + Send + Sync,
{
    fn value(&self) -> anyhow::Result<MetricValue> {
        self()
    }
}
