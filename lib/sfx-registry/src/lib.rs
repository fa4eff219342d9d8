/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::sync::Arc;

mod clock;
pub use clock::{Clock, ManualClock, MonotonicClock};

mod gauge;
pub use gauge::Gauge;

mod counter;
pub use counter::{Counter, CounterMode};

mod histogram;
pub use histogram::{Histogram, SamplingSnapshot};

mod meter;
pub use meter::Meter;

mod timer;
pub use timer::Timer;

mod filter;
pub use filter::{AllMetrics, MetricFilter, PrefixFilter};

mod registry;
pub use registry::{Metric, MetricRegistry, RegistryError};

mod snapshot;
pub use snapshot::Snapshot;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetricKind {
    Gauge,
    Counter,
    Histogram,
    Meter,
    Timer,
}

impl MetricKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
            MetricKind::Counter => "counter",
            MetricKind::Histogram => "histogram",
            MetricKind::Meter => "meter",
            MetricKind::Timer => "timer",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable identity of a registered metric.
///
/// Names are unique within one registry, the kind is kept so that a name
/// reused for another kind after removal is a different metric.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MetricId {
    kind: MetricKind,
    name: Arc<str>,
}

impl MetricId {
    pub fn new(kind: MetricKind, name: &str) -> Self {
        MetricId {
            kind,
            name: Arc::from(name),
        }
    }

    pub(crate) fn with_shared_name(kind: MetricKind, name: Arc<str>) -> Self {
        MetricId { kind, name }
    }

    #[inline]
    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.name)
    }
}
