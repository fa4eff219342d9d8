/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;

use sfx_types::{MetricTagMap, MetricTagName, MetricValue};

/// Dimension carrying the name of the reporting host or process.
pub const SOURCE_DIMENSION: MetricTagName = MetricTagName::new_static("sf_source");

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MetricType {
    Gauge,
    Counter,
    CumulativeCounter,
}

impl MetricType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            MetricType::Gauge => "gauge",
            MetricType::Counter => "counter",
            MetricType::CumulativeCounter => "cumulative_counter",
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DataPoint {
    pub metric: String,
    pub metric_type: MetricType,
    pub value: MetricValue,
    pub dimensions: MetricTagMap,
    /// milliseconds since unix epoch
    pub timestamp_ms: i64,
}

impl DataPoint {
    /// The value of the source dimension, if set.
    pub fn source(&self) -> Option<&str> {
        self.dimensions.get(&SOURCE_DIMENSION).map(|v| v.as_str())
    }
}
