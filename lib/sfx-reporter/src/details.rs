/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;

use crate::MetricType;

/// Derived statistics that may be reported for histograms, meters and timers.
///
/// The declaration order is the emission order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetricDetails {
    Median,
    Percent75,
    Percent95,
    Percent98,
    Percent99,
    Percent999,
    Max,
    Min,
    StdDev,
    Mean,
    Count,
    RateMean,
    Rate1Min,
    Rate5Min,
    Rate15Min,
}

impl MetricDetails {
    pub const ALL: [MetricDetails; 15] = [
        MetricDetails::Median,
        MetricDetails::Percent75,
        MetricDetails::Percent95,
        MetricDetails::Percent98,
        MetricDetails::Percent99,
        MetricDetails::Percent999,
        MetricDetails::Max,
        MetricDetails::Min,
        MetricDetails::StdDev,
        MetricDetails::Mean,
        MetricDetails::Count,
        MetricDetails::RateMean,
        MetricDetails::Rate1Min,
        MetricDetails::Rate5Min,
        MetricDetails::Rate15Min,
    ];

    /// The label appended to the metric name on the wire.
    pub const fn description(&self) -> &'static str {
        match self {
            MetricDetails::Median => "median",
            MetricDetails::Percent75 => "75th",
            MetricDetails::Percent95 => "95th",
            MetricDetails::Percent98 => "98th",
            MetricDetails::Percent99 => "99th",
            MetricDetails::Percent999 => "999th",
            MetricDetails::Max => "max",
            MetricDetails::Min => "min",
            MetricDetails::StdDev => "stddev",
            MetricDetails::Mean => "mean",
            MetricDetails::Count => "count",
            MetricDetails::RateMean => "rate.mean",
            MetricDetails::Rate1Min => "rate.1min",
            MetricDetails::Rate5Min => "rate.5min",
            MetricDetails::Rate15Min => "rate.15min",
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            MetricDetails::Median => "MEDIAN",
            MetricDetails::Percent75 => "PERCENT_75",
            MetricDetails::Percent95 => "PERCENT_95",
            MetricDetails::Percent98 => "PERCENT_98",
            MetricDetails::Percent99 => "PERCENT_99",
            MetricDetails::Percent999 => "PERCENT_999",
            MetricDetails::Max => "MAX",
            MetricDetails::Min => "MIN",
            MetricDetails::StdDev => "STD_DEV",
            MetricDetails::Mean => "MEAN",
            MetricDetails::Count => "COUNT",
            MetricDetails::RateMean => "RATE_MEAN",
            MetricDetails::Rate1Min => "RATE_1_MIN",
            MetricDetails::Rate5Min => "RATE_5_MIN",
            MetricDetails::Rate15Min => "RATE_15_MIN",
        }
    }

    pub const fn metric_type(&self) -> MetricType {
        match self {
            MetricDetails::Count => MetricType::CumulativeCounter,
            _ => MetricType::Gauge,
        }
    }

    /// Statistics of a sampled distribution.
    pub const fn is_sampling(&self) -> bool {
        matches!(
            self,
            MetricDetails::Median
                | MetricDetails::Percent75
                | MetricDetails::Percent95
                | MetricDetails::Percent98
                | MetricDetails::Percent99
                | MetricDetails::Percent999
                | MetricDetails::Max
                | MetricDetails::Min
                | MetricDetails::StdDev
                | MetricDetails::Mean
        )
    }

    /// Statistics of an event rate.
    pub const fn is_rate(&self) -> bool {
        matches!(
            self,
            MetricDetails::RateMean
                | MetricDetails::Rate1Min
                | MetricDetails::Rate5Min
                | MetricDetails::Rate15Min
        )
    }

    /// The quantile this facet is read at, for percentile facets.
    pub const fn quantile(&self) -> Option<f64> {
        match self {
            MetricDetails::Median => Some(0.5),
            MetricDetails::Percent75 => Some(0.75),
            MetricDetails::Percent95 => Some(0.95),
            MetricDetails::Percent98 => Some(0.98),
            MetricDetails::Percent99 => Some(0.99),
            MetricDetails::Percent999 => Some(0.999),
            _ => None,
        }
    }

    const fn bit(&self) -> u16 {
        1 << (*self as u16)
    }
}

impl fmt::Display for MetricDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

impl FromStr for MetricDetails {
    type Err = anyhow::Error;

    /// Accept either the wire description or the constant name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetricDetails::ALL
            .into_iter()
            .find(|d| d.description() == s || d.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| anyhow!("unknown metric detail {s}"))
    }
}

/// A set of [`MetricDetails`], iterated in declaration order.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DetailSet {
    bits: u16,
}

impl DetailSet {
    pub const fn all() -> Self {
        DetailSet {
            bits: (1 << MetricDetails::ALL.len()) - 1,
        }
    }

    pub const fn empty() -> Self {
        DetailSet { bits: 0 }
    }

    #[inline]
    pub fn insert(&mut self, detail: MetricDetails) {
        self.bits |= detail.bit();
    }

    #[inline]
    pub fn remove(&mut self, detail: MetricDetails) {
        self.bits &= !detail.bit();
    }

    #[inline]
    pub fn contains(&self, detail: MetricDetails) -> bool {
        self.bits & detail.bit() != 0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    pub fn iter(&self) -> impl Iterator<Item = MetricDetails> + '_ {
        MetricDetails::ALL
            .into_iter()
            .filter(|d| self.contains(*d))
    }

    /// Facets of a histogram: the sampling statistics plus the count.
    pub fn histogram_facets(&self) -> impl Iterator<Item = MetricDetails> + '_ {
        self.iter()
            .filter(|d| d.is_sampling() || *d == MetricDetails::Count)
    }

    /// Facets of a meter: the rates plus the count.
    pub fn meter_facets(&self) -> impl Iterator<Item = MetricDetails> + '_ {
        self.iter().filter(|d| d.is_rate() || *d == MetricDetails::Count)
    }

    /// Facets of a timer: everything a histogram or a meter has.
    pub fn timer_facets(&self) -> impl Iterator<Item = MetricDetails> + '_ {
        self.iter()
    }
}

impl Default for DetailSet {
    fn default() -> Self {
        DetailSet::all()
    }
}

impl FromIterator<MetricDetails> for DetailSet {
    fn from_iter<T: IntoIterator<Item = MetricDetails>>(iter: T) -> Self {
        let mut set = DetailSet::empty();
        for d in iter {
            set.insert(d);
        }
        set
    }
}

impl fmt::Debug for DetailSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
