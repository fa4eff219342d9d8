/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;

use crate::{Counter, Gauge, Histogram, Meter, MetricId, MetricKind, Timer};

/// The registry content at one point in time, grouped by kind and sorted
/// by name within each kind.
#[derive(Clone, Default)]
pub struct Snapshot {
    pub(crate) gauges: Vec<(Arc<str>, Arc<dyn Gauge>)>,
    pub(crate) counters: Vec<(Arc<str>, Arc<Counter>)>,
    pub(crate) histograms: Vec<(Arc<str>, Arc<Histogram>)>,
    pub(crate) meters: Vec<(Arc<str>, Arc<Meter>)>,
    pub(crate) timers: Vec<(Arc<str>, Arc<Timer>)>,
}

impl Snapshot {
    pub fn gauges(&self) -> impl Iterator<Item = (MetricId, &dyn Gauge)> {
        self.gauges.iter().map(|(name, g)| {
            (
                MetricId::with_shared_name(MetricKind::Gauge, name.clone()),
                g.as_ref(),
            )
        })
    }

    pub fn counters(&self) -> impl Iterator<Item = (MetricId, &Counter)> {
        self.counters.iter().map(|(name, c)| {
            (
                MetricId::with_shared_name(MetricKind::Counter, name.clone()),
                c.as_ref(),
            )
        })
    }

    pub fn histograms(&self) -> impl Iterator<Item = (MetricId, &Histogram)> {
        self.histograms.iter().map(|(name, h)| {
            (
                MetricId::with_shared_name(MetricKind::Histogram, name.clone()),
                h.as_ref(),
            )
        })
    }

    pub fn meters(&self) -> impl Iterator<Item = (MetricId, &Meter)> {
        self.meters.iter().map(|(name, m)| {
            (
                MetricId::with_shared_name(MetricKind::Meter, name.clone()),
                m.as_ref(),
            )
        })
    }

    pub fn timers(&self) -> impl Iterator<Item = (MetricId, &Timer)> {
        self.timers.iter().map(|(name, t)| {
            (
                MetricId::with_shared_name(MetricKind::Timer, name.clone()),
                t.as_ref(),
            )
        })
    }

    pub fn len(&self) -> usize {
        self.gauges.len()
            + self.counters.len()
            + self.histograms.len()
            + self.meters.len()
            + self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
