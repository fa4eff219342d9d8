/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use hdrhistogram::CreationError;
use thiserror::Error;

use crate::{
    Clock, Counter, CounterMode, Gauge, Histogram, Meter, MetricFilter, MetricId, MetricKind,
    MonotonicClock, Snapshot, Timer,
};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("metric {name} already registered as {existing}")]
    KindMismatch { name: String, existing: &'static str },
    #[error("gauge {0} already registered")]
    DuplicateGauge(String),
    #[error("failed to create histogram: {0}")]
    Histogram(#[from] CreationError),
}

#[derive(Clone)]
pub enum Metric {
    Gauge(Arc<dyn Gauge>),
    Counter(Arc<Counter>),
    Histogram(Arc<Histogram>),
    Meter(Arc<Meter>),
    Timer(Arc<Timer>),
}

impl Metric {
    pub fn kind(&self) -> MetricKind {
        match self {
            Metric::Gauge(_) => MetricKind::Gauge,
            Metric::Counter(_) => MetricKind::Counter,
            Metric::Histogram(_) => MetricKind::Histogram,
            Metric::Meter(_) => MetricKind::Meter,
            Metric::Timer(_) => MetricKind::Timer,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Metric::Counter(c) => match c.mode() {
                CounterMode::Incremental => "incremental counter",
                CounterMode::Cumulative => "cumulative counter",
            },
            _ => self.kind().as_str(),
        }
    }
}

/// Named metrics of one process.
///
/// Each name maps to exactly one metric, whatever its kind.
pub struct MetricRegistry {
    clock: Arc<dyn Clock>,
    inner: Mutex<BTreeMap<Arc<str>, Metric>>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        MetricRegistry::with_clock(Arc::new(MonotonicClock::new()))
    }

    /// The clock is used by every meter and timer created later.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        MetricRegistry {
            clock,
            inner: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn register_gauge<G>(&self, name: &str, gauge: G) -> Result<(), RegistryError>
    where
        G: Gauge + 'static,
    {
        let mut inner = self.inner.lock().unwrap();
        if let Some(m) = inner.get(name) {
            return match m {
                Metric::Gauge(_) => Err(RegistryError::DuplicateGauge(name.to_string())),
                _ => Err(RegistryError::KindMismatch {
                    name: name.to_string(),
                    existing: m.type_name(),
                }),
            };
        }
        inner.insert(Arc::from(name), Metric::Gauge(Arc::new(gauge)));
        Ok(())
    }

    /// Get or create a counter reported as a running total.
    pub fn counter(&self, name: &str) -> Result<Arc<Counter>, RegistryError> {
        self.counter_with_mode(name, CounterMode::Cumulative)
    }

    /// Get or create a counter reported as the change since the previous report.
    pub fn incremental_counter(&self, name: &str) -> Result<Arc<Counter>, RegistryError> {
        self.counter_with_mode(name, CounterMode::Incremental)
    }

    fn counter_with_mode(
        &self,
        name: &str,
        mode: CounterMode,
    ) -> Result<Arc<Counter>, RegistryError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.get(name) {
            Some(Metric::Counter(c)) if c.mode() == mode => Ok(Arc::clone(c)),
            Some(m) => Err(RegistryError::KindMismatch {
                name: name.to_string(),
                existing: m.type_name(),
            }),
            None => {
                let c = Arc::new(Counter::new(mode));
                inner.insert(Arc::from(name), Metric::Counter(Arc::clone(&c)));
                Ok(c)
            }
        }
    }

    pub fn histogram(&self, name: &str) -> Result<Arc<Histogram>, RegistryError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.get(name) {
            Some(Metric::Histogram(h)) => Ok(Arc::clone(h)),
            Some(m) => Err(RegistryError::KindMismatch {
                name: name.to_string(),
                existing: m.type_name(),
            }),
            None => {
                let h = Arc::new(Histogram::new()?);
                inner.insert(Arc::from(name), Metric::Histogram(Arc::clone(&h)));
                Ok(h)
            }
        }
    }

    pub fn meter(&self, name: &str) -> Result<Arc<Meter>, RegistryError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.get(name) {
            Some(Metric::Meter(m)) => Ok(Arc::clone(m)),
            Some(m) => Err(RegistryError::KindMismatch {
                name: name.to_string(),
                existing: m.type_name(),
            }),
            None => {
                let m = Arc::new(Meter::with_clock(Arc::clone(&self.clock)));
                inner.insert(Arc::from(name), Metric::Meter(Arc::clone(&m)));
                Ok(m)
            }
        }
    }

    pub fn timer(&self, name: &str) -> Result<Arc<Timer>, RegistryError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.get(name) {
            Some(Metric::Timer(t)) => Ok(Arc::clone(t)),
            Some(m) => Err(RegistryError::KindMismatch {
                name: name.to_string(),
                existing: m.type_name(),
            }),
            None => {
                let t = Arc::new(Timer::with_clock(Arc::clone(&self.clock))?);
                inner.insert(Arc::from(name), Metric::Timer(Arc::clone(&t)));
                Ok(t)
            }
        }
    }

    pub fn remove(&self, name: &str) -> Option<(MetricId, Metric)> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .remove_entry(name)
            .map(|(name, m)| (MetricId::with_shared_name(m.kind(), name), m))
    }

    pub fn get(&self, name: &str) -> Option<Metric> {
        let inner = self.inner.lock().unwrap();
        inner.get(name).cloned()
    }

    /// All registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        inner.keys().map(|k| k.to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take the matching metrics, name sorted within each kind.
    pub fn snapshot(&self, filter: &dyn MetricFilter) -> Snapshot {
        let inner = self.inner.lock().unwrap();
        let mut snapshot = Snapshot::default();
        for (name, metric) in inner.iter() {
            let id = MetricId::with_shared_name(metric.kind(), Arc::clone(name));
            if !filter.matches(&id) {
                continue;
            }
            let name = Arc::clone(name);
            match metric {
                Metric::Gauge(g) => snapshot.gauges.push((name, Arc::clone(g))),
                Metric::Counter(c) => snapshot.counters.push((name, Arc::clone(c))),
                Metric::Histogram(h) => snapshot.histograms.push((name, Arc::clone(h))),
                Metric::Meter(m) => snapshot.meters.push((name, Arc::clone(m))),
                Metric::Timer(t) => snapshot.timers.push((name, Arc::clone(t))),
            }
        }
        snapshot
    }
}

impl Default for MetricRegistry {
    fn default() -> Self {
        MetricRegistry::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AllMetrics, PrefixFilter};
    use sfx_types::MetricValue;

    #[test]
    fn get_or_create() {
        let registry = MetricRegistry::new();
        let c1 = registry.counter("requests").unwrap();
        c1.inc();
        let c2 = registry.counter("requests").unwrap();
        assert!(Arc::ptr_eq(&c1, &c2));
        assert_eq!(c2.count(), 1);

        let t1 = registry.timer("latency").unwrap();
        let t2 = registry.timer("latency").unwrap();
        assert!(Arc::ptr_eq(&t1, &t2));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn kind_mismatch() {
        let registry = MetricRegistry::new();
        registry.counter("requests").unwrap();
        assert!(matches!(
            registry.incremental_counter("requests"),
            Err(RegistryError::KindMismatch {
                existing: "cumulative counter",
                ..
            })
        ));
        assert!(matches!(
            registry.meter("requests"),
            Err(RegistryError::KindMismatch { .. })
        ));

        registry
            .register_gauge("threads", || -> anyhow::Result<MetricValue> {
                Ok(MetricValue::Unsigned(8))
            })
            .unwrap();
        assert!(matches!(
            registry.register_gauge("threads", || -> anyhow::Result<MetricValue> {
                Ok(MetricValue::Unsigned(9))
            }),
            Err(RegistryError::DuplicateGauge(_))
        ));
        assert!(matches!(
            registry.histogram("threads"),
            Err(RegistryError::KindMismatch {
                existing: "gauge",
                ..
            })
        ));
    }

    #[test]
    fn remove_and_reuse() {
        let registry = MetricRegistry::new();
        registry.meter("events").unwrap();
        let (id, metric) = registry.remove("events").unwrap();
        assert_eq!(id, MetricId::new(MetricKind::Meter, "events"));
        assert_eq!(metric.kind(), MetricKind::Meter);
        assert!(registry.get("events").is_none());
        assert!(registry.names().is_empty());
        assert!(registry.remove("events").is_none());

        registry.histogram("events").unwrap();
        assert_eq!(registry.get("events").unwrap().kind(), MetricKind::Histogram);
    }

    #[test]
    fn snapshot_sorted_by_kind_and_name() {
        let registry = MetricRegistry::new();
        registry.counter("b.count").unwrap();
        registry.counter("a.count").unwrap();
        registry.incremental_counter("c.count").unwrap();
        registry.timer("z.timer").unwrap();
        registry.timer("m.timer").unwrap();
        registry
            .register_gauge("g", || -> anyhow::Result<MetricValue> {
                Ok(MetricValue::Double(0.5))
            })
            .unwrap();

        let snapshot = registry.snapshot(&AllMetrics);
        assert_eq!(snapshot.len(), 6);
        assert_eq!(
            registry.names(),
            vec!["a.count", "b.count", "c.count", "g", "m.timer", "z.timer"]
        );
        let counters: Vec<_> = snapshot
            .counters()
            .map(|(id, _)| id.name().to_string())
            .collect();
        assert_eq!(counters, vec!["a.count", "b.count", "c.count"]);
        let timers: Vec<_> = snapshot
            .timers()
            .map(|(id, _)| id.name().to_string())
            .collect();
        assert_eq!(timers, vec!["m.timer", "z.timer"]);
        assert_eq!(snapshot.gauges().count(), 1);
        assert_eq!(snapshot.histograms().count(), 0);

        let snapshot = registry.snapshot(&PrefixFilter::new(["a.", "z."]));
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.counters().count(), 1);
        assert_eq!(snapshot.timers().count(), 1);
    }
}
