/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use log::debug;

use sfx_registry::{
    Counter, CounterMode, Histogram, Meter, MetricId, SamplingSnapshot, Snapshot, Timer,
};
use sfx_types::{MetricTagMap, MetricTagValue, MetricValue};

use crate::transport::{Transport, TransportSession};
use crate::{
    CounterDeltas, DataPoint, DetailSet, MetricDetails, MetricMetadata, MetricType, ReportError,
    SOURCE_DIMENSION,
};

/// Convert one registry snapshot into data points per flush.
pub struct ReportingSession {
    transport: Arc<dyn Transport>,
    details: DetailSet,
    metadata: Arc<MetricMetadata>,
    rate_factor: f64,
    duration_factor: f64,
}

impl ReportingSession {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        ReportingSession {
            transport,
            details: DetailSet::all(),
            metadata: Arc::new(MetricMetadata::new()),
            rate_factor: 1.0,
            duration_factor: 1_000_000.0,
        }
    }

    pub fn with_details(mut self, details: DetailSet) -> Self {
        self.details = details;
        self
    }

    pub fn with_metadata(mut self, metadata: Arc<MetricMetadata>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Rates are reported as events per `unit`.
    pub fn with_rate_unit(mut self, unit: Duration) -> Self {
        self.rate_factor = unit.as_secs_f64();
        self
    }

    /// Timer durations are reported as multiples of `unit`.
    pub fn with_duration_unit(mut self, unit: Duration) -> Self {
        self.duration_factor = unit.as_nanos() as f64;
        self
    }

    pub fn details(&self) -> DetailSet {
        self.details
    }

    pub fn metadata(&self) -> &Arc<MetricMetadata> {
        &self.metadata
    }

    pub fn flush(
        &self,
        snapshot: &Snapshot,
        deltas: &mut dyn CounterDeltas,
    ) -> Result<(), ReportError> {
        self.flush_at(snapshot, deltas, chrono::Utc::now().timestamp_millis())
    }

    /// Run one flush with all points stamped at `timestamp_ms`.
    ///
    /// The transport session is closed on every path, including a panic
    /// in a gauge or filter. Close errors are only logged, as the
    /// transport reports send failures on its own.
    pub fn flush_at(
        &self,
        snapshot: &Snapshot,
        deltas: &mut dyn CounterDeltas,
        timestamp_ms: i64,
    ) -> Result<(), ReportError> {
        let mut release = SessionRelease {
            session: Some(self.transport.create_session()),
        };
        let Some(session) = release.session.as_deref_mut() else {
            return Ok(());
        };
        self.add_all(snapshot, deltas, timestamp_ms, session)
    }

    fn add_all(
        &self,
        snapshot: &Snapshot,
        deltas: &mut dyn CounterDeltas,
        timestamp_ms: i64,
        session: &mut dyn TransportSession,
    ) -> Result<(), ReportError> {
        let default_source = self.transport.default_source_name();
        let default_source = MetricTagValue::from_str(default_source).map_err(|e| {
            ReportError::InvalidSourceName {
                name: default_source.to_string(),
                source: e,
            }
        })?;
        let mut builder = PointBuilder {
            session,
            metadata: &self.metadata,
            default_source,
            timestamp_ms,
        };

        for (id, gauge) in snapshot.gauges() {
            let value = gauge
                .value()
                .map_err(|e| ReportError::construction(id.name(), e))?;
            builder.add(&id, None, MetricType::Gauge, value)?;
        }
        for (id, counter) in snapshot.counters() {
            self.add_counter(&mut builder, &id, counter, deltas)?;
        }
        for (id, histogram) in snapshot.histograms() {
            self.add_histogram(&mut builder, &id, histogram)?;
        }
        for (id, meter) in snapshot.meters() {
            self.add_meter(&mut builder, &id, meter)?;
        }
        for (id, timer) in snapshot.timers() {
            self.add_timer(&mut builder, &id, timer)?;
        }
        Ok(())
    }

    fn add_counter(
        &self,
        builder: &mut PointBuilder<'_>,
        id: &MetricId,
        counter: &Counter,
        deltas: &mut dyn CounterDeltas,
    ) -> Result<(), ReportError> {
        let count = counter.count();
        match counter.mode() {
            CounterMode::Incremental => {
                let delta = deltas.record_and_delta(id, counter.instance(), count);
                builder.add(id, None, MetricType::Counter, MetricValue::Signed(delta))
            }
            CounterMode::Cumulative => builder.add(
                id,
                None,
                MetricType::CumulativeCounter,
                MetricValue::Signed(count),
            ),
        }
    }

    fn add_histogram(
        &self,
        builder: &mut PointBuilder<'_>,
        id: &MetricId,
        histogram: &Histogram,
    ) -> Result<(), ReportError> {
        let mut snapshot = None;
        for detail in self.details.histogram_facets() {
            let value = if detail == MetricDetails::Count {
                MetricValue::Unsigned(histogram.count())
            } else {
                let snapshot = snapshot.get_or_insert_with(|| histogram.snapshot());
                MetricValue::Double(sampling_value(snapshot, detail, 1.0))
            };
            builder.add_detail(id, detail, value)?;
        }
        Ok(())
    }

    fn add_meter(
        &self,
        builder: &mut PointBuilder<'_>,
        id: &MetricId,
        meter: &Meter,
    ) -> Result<(), ReportError> {
        for detail in self.details.meter_facets() {
            let value = match detail {
                MetricDetails::Count => MetricValue::Unsigned(meter.count()),
                MetricDetails::RateMean => self.convert_rate(meter.mean_rate()),
                MetricDetails::Rate1Min => self.convert_rate(meter.one_minute_rate()),
                MetricDetails::Rate5Min => self.convert_rate(meter.five_minute_rate()),
                MetricDetails::Rate15Min => self.convert_rate(meter.fifteen_minute_rate()),
                _ => continue,
            };
            builder.add_detail(id, detail, value)?;
        }
        Ok(())
    }

    fn add_timer(
        &self,
        builder: &mut PointBuilder<'_>,
        id: &MetricId,
        timer: &Timer,
    ) -> Result<(), ReportError> {
        let mut snapshot = None;
        for detail in self.details.timer_facets() {
            let value = match detail {
                MetricDetails::Count => MetricValue::Unsigned(timer.count()),
                MetricDetails::RateMean => self.convert_rate(timer.mean_rate()),
                MetricDetails::Rate1Min => self.convert_rate(timer.one_minute_rate()),
                MetricDetails::Rate5Min => self.convert_rate(timer.five_minute_rate()),
                MetricDetails::Rate15Min => self.convert_rate(timer.fifteen_minute_rate()),
                _ => {
                    let snapshot = snapshot.get_or_insert_with(|| timer.snapshot());
                    MetricValue::Double(sampling_value(snapshot, detail, self.duration_factor))
                }
            };
            builder.add_detail(id, detail, value)?;
        }
        Ok(())
    }

    #[inline]
    fn convert_rate(&self, rate: f64) -> MetricValue {
        MetricValue::Double(rate * self.rate_factor)
    }
}

/// Closes the transport session when dropped, also while unwinding.
struct SessionRelease<'a> {
    session: Option<Box<dyn TransportSession + 'a>>,
}

impl Drop for SessionRelease<'_> {
    fn drop(&mut self) {
        if let Some(session) = self.session.take()
            && let Err(e) = session.close()
        {
            debug!("error when closing metrics transport session: {e}");
        }
    }
}

fn sampling_value(snapshot: &SamplingSnapshot, detail: MetricDetails, divisor: f64) -> f64 {
    let v = match detail {
        MetricDetails::Max => snapshot.max() as f64,
        MetricDetails::Min => snapshot.min() as f64,
        MetricDetails::StdDev => snapshot.std_dev(),
        MetricDetails::Mean => snapshot.mean(),
        _ => match detail.quantile() {
            Some(q) => snapshot.value_at_quantile(q) as f64,
            None => 0.0,
        },
    };
    v / divisor
}

struct PointBuilder<'a> {
    session: &'a mut dyn TransportSession,
    metadata: &'a MetricMetadata,
    default_source: MetricTagValue,
    timestamp_ms: i64,
}

impl PointBuilder<'_> {
    fn add_detail(
        &mut self,
        id: &MetricId,
        detail: MetricDetails,
        value: MetricValue,
    ) -> Result<(), ReportError> {
        self.add(id, Some(detail), detail.metric_type(), value)
    }

    fn add(
        &mut self,
        id: &MetricId,
        detail: Option<MetricDetails>,
        metric_type: MetricType,
        value: MetricValue,
    ) -> Result<(), ReportError> {
        let entry = self.metadata.get(id);

        let base_name = entry.as_ref().and_then(|e| e.name()).unwrap_or(id.name());
        let metric = match detail {
            Some(detail) => format!("{base_name}.{}", detail.description()),
            None => base_name.to_string(),
        };

        let mut dimensions = MetricTagMap::default();
        let source = match &entry {
            Some(entry) => {
                dimensions.extend(entry.tags());
                match entry.source() {
                    Some(s) => MetricTagValue::from_str(s).map_err(|e| {
                        ReportError::construction(id.name(), anyhow::Error::new(e))
                    })?,
                    None => self.default_source.clone(),
                }
            }
            None => self.default_source.clone(),
        };
        dimensions.insert(SOURCE_DIMENSION, source);

        self.session.add_data_point(DataPoint {
            metric,
            metric_type,
            value,
            dimensions,
            timestamp_ms: self.timestamp_ms,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CounterDeltaTracker;
    use crate::transport::{
        AggregateMetricSender, MemoryDataPointReceiverFactory, StaticAuthToken,
    };
    use sfx_registry::{AllMetrics, MetricKind, MetricRegistry};

    fn setup() -> (MemoryDataPointReceiverFactory, Arc<dyn Transport>) {
        let factory = MemoryDataPointReceiverFactory::new();
        let sender = AggregateMetricSender::new(
            "host-a",
            Arc::new(StaticAuthToken::new("token")),
            Arc::new(factory.clone()),
        );
        (factory, Arc::new(sender))
    }

    #[test]
    fn gauge_and_counters() {
        let (factory, transport) = setup();
        let session = ReportingSession::new(transport);
        let registry = MetricRegistry::new();
        registry
            .register_gauge("threads", || -> anyhow::Result<MetricValue> {
                Ok(MetricValue::Unsigned(8))
            })
            .unwrap();
        registry.counter("total").unwrap().inc_by(3);
        registry.incremental_counter("delta").unwrap().inc_by(4);

        let mut tracker = CounterDeltaTracker::new();
        session
            .flush_at(&registry.snapshot(&AllMetrics), &mut tracker, 1000)
            .unwrap();

        let points = factory.data_points();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].metric, "threads");
        assert_eq!(points[0].metric_type, MetricType::Gauge);
        assert_eq!(points[0].value, MetricValue::Unsigned(8));
        assert_eq!(points[0].source(), Some("host-a"));
        assert_eq!(points[0].timestamp_ms, 1000);
        // counters in name order
        assert_eq!(points[1].metric, "delta");
        assert_eq!(points[1].metric_type, MetricType::Counter);
        assert_eq!(points[1].value, MetricValue::Signed(4));
        assert_eq!(points[2].metric, "total");
        assert_eq!(points[2].metric_type, MetricType::CumulativeCounter);
        assert_eq!(points[2].value, MetricValue::Signed(3));
    }

    #[test]
    fn histogram_facets() {
        let (factory, transport) = setup();
        let details = [MetricDetails::Max, MetricDetails::Count, MetricDetails::Rate1Min]
            .into_iter()
            .collect();
        let session = ReportingSession::new(transport).with_details(details);
        let registry = MetricRegistry::new();
        let h = registry.histogram("size").unwrap();
        h.update(10);
        h.update(20);

        let mut tracker = CounterDeltaTracker::new();
        session
            .flush_at(&registry.snapshot(&AllMetrics), &mut tracker, 0)
            .unwrap();

        let points = factory.data_points();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].metric, "size.max");
        assert_eq!(points[0].metric_type, MetricType::Gauge);
        assert_eq!(points[0].value, MetricValue::Double(20.0));
        assert_eq!(points[1].metric, "size.count");
        assert_eq!(points[1].metric_type, MetricType::CumulativeCounter);
        assert_eq!(points[1].value, MetricValue::Unsigned(2));
    }

    #[test]
    fn timer_units() {
        let (factory, transport) = setup();
        let details = [MetricDetails::Max].into_iter().collect();
        let session = ReportingSession::new(transport)
            .with_details(details)
            .with_duration_unit(Duration::from_micros(1));
        let registry = MetricRegistry::new();
        registry
            .timer("rpc")
            .unwrap()
            .update(Duration::from_micros(1500));

        let mut tracker = CounterDeltaTracker::new();
        session
            .flush_at(&registry.snapshot(&AllMetrics), &mut tracker, 0)
            .unwrap();

        let points = factory.data_points();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].metric, "rpc.max");
        let v = points[0].value.as_f64();
        // 3 significant figures
        assert!((1498.0..=1502.0).contains(&v), "max is {v}");
    }

    #[test]
    fn meter_rates() {
        let (factory, transport) = setup();
        let session = ReportingSession::new(transport).with_rate_unit(Duration::from_secs(60));
        let registry = MetricRegistry::new();
        registry.meter("events").unwrap();

        let mut tracker = CounterDeltaTracker::new();
        session
            .flush_at(&registry.snapshot(&AllMetrics), &mut tracker, 0)
            .unwrap();

        let names: Vec<_> = factory.data_points().into_iter().map(|p| p.metric).collect();
        assert_eq!(
            names,
            vec![
                "events.count",
                "events.rate.mean",
                "events.rate.1min",
                "events.rate.5min",
                "events.rate.15min",
            ]
        );
    }

    #[test]
    fn metadata() {
        let (factory, transport) = setup();
        let metadata = Arc::new(MetricMetadata::new());
        let id = MetricId::new(MetricKind::Counter, "hits");
        metadata.set_name(&id, "cache.hits");
        metadata.set_source(&id, "cache-01");
        metadata.add_tag(&id, "region", "eu").unwrap();
        let session = ReportingSession::new(transport).with_metadata(metadata.clone());

        let registry = MetricRegistry::new();
        registry.counter("hits").unwrap().inc();
        registry.counter("misses").unwrap().inc();

        let mut tracker = CounterDeltaTracker::new();
        session
            .flush_at(&registry.snapshot(&AllMetrics), &mut tracker, 0)
            .unwrap();

        let points = factory.data_points();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].metric, "cache.hits");
        assert_eq!(points[0].source(), Some("cache-01"));
        assert_eq!(
            points[0].dimensions.display().to_string(),
            "region=eu,sf_source=cache-01"
        );
        assert_eq!(points[1].metric, "misses");
        assert_eq!(points[1].source(), Some("host-a"));
        assert_eq!(points[1].dimensions.len(), 1);

        metadata.set_source(&id, "bad source");
        let e = session
            .flush_at(&registry.snapshot(&AllMetrics), &mut tracker, 0)
            .unwrap_err();
        assert_eq!(e.metric(), Some("hits"));
    }

    #[test]
    fn invalid_default_source() {
        let factory = MemoryDataPointReceiverFactory::new();
        let sender = AggregateMetricSender::new(
            "bad source",
            Arc::new(StaticAuthToken::new("token")),
            Arc::new(factory.clone()),
        );
        let session = ReportingSession::new(Arc::new(sender));
        let registry = MetricRegistry::new();
        registry.counter("hits").unwrap();

        let mut tracker = CounterDeltaTracker::new();
        let e = session
            .flush_at(&registry.snapshot(&AllMetrics), &mut tracker, 0)
            .unwrap_err();
        assert!(matches!(e, ReportError::InvalidSourceName { .. }));
        assert!(factory.batches().is_empty());
    }
}
