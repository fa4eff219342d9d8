/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use log::warn;

use super::{
    AuthToken, DataPointReceiverFactory, OnSendErrorHandler, SendFailure, Transport,
    TransportSession,
};
use crate::{DataPoint, SendError};

pub const DEFAULT_MAX_BATCH_SIZE: usize = 2000;

/// Collect the points of a session and deliver them on close.
pub struct AggregateMetricSender {
    default_source_name: String,
    auth_token: Arc<dyn AuthToken>,
    receiver_factory: Arc<dyn DataPointReceiverFactory>,
    error_handlers: Vec<Arc<dyn OnSendErrorHandler>>,
    max_batch_size: usize,

    create_instant: Instant,
    last_error_report: AtomicU64,
}

impl AggregateMetricSender {
    pub fn new(
        default_source_name: &str,
        auth_token: Arc<dyn AuthToken>,
        receiver_factory: Arc<dyn DataPointReceiverFactory>,
    ) -> Self {
        AggregateMetricSender {
            default_source_name: default_source_name.to_string(),
            auth_token,
            receiver_factory,
            error_handlers: Vec::new(),
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            create_instant: Instant::now(),
            last_error_report: AtomicU64::new(0),
        }
    }

    pub fn with_error_handler(mut self, handler: Arc<dyn OnSendErrorHandler>) -> Self {
        self.error_handlers.push(handler);
        self
    }

    pub fn with_max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size.max(1);
        self
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    fn send(&self, points: Vec<DataPoint>) -> Result<(), SendError> {
        if points.is_empty() {
            return Ok(());
        }

        let token = match self.auth_token.token() {
            Ok(token) => token,
            Err(e) => return Err(self.handle_send_error(points, e)),
        };
        let mut receiver = match self.receiver_factory.create_receiver() {
            Ok(r) => r,
            Err(e) => return Err(self.handle_send_error(points, e)),
        };

        let mut first_error = None;
        for batch in points.chunks(self.max_batch_size) {
            if let Err(e) = receiver.add_data_points(&token, batch) {
                let e = self.handle_send_error(batch.to_vec(), e);
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Notify every handler, and give back the error for the caller.
    fn handle_send_error(&self, data_points: Vec<DataPoint>, error: SendError) -> SendError {
        let time_slice = self.create_instant.elapsed().as_secs().rotate_right(6); // every 64s
        if self.last_error_report.swap(time_slice, Ordering::Relaxed) != time_slice {
            warn!(
                "failed to send {} data points: {error}",
                data_points.len()
            );
        }

        let failure = SendFailure { data_points, error };
        for handler in &self.error_handlers {
            handler.handle_error(&failure);
        }
        failure.error
    }
}

impl Transport for AggregateMetricSender {
    fn default_source_name(&self) -> &str {
        &self.default_source_name
    }

    fn create_session(&self) -> Box<dyn TransportSession + '_> {
        Box::new(AggregateSession {
            sender: self,
            points: Vec::with_capacity(32),
        })
    }
}

struct AggregateSession<'a> {
    sender: &'a AggregateMetricSender,
    points: Vec<DataPoint>,
}

impl TransportSession for AggregateSession<'_> {
    fn add_data_point(&mut self, point: DataPoint) {
        self.points.push(point);
    }

    /// Failed batches have been handed to the error handlers already when
    /// this returns an error.
    fn close(self: Box<Self>) -> Result<(), SendError> {
        let AggregateSession { sender, points } = *self;
        sender.send(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::Mutex;

    use crate::MetricType;
    use crate::transport::{
        DataPointReceiver, MemoryDataPointReceiverFactory, StaticAuthToken,
    };
    use sfx_types::{MetricTagMap, MetricValue};

    fn point(i: usize) -> DataPoint {
        DataPoint {
            metric: format!("m{i}"),
            metric_type: MetricType::Gauge,
            value: MetricValue::Unsigned(i as u64),
            dimensions: MetricTagMap::default(),
            timestamp_ms: 0,
        }
    }

    struct BrokenFactory;

    struct BrokenReceiver;

    impl DataPointReceiver for BrokenReceiver {
        fn add_data_points(
            &mut self,
            _token: &str,
            _points: &[DataPoint],
        ) -> Result<(), SendError> {
            Err(SendError::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "refused",
            )))
        }
    }

    impl DataPointReceiverFactory for BrokenFactory {
        fn create_receiver(&self) -> Result<Box<dyn DataPointReceiver>, SendError> {
            Ok(Box::new(BrokenReceiver))
        }
    }

    #[test]
    fn batches() {
        let factory = MemoryDataPointReceiverFactory::new();
        let sender = AggregateMetricSender::new(
            "host-a",
            Arc::new(StaticAuthToken::new("token")),
            Arc::new(factory.clone()),
        )
        .with_max_batch_size(2);
        assert_eq!(sender.default_source_name(), "host-a");

        let mut session = sender.create_session();
        for i in 0..5 {
            session.add_data_point(point(i));
        }
        session.close().unwrap();

        let batches = factory.batches();
        let sizes: Vec<_> = batches.iter().map(|b| b.data_points.len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        assert!(batches.iter().all(|b| b.auth_token == "token"));
    }

    #[test]
    fn empty_session() {
        let factory = MemoryDataPointReceiverFactory::new();
        let sender = AggregateMetricSender::new(
            "host-a",
            Arc::new(StaticAuthToken::new("token")),
            Arc::new(factory.clone()),
        );
        sender.create_session().close().unwrap();
        assert!(factory.batches().is_empty());
    }

    #[test]
    fn failure_handlers() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_by_handler = seen.clone();
        let handler = move |failure: &SendFailure| {
            seen_by_handler
                .lock()
                .unwrap()
                .push(failure.data_points.len());
        };
        let sender = AggregateMetricSender::new(
            "host-a",
            Arc::new(StaticAuthToken::new("token")),
            Arc::new(BrokenFactory),
        )
        .with_max_batch_size(3)
        .with_error_handler(Arc::new(handler));

        let mut session = sender.create_session();
        for i in 0..4 {
            session.add_data_point(point(i));
        }
        let e = session.close().unwrap_err();
        assert!(matches!(e, SendError::Io(_)));
        assert_eq!(*seen.lock().unwrap(), vec![3, 1]);
    }

    #[test]
    fn bad_token() {
        let count = Arc::new(Mutex::new(0));
        let count_by_handler = count.clone();
        let factory = MemoryDataPointReceiverFactory::new();
        let sender = AggregateMetricSender::new(
            "host-a",
            Arc::new(StaticAuthToken::new("")),
            Arc::new(factory.clone()),
        )
        .with_error_handler(Arc::new(move |failure: &SendFailure| {
            assert!(matches!(failure.error, SendError::AuthToken(_)));
            *count_by_handler.lock().unwrap() += 1;
        }));

        let mut session = sender.create_session();
        session.add_data_point(point(0));
        assert!(session.close().is_err());
        assert_eq!(*count.lock().unwrap(), 1);
        assert!(factory.batches().is_empty());
    }
}
