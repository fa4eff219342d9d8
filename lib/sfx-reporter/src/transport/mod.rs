/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use crate::{DataPoint, SendError};

mod sender;
pub use sender::{AggregateMetricSender, DEFAULT_MAX_BATCH_SIZE};

mod http_json;
pub use http_json::HttpDataPointReceiverFactory;

mod memory;
pub use memory::{MemoryDataPointReceiverFactory, ReceivedBatch};

/// Where the data points of each flush go.
pub trait Transport: Send + Sync {
    /// Source dimension value for metrics without their own.
    fn default_source_name(&self) -> &str;

    fn create_session(&self) -> Box<dyn TransportSession + '_>;
}

/// The data points of one flush.
///
/// Points are only guaranteed to be delivered once the session is closed.
pub trait TransportSession {
    fn add_data_point(&mut self, point: DataPoint);

    fn close(self: Box<Self>) -> Result<(), SendError>;
}

/// Sends one batch of data points.
pub trait DataPointReceiver {
    fn add_data_points(
        &mut self,
        auth_token: &str,
        points: &[DataPoint],
    ) -> Result<(), SendError>;
}

pub trait DataPointReceiverFactory: Send + Sync {
    fn create_receiver(&self) -> Result<Box<dyn DataPointReceiver>, SendError>;
}

pub trait AuthToken: Send + Sync {
    fn token(&self) -> Result<String, SendError>;
}

pub struct StaticAuthToken {
    token: String,
}

impl StaticAuthToken {
    pub fn new(token: &str) -> Self {
        StaticAuthToken {
            token: token.to_string(),
        }
    }
}

impl AuthToken for StaticAuthToken {
    fn token(&self) -> Result<String, SendError> {
        if self.token.is_empty() {
            Err(SendError::AuthToken("empty token".to_string()))
        } else {
            Ok(self.token.clone())
        }
    }
}

/// A batch that could not be delivered.
#[derive(Debug)]
pub struct SendFailure {
    pub data_points: Vec<DataPoint>,
    pub error: SendError,
}

/// Observer of failed batches.
pub trait OnSendErrorHandler: Send + Sync {
    fn handle_error(&self, failure: &SendFailure);
}

impl<F> OnSendErrorHandler for F
where
    F: Fn(&SendFailure) + Send + Sync,
{
    fn handle_error(&self, failure: &SendFailure) {
        self(failure)
    }
}
