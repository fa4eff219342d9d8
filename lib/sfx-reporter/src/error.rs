/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::time::Duration;

use http::StatusCode;
use thiserror::Error;

use sfx_types::ParseError;

/// Failure while turning registry metrics into data points.
///
/// Any of these aborts the rest of the flush.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to build data points for metric {metric}: {source:?}")]
    Construction {
        metric: String,
        source: anyhow::Error,
    },
    #[error("invalid source name {name:?}: {source}")]
    InvalidSourceName { name: String, source: ParseError },
}

impl ReportError {
    pub(crate) fn construction(metric: &str, source: anyhow::Error) -> Self {
        ReportError::Construction {
            metric: metric.to_string(),
            source,
        }
    }

    /// The registry name of the metric that failed, if any.
    pub fn metric(&self) -> Option<&str> {
        match self {
            ReportError::Construction { metric, .. } => Some(metric),
            ReportError::InvalidSourceName { .. } => None,
        }
    }
}

/// Failure while delivering a batch of data points.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("no usable auth token: {0}")]
    AuthToken(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("unexpected response status {0}")]
    Status(StatusCode),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("failed to encode data points: {0}")]
    Encode(#[from] serde_json::Error),
}
