/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod error;
pub use error::{ReportError, SendError};

mod point;
pub use point::{DataPoint, MetricType, SOURCE_DIMENSION};

mod details;
pub use details::{DetailSet, MetricDetails};

mod tracker;
pub use tracker::{CounterDeltaTracker, CounterDeltas};

mod metadata;
pub use metadata::{MetricMetadata, MetricMetadataEntry};

pub mod transport;

mod session;
pub use session::ReportingSession;

mod config;
pub use config::{ReporterConfig, SfxEndpoint};

mod reporter;
pub use reporter::{Reporter, ReporterHandle};
