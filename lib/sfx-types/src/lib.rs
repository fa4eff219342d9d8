/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use thiserror::Error;

mod tag;
pub use tag::{MetricTagMap, MetricTagName, MetricTagValue};

mod value;
pub use value::MetricValue;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("empty string")]
    Empty,
    #[error("should start with an ascii letter, not {0}")]
    InvalidFirstChar(char),
    #[error("invalid graphic char: {0}")]
    InvalidGraphic(char),
    #[error("not alpha numeric char")]
    NotAlphaNumeric,
    #[error("{0} chars is more than the limit {1}")]
    TooLong(usize, usize),
}
