/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::str::FromStr;

use smol_str::SmolStr;

use crate::ParseError;

mod map;
pub use map::MetricTagMap;

const NAME_MAX_CHARS: usize = 128;
const VALUE_MAX_CHARS: usize = 256;

/// Check a dimension name or value against the ingest rules.
///
/// Allowed are ascii alpha numeric chars plus `-_./:` and any non-ascii
/// alphanumeric char, at most `max_chars` of them.
fn check_dimension(s: &str, max_chars: usize) -> Result<(), ParseError> {
    let mut chars = 0;
    for c in s.chars() {
        chars += 1;
        match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' | '/' | ':' => {}
            c if c.is_ascii_graphic() => return Err(ParseError::InvalidGraphic(c)),
            c if c.is_ascii() || !c.is_alphanumeric() => return Err(ParseError::NotAlphaNumeric),
            _ => {}
        }
    }
    if chars > max_chars {
        return Err(ParseError::TooLong(chars, max_chars));
    }
    Ok(())
}

/// Dimension name, starting with an ascii letter.
#[derive(Clone, Debug, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub struct MetricTagName(SmolStr);

impl MetricTagName {
    /// Build a dimension name from a compile time constant, which is not
    /// checked.
    pub const fn new_static(name: &'static str) -> Self {
        MetricTagName(SmolStr::new_static(name))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for MetricTagName {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.chars().next() {
            None => return Err(ParseError::Empty),
            Some(c) if !c.is_ascii_alphabetic() => return Err(ParseError::InvalidFirstChar(c)),
            Some(_) => {}
        }
        check_dimension(s, NAME_MAX_CHARS)?;
        Ok(MetricTagName(SmolStr::new(s)))
    }
}

impl fmt::Display for MetricTagName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Dimension value, which may be empty.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct MetricTagValue(SmolStr);

impl MetricTagValue {
    pub const EMPTY: MetricTagValue = MetricTagValue(SmolStr::new_static(""));

    #[inline]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for MetricTagValue {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        check_dimension(s, VALUE_MAX_CHARS)?;
        Ok(MetricTagValue(SmolStr::new(s)))
    }
}

impl fmt::Display for MetricTagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
