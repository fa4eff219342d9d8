/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::{MetricTagName, MetricTagValue};
use crate::ParseError;

/// Dimensions of a data point, kept sorted by name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetricTagMap(BTreeMap<MetricTagName, MetricTagValue>);

impl MetricTagMap {
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn insert(&mut self, name: MetricTagName, value: MetricTagValue) -> Option<MetricTagValue> {
        self.0.insert(name, value)
    }

    pub fn insert_str(&mut self, name: &str, value: &str) -> Result<(), ParseError> {
        self.0
            .insert(MetricTagName::from_str(name)?, MetricTagValue::from_str(value)?);
        Ok(())
    }

    /// Copy in all dimensions of `other`, replacing existing values.
    pub fn extend(&mut self, other: &Self) {
        self.0
            .extend(other.0.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    pub fn contains(&self, name: &MetricTagName) -> bool {
        self.0.contains_key(name)
    }

    pub fn get(&self, name: &MetricTagName) -> Option<&MetricTagValue> {
        self.0.get(name)
    }

    pub fn remove(&mut self, name: &MetricTagName) -> Option<MetricTagValue> {
        self.0.remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MetricTagName, &MetricTagValue)> {
        self.0.iter()
    }

    /// Add dimensions from a `name:value,name:value` list.
    ///
    /// The value runs to the end of the entry and may itself contain `:`.
    /// A bare name gets the empty value and empty entries are skipped.
    pub fn parse_kv_list(&mut self, list: &str) -> Result<(), ParseError> {
        for entry in list.split(',').filter(|e| !e.is_empty()) {
            let (name, value) = entry.split_once(':').unwrap_or((entry, ""));
            self.insert_str(name, value)?;
        }
        Ok(())
    }

    /// Show as `name=value` pairs joined by `,`.
    pub fn display(&self) -> impl fmt::Display + '_ {
        DisplayDimensions(self)
    }
}

struct DisplayDimensions<'a>(&'a MetricTagMap);

impl fmt::Display for DisplayDimensions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{name}={value}")?;
        }
        Ok(())
    }
}
