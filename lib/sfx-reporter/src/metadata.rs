/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::collections::HashMap;
use std::sync::Mutex;

use sfx_registry::MetricId;
use sfx_types::{MetricTagMap, ParseError};

/// Reporting overrides of one metric.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetricMetadataEntry {
    name: Option<String>,
    source: Option<String>,
    tags: MetricTagMap,
}

impl MetricMetadataEntry {
    /// The name to report instead of the registry name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The source to report instead of the default source name.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn tags(&self) -> &MetricTagMap {
        &self.tags
    }
}

/// Dimensions and naming overrides per metric, shared between the
/// application and the reporter.
#[derive(Debug, Default)]
pub struct MetricMetadata {
    inner: Mutex<HashMap<MetricId, MetricMetadataEntry>>,
}

impl MetricMetadata {
    pub fn new() -> Self {
        MetricMetadata::default()
    }

    pub fn set_name(&self, id: &MetricId, name: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.entry(id.clone()).or_default().name = Some(name.to_string());
    }

    pub fn set_source(&self, id: &MetricId, source: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.entry(id.clone()).or_default().source = Some(source.to_string());
    }

    pub fn add_tag(&self, id: &MetricId, name: &str, value: &str) -> Result<(), ParseError> {
        let mut tags = MetricTagMap::default();
        tags.insert_str(name, value)?;
        self.add_tags(id, &tags);
        Ok(())
    }

    pub fn add_tags(&self, id: &MetricId, tags: &MetricTagMap) {
        let mut inner = self.inner.lock().unwrap();
        inner.entry(id.clone()).or_default().tags.extend(tags);
    }

    pub fn remove(&self, id: &MetricId) -> Option<MetricMetadataEntry> {
        let mut inner = self.inner.lock().unwrap();
        inner.remove(id)
    }

    pub fn get(&self, id: &MetricId) -> Option<MetricMetadataEntry> {
        let inner = self.inner.lock().unwrap();
        inner.get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sfx_registry::MetricKind;

    #[test]
    fn entry() {
        let id = MetricId::new(MetricKind::Timer, "db.query");
        let metadata = MetricMetadata::new();
        assert!(metadata.get(&id).is_none());

        metadata.set_name(&id, "database.query");
        metadata.set_source(&id, "db-01");
        metadata.add_tag(&id, "table", "users").unwrap();
        metadata.add_tag(&id, "table", "orders").unwrap();
        assert!(metadata.add_tag(&id, "bad key", "x").is_err());

        let entry = metadata.get(&id).unwrap();
        assert_eq!(entry.name(), Some("database.query"));
        assert_eq!(entry.source(), Some("db-01"));
        assert_eq!(entry.tags().len(), 1);
        assert_eq!(entry.tags().display().to_string(), "table=orders");

        // the same name of another kind is another metric
        let other = MetricId::new(MetricKind::Counter, "db.query");
        assert!(metadata.get(&other).is_none());

        assert!(metadata.remove(&id).is_some());
        assert!(metadata.get(&id).is_none());
    }
}
