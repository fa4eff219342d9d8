/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use crate::MetricId;

/// Decide which registry metrics go into a snapshot.
pub trait MetricFilter: Send + Sync {
    fn matches(&self, id: &MetricId) -> bool;
}

impl<F> MetricFilter for F
where
    F: Fn(&MetricId) -> bool + Send + Sync,
{
    fn matches(&self, id: &MetricId) -> bool {
        self(id)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct AllMetrics;

impl MetricFilter for AllMetrics {
    fn matches(&self, _id: &MetricId) -> bool {
        true
    }
}

/// Keep the metrics whose name starts with one of the prefixes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PrefixFilter {
    prefixes: Vec<String>,
}

impl PrefixFilter {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PrefixFilter {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }
}

impl MetricFilter for PrefixFilter {
    fn matches(&self, id: &MetricId) -> bool {
        self.prefixes.iter().any(|p| id.name().starts_with(p.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MetricKind;

    #[test]
    fn prefix() {
        let f = PrefixFilter::new(["http.", "db."]);
        assert!(f.matches(&MetricId::new(MetricKind::Timer, "http.requests")));
        assert!(f.matches(&MetricId::new(MetricKind::Gauge, "db.pool.size")));
        assert!(!f.matches(&MetricId::new(MetricKind::Counter, "cache.hits")));

        let empty = PrefixFilter::default();
        assert!(!empty.matches(&MetricId::new(MetricKind::Counter, "cache.hits")));
    }

    #[test]
    fn closure() {
        let f = |id: &MetricId| id.kind() == MetricKind::Counter;
        assert!(f.matches(&MetricId::new(MetricKind::Counter, "a")));
        assert!(!f.matches(&MetricId::new(MetricKind::Meter, "a")));
        assert!(AllMetrics.matches(&MetricId::new(MetricKind::Meter, "a")));
    }
}
