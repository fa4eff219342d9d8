/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::collections::HashMap;

use sfx_registry::MetricId;

/// Turn cumulative counter reads into per flush deltas.
///
/// Call at most once per counter per flush, a second call in the same
/// flush would see a zero delta.
///
/// `instance` is [`Counter::instance`](sfx_registry::Counter::instance) of
/// the counter registered under `id` at the time of the read.
pub trait CounterDeltas {
    fn record_and_delta(&mut self, id: &MetricId, instance: u64, current: i64) -> i64;
}

struct LastValue {
    instance: u64,
    value: i64,
}

/// The last reported value of each incremental counter.
///
/// A counter instance seen for the first time has an implicit baseline of
/// zero, also when it replaced an older counter of the same name. Entries
/// are only dropped by [`CounterDeltaTracker::forget`].
#[derive(Default)]
pub struct CounterDeltaTracker {
    last_values: HashMap<MetricId, LastValue>,
}

impl CounterDeltaTracker {
    pub fn new() -> Self {
        CounterDeltaTracker::default()
    }

    pub fn forget(&mut self, id: &MetricId) -> Option<i64> {
        self.last_values.remove(id).map(|v| v.value)
    }

    pub fn last_value(&self, id: &MetricId) -> Option<i64> {
        self.last_values.get(id).map(|v| v.value)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.last_values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.last_values.is_empty()
    }
}

impl CounterDeltas for CounterDeltaTracker {
    fn record_and_delta(&mut self, id: &MetricId, instance: u64, current: i64) -> i64 {
        let last = match self.last_values.get_mut(id) {
            Some(v) if v.instance == instance => std::mem::replace(&mut v.value, current),
            Some(v) => {
                *v = LastValue {
                    instance,
                    value: current,
                };
                0
            }
            None => {
                self.last_values.insert(
                    id.clone(),
                    LastValue {
                        instance,
                        value: current,
                    },
                );
                0
            }
        };
        current.wrapping_sub(last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sfx_registry::MetricKind;

    #[test]
    fn deltas() {
        let id = MetricId::new(MetricKind::Counter, "requests");
        let mut tracker = CounterDeltaTracker::new();
        let deltas: Vec<i64> = [0, 5, 5, 12]
            .into_iter()
            .map(|v| tracker.record_and_delta(&id, 1, v))
            .collect();
        assert_eq!(deltas, vec![0, 5, 0, 7]);
        assert_eq!(tracker.last_value(&id), Some(12));
    }

    #[test]
    fn first_observation() {
        let id = MetricId::new(MetricKind::Counter, "late");
        let mut tracker = CounterDeltaTracker::new();
        assert_eq!(tracker.record_and_delta(&id, 1, 9), 9);
        assert_eq!(tracker.record_and_delta(&id, 1, 9), 0);
    }

    #[test]
    fn decrement() {
        let id = MetricId::new(MetricKind::Counter, "queue");
        let mut tracker = CounterDeltaTracker::new();
        assert_eq!(tracker.record_and_delta(&id, 1, 4), 4);
        assert_eq!(tracker.record_and_delta(&id, 1, 1), -3);
    }

    #[test]
    fn forget() {
        let a = MetricId::new(MetricKind::Counter, "a");
        let b = MetricId::new(MetricKind::Counter, "b");
        let mut tracker = CounterDeltaTracker::new();
        tracker.record_and_delta(&a, 1, 3);
        tracker.record_and_delta(&b, 1, 4);
        assert_eq!(tracker.len(), 2);

        assert_eq!(tracker.forget(&a), Some(3));
        assert_eq!(tracker.forget(&a), None);
        assert_eq!(tracker.len(), 1);
        // a re-registered counter starts again from zero
        assert_eq!(tracker.record_and_delta(&a, 1, 2), 2);
    }

    #[test]
    fn replaced_instance() {
        let id = MetricId::new(MetricKind::Counter, "jobs");
        let mut tracker = CounterDeltaTracker::new();
        assert_eq!(tracker.record_and_delta(&id, 1, 100), 100);
        // removed and registered again without a forget in between
        assert_eq!(tracker.record_and_delta(&id, 2, 5), 5);
        assert_eq!(tracker.record_and_delta(&id, 2, 8), 3);
        assert_eq!(tracker.len(), 1);
    }
}
