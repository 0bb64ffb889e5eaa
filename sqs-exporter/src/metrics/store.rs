//! Latest gauge value per (metric kind, queue).

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use crate::queue::MetricKind;

/// Key of a single gauge series.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetricKey {
    pub kind: MetricKind,
    pub queue: String,
}

/// One gauge value at snapshot time.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub kind: MetricKind,
    pub queue: String,
    pub value: f64,
}

/// Concurrent last-write-wins gauge store.
///
/// Values are stored as `f64` bit patterns so readers never take the shard
/// write lock once a series exists. Series are never evicted: a queue that
/// stops reporting keeps its last value.
#[derive(Debug, Default)]
pub struct MetricStore {
    gauges: DashMap<MetricKey, AtomicU64>,
}

impl MetricStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            gauges: DashMap::new(),
        }
    }

    /// Set the gauge for `(kind, queue)`, replacing any previous value.
    pub fn set(&self, kind: MetricKind, queue: &str, value: f64) {
        let bits = value.to_bits();

        // Fast path: existing series only needs the shard read lock.
        let key = MetricKey {
            kind,
            queue: queue.to_string(),
        };
        if let Some(gauge) = self.gauges.get(&key) {
            gauge.store(bits, Ordering::Relaxed);
            return;
        }

        self.gauges
            .entry(key)
            .or_insert_with(|| AtomicU64::new(0))
            .store(bits, Ordering::Relaxed);
    }

    /// Current value for `(kind, queue)`, if one was ever set.
    pub fn get(&self, kind: MetricKind, queue: &str) -> Option<f64> {
        let key = MetricKey {
            kind,
            queue: queue.to_string(),
        };
        self.gauges
            .get(&key)
            .map(|gauge| f64::from_bits(gauge.load(Ordering::Relaxed)))
    }

    /// Number of series currently held.
    pub fn len(&self) -> usize {
        self.gauges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gauges.is_empty()
    }

    /// All current samples, ordered by kind and then queue name.
    pub fn snapshot(&self) -> Vec<MetricSample> {
        let mut samples: Vec<MetricSample> = self
            .gauges
            .iter()
            .map(|e| MetricSample {
                kind: e.key().kind,
                queue: e.key().queue.clone(),
                value: f64::from_bits(e.value().load(Ordering::Relaxed)),
            })
            .collect();

        samples.sort_by(|a, b| a.kind.cmp(&b.kind).then_with(|| a.queue.cmp(&b.queue)));
        samples
    }
}
