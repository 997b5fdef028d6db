//! Shared metrics cache with bounded per-metric history.
//!
//! The cache is the only mutable state shared between the refresher,
//! query handlers, and stream publisher tasks. A single writer (the
//! refresher) updates it; any number of readers take snapshots. The
//! write lock covers both the current sample and its history, so a
//! reader can never observe one updated without the other.

use crate::metrics::sample::{MetricPoint, MetricSample, HISTORY_CAPACITY};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct CacheEntry {
    sample: MetricSample,
    history: VecDeque<MetricPoint>,
}

/// A point-in-time copy of one metric: its latest sample and history.
#[derive(Debug, Clone, Serialize)]
pub struct MetricRecord {
    #[serde(flatten)]
    pub sample: MetricSample,
    pub history: Vec<MetricPoint>,
}

/// Concurrency-safe store of the latest sample and bounded history per
/// metric identifier. Identifiers are never removed once created.
#[derive(Clone)]
pub struct MetricsCache {
    inner: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl MetricsCache {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Replace the current sample for the metric and append its
    /// (timestamp, value) to the history, evicting the oldest point
    /// beyond [`HISTORY_CAPACITY`].
    pub async fn upsert(&self, sample: MetricSample) {
        let mut map = self.inner.write().await;

        let point = MetricPoint {
            timestamp: sample.timestamp,
            value: sample.value,
        };

        let entry = map.entry(sample.id.clone()).or_insert_with(|| CacheEntry {
            sample: sample.clone(),
            history: VecDeque::with_capacity(HISTORY_CAPACITY),
        });

        entry.sample = sample;
        entry.history.push_back(point);
        while entry.history.len() > HISTORY_CAPACITY {
            entry.history.pop_front();
        }
    }

    /// Current sample for the metric, if it has ever been written.
    pub async fn get(&self, id: &str) -> Option<MetricSample> {
        self.inner.read().await.get(id).map(|e| e.sample.clone())
    }

    /// History points for the metric in insertion order, oldest first.
    pub async fn history(&self, id: &str) -> Option<Vec<MetricPoint>> {
        self.inner
            .read()
            .await
            .get(id)
            .map(|e| e.history.iter().copied().collect())
    }

    /// All current samples, in no particular order.
    pub async fn samples(&self) -> Vec<MetricSample> {
        self.inner
            .read()
            .await
            .values()
            .map(|e| e.sample.clone())
            .collect()
    }

    /// Consistent copy of the whole cache, safe to serialize after the
    /// read lock has been released.
    pub async fn snapshot(&self) -> HashMap<String, MetricRecord> {
        self.inner
            .read()
            .await
            .iter()
            .map(|(id, entry)| {
                (
                    id.clone(),
                    MetricRecord {
                        sample: entry.sample.clone(),
                        history: entry.history.iter().copied().collect(),
                    },
                )
            })
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

impl Default for MetricsCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(id: &str, value: f64, timestamp: i64) -> MetricSample {
        MetricSample::new(id, id, value, "%", timestamp, "test")
    }

    #[tokio::test]
    async fn test_upsert_then_get_returns_exact_sample() {
        let cache = MetricsCache::new();
        let s = sample("cpu_usage", 42.5, 1000);

        cache.upsert(s.clone()).await;

        let got = cache.get("cpu_usage").await.expect("sample present");
        assert_eq!(got, s);
    }

    #[tokio::test]
    async fn test_get_unknown_id_is_none() {
        let cache = MetricsCache::new();
        assert!(cache.get("nope").await.is_none());
    }

    #[tokio::test]
    async fn test_history_bounded_fifo() {
        let cache = MetricsCache::new();

        for i in 0..25 {
            cache.upsert(sample("memory_usage", i as f64, i)).await;
        }

        let history = cache.history("memory_usage").await.expect("history present");
        assert_eq!(history.len(), HISTORY_CAPACITY);

        // The 20 most recent points, in insertion order: 5..25.
        for (offset, point) in history.iter().enumerate() {
            assert_eq!(point.timestamp, 5 + offset as i64);
            assert_eq!(point.value, (5 + offset) as f64);
        }
    }

    #[tokio::test]
    async fn test_keys_are_monotonic() {
        let cache = MetricsCache::new();
        cache.upsert(sample("a", 1.0, 1)).await;
        cache.upsert(sample("b", 2.0, 1)).await;
        cache.upsert(sample("a", 3.0, 2)).await;

        assert_eq!(cache.len().await, 2);
        assert!(!cache.is_empty().await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_snapshot_never_tears_value_timestamp_pairs() {
        let cache = MetricsCache::new();
        cache.upsert(sample("req", 0.0, 0)).await;

        // Writer ties value to timestamp; a torn read would show a pair
        // where they disagree.
        let writer_cache = cache.clone();
        let writer = tokio::spawn(async move {
            for i in 1..500i64 {
                writer_cache.upsert(sample("req", i as f64, i)).await;
            }
        });

        for _ in 0..200 {
            let snap = cache.snapshot().await;
            let record = snap.get("req").expect("key present");
            assert_eq!(record.sample.value, record.sample.timestamp as f64);
            let last = record.history.last().expect("history non-empty");
            assert_eq!(last.timestamp, record.sample.timestamp);
            assert_eq!(last.value, record.sample.value);
        }

        writer.await.expect("writer task");
    }

    #[tokio::test]
    async fn test_snapshot_includes_history() {
        let cache = MetricsCache::new();
        cache.upsert(sample("net", 1.0, 10)).await;
        cache.upsert(sample("net", 2.0, 20)).await;

        let snap = cache.snapshot().await;
        let record = snap.get("net").expect("key present");
        assert_eq!(record.history.len(), 2);
        assert_eq!(record.history[0].value, 1.0);
        assert_eq!(record.history[1].value, 2.0);
    }
}
