//! Live snapshot streaming to connected subscribers.
//!
//! Each subscription runs one task that serializes a cache snapshot on
//! a fixed cadence and pushes it over a channel. The task ends on the
//! subscriber's disconnect signal or on the first failed delivery,
//! never touching the cache, the refresher, or other subscribers.

use crate::metrics::cache::{MetricRecord, MetricsCache};
use crate::metrics::sample::MetricPoint;
use futures::Stream;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub const STREAM_INTERVAL: Duration = Duration::from_secs(5);

/// One metric as delivered in a stream frame.
#[derive(Debug, Clone, Serialize)]
pub struct FrameEntry {
    pub value: f64,
    pub timestamp: i64,
    pub unit: String,
    pub labels: HashMap<String, String>,
    pub history: Vec<MetricPoint>,
}

/// Build one frame (identifier -> entry) from a cache snapshot.
pub fn frame_from_snapshot(snapshot: HashMap<String, MetricRecord>) -> HashMap<String, FrameEntry> {
    snapshot
        .into_iter()
        .map(|(id, record)| {
            (
                id,
                FrameEntry {
                    value: record.sample.value,
                    timestamp: record.sample.timestamp,
                    unit: record.sample.unit,
                    labels: record.sample.labels,
                    history: record.history,
                },
            )
        })
        .collect()
}

/// Handle owned by one connected subscriber. Dropping it, or calling
/// [`cancel`](StreamSubscription::cancel), disconnects the stream; no
/// other component can close it.
pub struct StreamSubscription {
    frames: mpsc::Receiver<String>,
    token: CancellationToken,
}

impl StreamSubscription {
    /// Next serialized frame, or `None` once the stream has closed.
    pub async fn next_frame(&mut self) -> Option<String> {
        self.frames.recv().await
    }

    /// Disconnect: the publisher task closes without a further write.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// True once the publisher task has reached its terminal state.
    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Adapt the subscription into a [`Stream`] of serialized frames,
    /// the shape a response body wants. Dropping the stream disconnects.
    pub fn into_stream(self) -> impl Stream<Item = String> {
        ReceiverStream::new(self.frames)
    }
}

/// Spawn a publisher task delivering one snapshot frame every
/// [`STREAM_INTERVAL`] to the returned subscription.
pub fn subscribe(cache: &MetricsCache) -> StreamSubscription {
    subscribe_with_interval(cache, STREAM_INTERVAL)
}

pub fn subscribe_with_interval(cache: &MetricsCache, period: Duration) -> StreamSubscription {
    let (tx, rx) = mpsc::channel(8);
    let token = CancellationToken::new();
    let task_token = token.clone();
    let cache = cache.clone();

    tokio::spawn(async move {
        let mut ticker = interval(period);
        // Swallow the immediate first tick: one frame per full period.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = task_token.cancelled() => {
                    debug!("Stream subscription cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    // A tick racing the disconnect signal must not
                    // produce a further write.
                    if task_token.is_cancelled() {
                        break;
                    }
                    let snapshot = cache.snapshot().await;
                    let frame = match serde_json::to_string(&frame_from_snapshot(snapshot)) {
                        Ok(frame) => frame,
                        Err(e) => {
                            warn!("Failed to serialize snapshot frame: {}", e);
                            continue;
                        }
                    };

                    if tx.send(frame).await.is_err() {
                        debug!("Subscriber gone, closing stream");
                        task_token.cancel();
                        break;
                    }
                }
            }
        }
    });

    StreamSubscription { frames: rx, token }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::sample::MetricSample;
    use serde_json::Value;

    fn sample(id: &str, value: f64, timestamp: i64) -> MetricSample {
        MetricSample::new(id, id, value, "%", timestamp, "test")
    }

    #[tokio::test]
    async fn test_frame_shape() {
        let cache = MetricsCache::new();
        cache.upsert(sample("cpu_usage", 42.0, 100)).await;
        cache.upsert(sample("cpu_usage", 43.0, 130)).await;

        let mut sub = subscribe_with_interval(&cache, Duration::from_millis(10));
        let frame = sub.next_frame().await.expect("one frame delivered");

        let parsed: Value = serde_json::from_str(&frame).expect("frame is JSON");
        let entry = &parsed["cpu_usage"];
        assert_eq!(entry["value"], 43.0);
        assert_eq!(entry["timestamp"], 130);
        assert_eq!(entry["unit"], "%");
        assert_eq!(entry["labels"]["source"], "meshwatch");
        let history = entry["history"].as_array().expect("history array");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0]["value"], 42.0);

        sub.cancel();
    }

    #[tokio::test]
    async fn test_cancel_closes_without_further_writes() {
        let cache = MetricsCache::new();
        cache.upsert(sample("cpu_usage", 1.0, 1)).await;

        let mut sub = subscribe_with_interval(&cache, Duration::from_millis(10));
        sub.next_frame().await.expect("stream active");

        sub.cancel();
        assert!(sub.is_closed());

        // Drain anything already in flight; the channel must then end.
        while sub.next_frame().await.is_some() {}
        assert!(sub.next_frame().await.is_none());
    }

    #[tokio::test]
    async fn test_failed_delivery_closes_publisher() {
        let cache = MetricsCache::new();
        cache.upsert(sample("cpu_usage", 1.0, 1)).await;

        let mut sub = subscribe_with_interval(&cache, Duration::from_millis(10));
        // Refusing delivery makes the next send fail.
        sub.frames.close();

        let mut waited = Duration::ZERO;
        while !sub.is_closed() && waited < Duration::from_secs(5) {
            tokio::time::sleep(Duration::from_millis(10)).await;
            waited += Duration::from_millis(10);
        }

        assert!(sub.is_closed());
    }

    #[tokio::test]
    async fn test_into_stream_yields_frames() {
        use futures::StreamExt;

        let cache = MetricsCache::new();
        cache.upsert(sample("cpu_usage", 1.0, 1)).await;

        let sub = subscribe_with_interval(&cache, Duration::from_millis(10));
        let mut stream = sub.into_stream();
        let frame = stream.next().await.expect("frame via Stream adapter");
        assert!(frame.contains("cpu_usage"));
    }

    #[tokio::test]
    async fn test_subscribers_are_independent() {
        let cache = MetricsCache::new();
        cache.upsert(sample("cpu_usage", 1.0, 1)).await;

        let mut first = subscribe_with_interval(&cache, Duration::from_millis(10));
        let mut second = subscribe_with_interval(&cache, Duration::from_millis(10));

        first.cancel();

        // The surviving subscriber keeps receiving frames.
        second.next_frame().await.expect("second still active");
        second.next_frame().await.expect("second still active");

        assert!(first.is_closed());
        assert!(!second.is_closed());
        second.cancel();
    }
}
