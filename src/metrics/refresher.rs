//! Periodic refresh task feeding the shared metrics cache.

use crate::metrics::cache::MetricsCache;
use crate::metrics::collector::MetricsCollector;
use std::time::Duration;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Single long-lived task that runs one collection cycle per period and
/// applies the resulting batch of samples to the cache. The first cycle
/// runs immediately at startup so the cache is never empty during
/// normal operation.
pub struct Refresher {
    collector: MetricsCollector,
    cache: MetricsCache,
    period: Duration,
    token: CancellationToken,
}

impl Refresher {
    pub fn new(collector: MetricsCollector, cache: MetricsCache) -> Self {
        Self::with_period(collector, cache, DEFAULT_REFRESH_INTERVAL)
    }

    pub fn with_period(collector: MetricsCollector, cache: MetricsCache, period: Duration) -> Self {
        Self {
            collector,
            cache,
            period,
            token: CancellationToken::new(),
        }
    }

    /// Token that stops the refresh loop when cancelled, for clean
    /// process shutdown.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Drive refresh cycles until cancelled. The batch of upserts for
    /// one cycle is applied back-to-back; per-key atomicity comes from
    /// the cache itself.
    pub async fn run(mut self) {
        info!("Starting metrics refresher, period {:?}", self.period);

        let mut ticker = interval(self.period);

        loop {
            tokio::select! {
                _ = self.token.cancelled() => {
                    info!("Metrics refresher stopping");
                    break;
                }
                _ = ticker.tick() => {
                    self.refresh_once().await;
                }
            }
        }
    }

    async fn refresh_once(&mut self) {
        match self.collector.collect().await {
            Ok(samples) => {
                let count = samples.len();
                for sample in samples {
                    self.cache.upsert(sample).await;
                }
                debug!("Refresh cycle committed {} metrics", count);
            }
            Err(e) => {
                warn!("Refresh cycle failed, keeping previous samples: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::host::HostProbe;
    use crate::k8s::ClusterStats;
    use crate::metrics::collector::ClusterObserver;
    use async_trait::async_trait;

    struct SeededProbe;

    impl HostProbe for SeededProbe {
        fn cpu_percent(&mut self) -> Result<f64> {
            Ok(10.0)
        }
        fn mem_percent(&mut self) -> Result<f64> {
            Ok(20.0)
        }
        fn net_throughput_mb(&mut self) -> Result<f64> {
            Ok(0.0)
        }
        fn load_average(&mut self) -> Result<f64> {
            Ok(0.0)
        }
        fn process_count(&mut self) -> Result<usize> {
            Ok(1)
        }
    }

    struct EmptyCluster;

    #[async_trait]
    impl ClusterObserver for EmptyCluster {
        async fn stats(&self) -> Result<ClusterStats> {
            Ok(ClusterStats::default())
        }
    }

    #[tokio::test]
    async fn test_first_cycle_runs_immediately() {
        let cache = MetricsCache::new();
        let collector =
            MetricsCollector::new(Box::new(SeededProbe), Box::new(EmptyCluster));
        // Period far beyond the test: only the immediate first tick fires.
        let refresher = Refresher::with_period(
            collector,
            cache.clone(),
            Duration::from_secs(3600),
        );
        let token = refresher.cancellation_token();
        let task = tokio::spawn(refresher.run());

        let mut waited = Duration::ZERO;
        while cache.is_empty().await && waited < Duration::from_secs(5) {
            tokio::time::sleep(Duration::from_millis(10)).await;
            waited += Duration::from_millis(10);
        }

        let cpu = cache.get("cpu_usage").await.expect("cpu committed at boot");
        assert_eq!(cpu.value, 10.0);
        let mem = cache.get("memory_usage").await.expect("memory committed");
        assert_eq!(mem.value, 20.0);
        assert_eq!(cache.len().await, 6);

        token.cancel();
        task.await.expect("refresher task ends");
    }
}
