//! Per-cycle gathering of host and cluster observations and derivation
//! of the dashboard's secondary metrics.

use crate::error::Result;
use crate::host::HostProbe;
use crate::k8s::{ClusterClient, ClusterStats};
use crate::metrics::sample::{epoch_seconds, MetricSample};
use async_trait::async_trait;
use tracing::warn;

/// Source of cluster-wide observations, kept behind a trait so cycles
/// can be driven without a live cluster.
#[async_trait]
pub trait ClusterObserver: Send + Sync {
    async fn stats(&self) -> Result<ClusterStats>;
}

#[async_trait]
impl ClusterObserver for ClusterClient {
    async fn stats(&self) -> Result<ClusterStats> {
        self.cluster_stats().await
    }
}

/// Requests/sec proxied from the running pod count.
pub fn request_rate(running_pods: usize) -> f64 {
    running_pods as f64 * 10.0
}

/// Failed pods as a percentage of all pods; zero for an empty cluster.
pub fn error_rate(failed_pods: usize, pod_count: usize) -> f64 {
    if pod_count == 0 {
        0.0
    } else {
        failed_pods as f64 / pod_count as f64 * 100.0
    }
}

/// Milliseconds derived from the one-minute load average.
pub fn response_time_ms(load_average: f64) -> f64 {
    load_average * 100.0
}

/// Stateless per-invocation metrics gathering. Host readings that fail
/// default to zero; a cluster query failure zeroes the cluster-derived
/// metrics. Neither aborts the cycle.
pub struct MetricsCollector {
    host: Box<dyn HostProbe>,
    cluster: Box<dyn ClusterObserver>,
}

impl MetricsCollector {
    pub fn new(host: Box<dyn HostProbe>, cluster: Box<dyn ClusterObserver>) -> Self {
        Self { host, cluster }
    }

    /// Gather raw observations and derive the full metric set for the
    /// current instant.
    pub async fn collect(&mut self) -> Result<Vec<MetricSample>> {
        let timestamp = epoch_seconds();

        let cpu = read_or_zero("cpu", self.host.cpu_percent());
        let memory = read_or_zero("memory", self.host.mem_percent());
        let network = read_or_zero("network", self.host.net_throughput_mb());
        let load = read_or_zero("load", self.host.load_average());

        let stats = match self.cluster.stats().await {
            Ok(stats) => stats,
            Err(e) => {
                warn!("Cluster stats unavailable, using zeroed readings: {}", e);
                ClusterStats::default()
            }
        };

        Ok(vec![
            MetricSample::new(
                "cpu_usage",
                "CPU Usage",
                cpu,
                "%",
                timestamp,
                "rate(cpu_usage_seconds_total[5m])",
            )
            .with_description("Host CPU utilization percentage"),
            MetricSample::new(
                "memory_usage",
                "Memory Usage",
                memory,
                "%",
                timestamp,
                "memory_usage_bytes / memory_total_bytes * 100",
            )
            .with_description("Host memory utilization percentage"),
            MetricSample::new(
                "network_io",
                "Network I/O",
                network,
                "MB/s",
                timestamp,
                "rate(network_io_bytes_total[5m])",
            )
            .with_description("Host network throughput"),
            MetricSample::new(
                "request_rate",
                "Request Rate",
                request_rate(stats.running_pods),
                "req/s",
                timestamp,
                "rate(http_requests_total[5m])",
            )
            .with_description("Estimated request rate from running pods"),
            MetricSample::new(
                "error_rate",
                "Error Rate",
                error_rate(stats.failed_pods, stats.pod_count),
                "%",
                timestamp,
                "rate(http_requests_total{status=~\"5..\"}[5m])",
            )
            .with_description("Failed pods as a share of all pods"),
            MetricSample::new(
                "response_time",
                "Response Time",
                response_time_ms(load),
                "ms",
                timestamp,
                "histogram_quantile(0.95, rate(http_request_duration_seconds_bucket[5m]))",
            )
            .with_description("Estimated response time from system load"),
        ])
    }
}

fn read_or_zero(what: &str, reading: Result<f64>) -> f64 {
    match reading {
        Ok(value) => value,
        Err(e) => {
            warn!("Host {} reading failed, defaulting to zero: {}", what, e);
            0.0
        }
    }
}
