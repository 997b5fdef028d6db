//! Typed query results over the metrics cache, consumed by the HTTP
//! routing layer.

use crate::metrics::cache::MetricsCache;
use crate::metrics::sample::MetricSample;
use serde::Serialize;

/// Result of listing current metrics, optionally filtered by an
/// identifier substring.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsListResult {
    pub metrics: Vec<MetricSample>,
    pub count: usize,
}

/// Result of a single-metric lookup. An unknown identifier is a normal
/// negative result, not an error.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum MetricQueryResult {
    Found(MetricSample),
    NotFound { error: String },
}

impl MetricQueryResult {
    pub fn is_found(&self) -> bool {
        matches!(self, MetricQueryResult::Found(_))
    }

    pub fn sample(&self) -> Option<&MetricSample> {
        match self {
            MetricQueryResult::Found(sample) => Some(sample),
            MetricQueryResult::NotFound { .. } => None,
        }
    }
}

/// Current samples whose identifier contains `filter`, sorted by
/// identifier for stable output.
pub async fn list_metrics(cache: &MetricsCache, filter: Option<&str>) -> MetricsListResult {
    let mut metrics: Vec<MetricSample> = cache
        .samples()
        .await
        .into_iter()
        .filter(|m| filter.map(|f| m.id.contains(f)).unwrap_or(true))
        .collect();
    metrics.sort_by(|a, b| a.id.cmp(&b.id));

    let count = metrics.len();
    MetricsListResult { metrics, count }
}

/// Current sample for one identifier.
pub async fn get_metric(cache: &MetricsCache, id: &str) -> MetricQueryResult {
    match cache.get(id).await {
        Some(sample) => MetricQueryResult::Found(sample),
        None => MetricQueryResult::NotFound {
            error: format!("Metric not found: {}", id),
        },
    }
}
