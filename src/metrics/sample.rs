use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Number of history points retained per metric. Once full, the oldest
/// point is evicted on each insert.
pub const HISTORY_CAPACITY: usize = 20;

/// A single observed value for one metric at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub id: String,
    pub name: String,
    pub description: String,
    pub value: f64,
    pub unit: String,
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
    pub labels: HashMap<String, String>,
    /// Originating query expression, informational only.
    pub query: String,
}

impl MetricSample {
    pub fn new(id: &str, name: &str, value: f64, unit: &str, timestamp: i64, query: &str) -> Self {
        let mut labels = HashMap::new();
        labels.insert("source".to_string(), "meshwatch".to_string());

        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            value,
            unit: unit.to_string(),
            timestamp,
            labels,
            query: query.to_string(),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }
}

/// One point of a metric's bounded history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub timestamp: i64,
    pub value: f64,
}

/// Current wall-clock time in whole seconds since the epoch.
pub fn epoch_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_carries_source_label() {
        let sample = MetricSample::new("cpu_usage", "CPU Usage", 42.0, "%", 100, "q");
        assert_eq!(sample.labels.get("source").map(String::as_str), Some("meshwatch"));
    }

    #[test]
    fn test_epoch_seconds_is_positive() {
        assert!(epoch_seconds() > 0);
    }
}
