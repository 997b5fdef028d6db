pub mod cache;
pub mod collector;
pub mod query;
pub mod refresher;
pub mod sample;
pub mod stream;

pub use cache::{MetricRecord, MetricsCache};
pub use collector::{ClusterObserver, MetricsCollector};
pub use query::{get_metric, list_metrics, MetricQueryResult, MetricsListResult};
pub use refresher::{Refresher, DEFAULT_REFRESH_INTERVAL};
pub use sample::{MetricPoint, MetricSample, HISTORY_CAPACITY};
pub use stream::{subscribe, StreamSubscription, STREAM_INTERVAL};
