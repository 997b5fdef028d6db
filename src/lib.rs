pub mod cli;
pub mod error;
pub mod host;
pub mod k8s;
pub mod metrics;
pub mod monitor;

pub use error::{MeshwatchError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
