use thiserror::Error;

#[derive(Error, Debug)]
pub enum MeshwatchError {
    #[error("Cluster unavailable: {0}")]
    Unavailable(String),

    #[error("Kubernetes error: {0}")]
    KubernetesError(String),

    #[error("Collection error: {0}")]
    CollectionError(String),

    #[error("Stream closed by subscriber")]
    StreamClosed,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl MeshwatchError {
    /// True when the cluster itself is unreachable, as opposed to a
    /// single scoped query failing. Discovery skips transient failures
    /// but escalates this one.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, MeshwatchError::Unavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, MeshwatchError>;
