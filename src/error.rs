//! Error types for the scaling benchmark
//!
//! Every failure an attempt can hit maps onto one variant here, so the tracker
//! can decide between "retry the configuration" and "stop now".

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Scaling benchmark error types
#[derive(Error, Debug)]
pub enum Error {
    /// Restarting servers or the Spark context failed
    #[error("Cluster management failed: {0}")]
    ClusterManagement(String),

    /// A timed data load or query failed, or returned unusable checkpoints
    #[error("Timed operation failed: {0}")]
    TimedOperation(String),

    /// The operator interrupted the run
    #[error("Cancelled by user")]
    Cancelled,

    /// Persisting or loading experiment state failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration rejected before any work started
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Report requested for samples that were never collected
    #[error("Missing samples: {0}")]
    MissingSamples(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML (de)serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether the tracker should retry the configuration after this error.
    ///
    /// Cancellation and bad configuration are final; everything else is
    /// treated as a transient cluster hiccup.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !matches!(self, Self::Cancelled | Self::InvalidConfig(_))
    }
}
