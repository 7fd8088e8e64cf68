//! Errors raised while processing telemetry or loading settings.

/// A failure reported by an external scoring collaborator.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum PredictionError {
    #[error("ETA prediction failed: {0}")]
    Eta(String),
    #[error("queue prediction failed: {0}")]
    QueueNext(String),
    #[error("anomaly scoring failed: {0}")]
    Anomaly(String),
}

/// Why a submitted ping was not processed.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum IngestError {
    /// The ping was classified as anomalous and rejected.
    #[error("ping rejected as anomalous (score {score:.3})")]
    Anomalous { score: f64 },
    #[error(transparent)]
    Prediction(#[from] PredictionError),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid settings: {0}")]
    Invalid(String),
}
