use thiserror::Error;

/// Common error type for the exporter's shared components.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Zenoh error: {0}")]
    Zenoh(#[from] zenoh::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid topic filter '{filter}': {reason}")]
    Topic { filter: String, reason: String },
}

impl Error {
    pub(crate) fn topic(filter: &str, reason: impl Into<String>) -> Self {
        Self::Topic {
            filter: filter.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
