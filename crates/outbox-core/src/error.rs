use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutboxError {
    #[error("queue store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("submission to {target} failed: {reason}")]
    SubmissionFailed { target: String, reason: String },

    #[error("invalid HTTP method '{0}'")]
    InvalidMethod(String),

    #[error("invalid config: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl OutboxError {
    /// Wrap any displayable storage-layer error as `StoreUnavailable`.
    pub fn store(e: impl std::fmt::Display) -> Self {
        Self::StoreUnavailable(e.to_string())
    }

    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, OutboxError>;
