use thiserror::Error;

pub type StageResult<T> = std::result::Result<T, StageError>;

pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Failures raised while constructing, driving, or shutting down a backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("backend requires {required} bytes but the limit is {limit} bytes")]
    InsufficientMemory { required: u128, limit: u128 },

    #[error("invalid backend configuration: {0}")]
    InvalidConfig(String),

    #[error("backend shutdown failed: {0}")]
    Shutdown(String),
}

/// Failures raised by a training or validation stage.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("invalid stage input: {0}")]
    InvalidInput(String),

    #[error("invalid stage output: {0}")]
    InvalidOutput(String),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("stage failed: {0}")]
    Failed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
