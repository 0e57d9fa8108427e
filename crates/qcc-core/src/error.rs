//! Error types for running experiments.

use qcc_training::{BackendError, StageError};
use thiserror::Error;

/// Result type for harness operations.
pub type HarnessResult<T> = std::result::Result<T, HarnessError>;

/// Failures that end a run.
///
/// Every variant is fatal: the harness never retries and never reports a partial
/// result. The backend handle has always been released by the time one of these
/// reaches the caller of [`Harness::execute`](crate::Harness::execute).
#[derive(Debug, Error)]
pub enum HarnessError {
    /// The backend could not be constructed; no stage ran.
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(#[source] BackendError),

    /// The training stage failed; validation was not invoked.
    #[error("Training failed: {0}")]
    TrainingFailed(#[source] StageError),

    /// The validation stage failed.
    #[error("Validation failed: {0}")]
    ValidationFailed(#[source] StageError),

    /// Both stages succeeded but the backend did not shut down cleanly.
    #[error("Backend release failed: {0}")]
    ReleaseFailed(#[source] BackendError),
}
