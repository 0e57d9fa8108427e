use crate::backend::Backend;
use crate::error::StageResult;
use crate::output::{TrainingOutput, ValidationOutput};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Training,
    Validation,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Training => f.write_str("training"),
            Self::Validation => f.write_str("validation"),
        }
    }
}

/// Optimizes model parameters against a backend.
#[async_trait]
pub trait TrainingStage: Send + Sync {
    fn id(&self) -> &'static str;

    async fn train(&self, backend: &dyn Backend) -> StageResult<TrainingOutput>;
}

/// Measures how a trained model performs on held-out data.
#[async_trait]
pub trait ValidationStage: Send + Sync {
    fn id(&self) -> &'static str;

    async fn validate(
        &self,
        backend: &dyn Backend,
        parameters: &[f64],
        bias: f64,
    ) -> StageResult<ValidationOutput>;
}
