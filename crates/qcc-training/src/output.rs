use crate::error::{StageError, StageResult};
use serde::{Deserialize, Serialize};

/// Optimized model produced by a training stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingOutput {
    pub parameters: Vec<f64>,
    pub bias: f64,
}

impl TrainingOutput {
    #[must_use]
    pub fn new(parameters: Vec<f64>, bias: f64) -> Self {
        Self { parameters, bias }
    }

    pub fn validate(&self) -> StageResult<()> {
        if let Some(idx) = self.parameters.iter().position(|p| !p.is_finite()) {
            return Err(StageError::InvalidOutput(format!("parameters[{idx}] is not finite")));
        }
        if !self.bias.is_finite() {
            return Err(StageError::InvalidOutput("bias is not finite".to_string()));
        }
        Ok(())
    }
}

/// Result of a validation stage: the fraction of misclassified examples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawValidationOutput")]
pub struct ValidationOutput {
    miss_rate: f64,
}

#[derive(Deserialize)]
struct RawValidationOutput {
    miss_rate: f64,
}

impl TryFrom<RawValidationOutput> for ValidationOutput {
    type Error = StageError;

    fn try_from(raw: RawValidationOutput) -> StageResult<Self> {
        Self::new(raw.miss_rate)
    }
}

impl ValidationOutput {
    /// Rejects miss rates that are not finite or fall outside `[0, 1]`.
    pub fn new(miss_rate: f64) -> StageResult<Self> {
        if !miss_rate.is_finite() || !(0.0..=1.0).contains(&miss_rate) {
            return Err(StageError::InvalidOutput(format!(
                "miss rate must be within [0, 1], got {miss_rate}"
            )));
        }
        Ok(Self { miss_rate })
    }

    /// Builds the output from a count of misclassified examples.
    pub fn from_counts(misses: usize, total: usize) -> StageResult<Self> {
        if total == 0 {
            return Err(StageError::InvalidInput("validation set must not be empty".to_string()));
        }
        if misses > total {
            return Err(StageError::InvalidOutput(format!(
                "misses ({misses}) exceed validation set size ({total})"
            )));
        }
        Self::new(misses as f64 / total as f64)
    }

    pub fn miss_rate(&self) -> f64 {
        self.miss_rate
    }
}
