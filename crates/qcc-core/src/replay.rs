//! Scripted stages driven by an experiment plan file.
//!
//! A plan fixes what each stage emits on the backend's diagnostic channel, how
//! long it takes, whether it fails, and what it returns. The CLI uses plans to
//! run the harness without a real optimizer; tests use them as deterministic
//! doubles.
//!
//! ```toml
//! [training]
//! parameters = [0.0601, 3.1416, -1.5708]
//! bias = 0.0021
//! diagnostics = ["Epoch 1: loss 0.61", "Epoch 2: loss 0.42"]
//! duration_ms = 40
//!
//! [validation]
//! miss_rate = 0.0842
//! diagnostics = ["Validated 89 samples"]
//! ```

use crate::pipeline::PipelineRunner;
use async_trait::async_trait;
use qcc_training::{
    Backend, StageError, StageResult, TrainingOutput, TrainingStage, ValidationOutput, ValidationStage,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("failed to read plan {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse plan: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid plan: {0}")]
    Invalid(String),
}

pub type PlanResult<T> = std::result::Result<T, PlanError>;

/// Behaviour shared by both scripted stages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageScript {
    /// Lines emitted through the backend, in order.
    #[serde(default)]
    pub diagnostics: Vec<String>,

    /// Total simulated run time, spread evenly before each diagnostic line.
    #[serde(default)]
    pub duration_ms: u64,

    /// When set, the stage fails with this reason after emitting its diagnostics.
    #[serde(default)]
    pub fail: Option<String>,
}

/// Even share of `total` before each of `lines` diagnostic lines.
fn pause_between_lines(total: Duration, lines: usize) -> Duration {
    match u32::try_from(lines) {
        Ok(0) => total,
        Ok(lines) => total / lines,
        Err(_) => total / u32::MAX,
    }
}

impl StageScript {
    async fn play(&self, backend: &dyn Backend) -> StageResult<()> {
        let total = Duration::from_millis(self.duration_ms);
        if self.diagnostics.is_empty() {
            if !total.is_zero() {
                tokio::time::sleep(total).await;
            }
        } else {
            let pause = pause_between_lines(total, self.diagnostics.len());
            for line in &self.diagnostics {
                if !pause.is_zero() {
                    tokio::time::sleep(pause).await;
                }
                backend.diagnostics().emit(line.clone());
            }
        }

        match &self.fail {
            Some(reason) => Err(StageError::Failed(reason.clone())),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingPlan {
    #[serde(flatten)]
    pub script: StageScript,
    pub parameters: Vec<f64>,
    pub bias: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationPlan {
    #[serde(flatten)]
    pub script: StageScript,
    pub miss_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentPlan {
    pub training: TrainingPlan,
    pub validation: ValidationPlan,
}

impl ExperimentPlan {
    pub fn load(path: &Path) -> PlanResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| PlanError::Read { path: path.display().to_string(), source })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> PlanResult<Self> {
        let plan: Self = toml::from_str(content)?;
        plan.validate()?;
        Ok(plan)
    }

    pub fn validate(&self) -> PlanResult<()> {
        if self.training.parameters.is_empty() {
            return Err(PlanError::Invalid("training.parameters must not be empty".to_string()));
        }
        TrainingOutput::new(self.training.parameters.clone(), self.training.bias)
            .validate()
            .map_err(|e| PlanError::Invalid(format!("training: {e}")))?;
        ValidationOutput::new(self.validation.miss_rate).map_err(|e| PlanError::Invalid(format!("validation: {e}")))?;
        Ok(())
    }

    /// Builds a runner whose validation stage expects exactly the parameters
    /// this plan's training stage produces.
    pub fn into_runner(self) -> PipelineRunner<ReplayTrainingStage, ReplayValidationStage> {
        let expected = self.training.parameters.len();
        PipelineRunner::new(
            ReplayTrainingStage::new(self.training),
            ReplayValidationStage::new(self.validation).expecting_parameters(expected),
        )
    }
}

#[derive(Debug, Clone)]
pub struct ReplayTrainingStage {
    plan: TrainingPlan,
}

impl ReplayTrainingStage {
    #[must_use]
    pub fn new(plan: TrainingPlan) -> Self {
        Self { plan }
    }
}

#[async_trait]
impl TrainingStage for ReplayTrainingStage {
    fn id(&self) -> &'static str {
        "replay-training"
    }

    async fn train(&self, backend: &dyn Backend) -> StageResult<TrainingOutput> {
        self.plan.script.play(backend).await?;
        Ok(TrainingOutput::new(self.plan.parameters.clone(), self.plan.bias))
    }
}

#[derive(Debug, Clone)]
pub struct ReplayValidationStage {
    plan: ValidationPlan,
    expected_parameters: Option<usize>,
}

impl ReplayValidationStage {
    #[must_use]
    pub fn new(plan: ValidationPlan) -> Self {
        Self { plan, expected_parameters: None }
    }

    #[must_use]
    pub fn expecting_parameters(mut self, count: usize) -> Self {
        self.expected_parameters = Some(count);
        self
    }
}

#[async_trait]
impl ValidationStage for ReplayValidationStage {
    fn id(&self) -> &'static str {
        "replay-validation"
    }

    async fn validate(&self, backend: &dyn Backend, parameters: &[f64], _bias: f64) -> StageResult<ValidationOutput> {
        if let Some(expected) = self.expected_parameters {
            if parameters.len() != expected {
                return Err(StageError::InvalidInput(format!(
                    "expected {expected} parameters, got {}",
                    parameters.len()
                )));
            }
        }
        self.plan.script.play(backend).await?;
        ValidationOutput::new(self.plan.miss_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::LocalBackendFactory;
    use qcc_training::BackendFactory;

    const PLAN: &str = r#"
[training]
parameters = [0.5, -0.25]
bias = 0.1
diagnostics = ["epoch 1", "epoch 2"]

[validation]
miss_rate = 0.0842
diagnostics = ["validated"]
"#;

    #[test]
    fn test_parse_plan() {
        let plan = ExperimentPlan::from_toml_str(PLAN).unwrap();
        assert_eq!(plan.training.parameters, vec![0.5, -0.25]);
        assert_eq!(plan.training.script.diagnostics.len(), 2);
        assert_eq!(plan.training.script.duration_ms, 0);
        assert!(plan.training.script.fail.is_none());
        assert!((plan.validation.miss_rate - 0.0842).abs() < f64::EPSILON);
    }

    #[test]
    fn test_plan_rejects_bad_miss_rate() {
        let content = PLAN.replace("0.0842", "1.5");
        assert!(matches!(ExperimentPlan::from_toml_str(&content), Err(PlanError::Invalid(_))));
    }

    #[test]
    fn test_plan_rejects_empty_parameters() {
        let content = PLAN.replace("[0.5, -0.25]", "[]");
        assert!(matches!(ExperimentPlan::from_toml_str(&content), Err(PlanError::Invalid(_))));
    }

    #[test]
    fn test_plan_missing_section() {
        assert!(matches!(ExperimentPlan::from_toml_str("[training]\nparameters = [1.0]\nbias = 0.0\n"), Err(PlanError::Parse(_))));
    }

    #[tokio::test]
    async fn test_validation_checks_parameter_count() {
        let plan = ExperimentPlan::from_toml_str(PLAN).unwrap();
        let stage = ReplayValidationStage::new(plan.validation).expecting_parameters(3);
        let backend = LocalBackendFactory::new(2, 1024).create().unwrap();

        let err = stage.validate(backend.as_ref(), &[1.0, 2.0], 0.0).await.unwrap_err();
        assert!(matches!(err, StageError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_failing_script_still_emits_diagnostics() {
        let mut plan = ExperimentPlan::from_toml_str(PLAN).unwrap();
        plan.training.script.fail = Some("optimizer diverged".to_string());
        let stage = ReplayTrainingStage::new(plan.training);

        let backend = LocalBackendFactory::new(2, 1024).create().unwrap();
        backend.diagnostics().disable_default_sink();
        let sink = std::sync::Arc::new(crate::diagnostics::CollectingSink::new());
        let _logger = crate::diagnostics::TimestampedLogger::attach_to(
            backend.diagnostics(),
            sink.clone(),
            std::time::Instant::now(),
        );

        let err = stage.train(backend.as_ref()).await.unwrap_err();
        assert_eq!(err.to_string(), "stage failed: optimizer diverged");
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn test_pause_between_lines() {
        let total = Duration::from_millis(90);
        assert_eq!(pause_between_lines(total, 3), Duration::from_millis(30));
        assert_eq!(pause_between_lines(total, 0), total);
        assert_eq!(pause_between_lines(total, usize::MAX), total / u32::MAX);
    }
}
