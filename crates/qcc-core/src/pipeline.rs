//! Sequential training → validation pipeline.

use crate::error::{HarnessError, HarnessResult};
use crate::handle::BackendHandle;
use chrono::{DateTime, Utc};
use qcc_training::{StageKind, TrainingOutput, TrainingStage, ValidationOutput, ValidationStage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use tracing::{Instrument, debug, error, info, info_span};
use uuid::Uuid;

/// Identifier for a single pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Pipeline execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    /// Nothing has run yet.
    Idle,
    /// The training stage is in flight.
    Training,
    /// The validation stage is in flight.
    Validating,
    /// Validation produced a result.
    Done,
    /// A stage failed.
    Failed,
}

impl PipelineState {
    /// Checks if the pipeline can move to the given state.
    ///
    /// No transition skips a stage, and nothing re-enters `Training` once
    /// validation has started. `Done` and `Failed` are terminal.
    #[must_use]
    pub fn can_transition_to(&self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Idle, Self::Training)
                | (Self::Training, Self::Validating | Self::Failed)
                | (Self::Validating, Self::Done | Self::Failed)
        )
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

struct StateTracker {
    state: PipelineState,
}

impl StateTracker {
    fn new() -> Self {
        Self { state: PipelineState::Idle }
    }

    fn advance(&mut self, to: PipelineState) {
        let valid = self.state.can_transition_to(to);
        if !valid {
            error!(from = ?self.state, to = ?to, "Invalid pipeline state transition");
        }
        debug_assert!(valid, "invalid pipeline transition {:?} -> {:?}", self.state, to);
        debug!(from = ?self.state, to = ?to, "Pipeline state transition");
        self.state = to;
        if to.is_terminal() {
            debug!(state = ?to, "Pipeline reached terminal state");
        }
    }
}

/// Everything a successful run produced.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub backend: String,
    pub training_stage: String,
    pub validation_stage: String,
    pub training: TrainingOutput,
    pub validation: ValidationOutput,
    pub training_seconds: f64,
    pub validation_seconds: f64,
}

impl PipelineReport {
    pub fn miss_rate(&self) -> f64 {
        self.validation.miss_rate()
    }
}

/// Runs a training stage and then a validation stage against one backend.
///
/// Single pass, fail-fast, no retries. The runner keeps no state between calls;
/// each `run` is independent given a fresh handle.
#[derive(Debug, Clone)]
pub struct PipelineRunner<T, V> {
    training: T,
    validation: V,
}

impl<T, V> PipelineRunner<T, V>
where
    T: TrainingStage,
    V: ValidationStage,
{
    #[must_use]
    pub fn new(training: T, validation: V) -> Self {
        Self { training, validation }
    }

    pub fn training_stage(&self) -> &T {
        &self.training
    }

    pub fn validation_stage(&self) -> &V {
        &self.validation
    }

    /// Runs both stages and returns the validation result.
    pub async fn run(&self, handle: &BackendHandle) -> HarnessResult<ValidationOutput> {
        self.run_detailed(handle).await.map(|report| report.validation)
    }

    /// Runs both stages and returns the full report.
    ///
    /// # Errors
    /// `TrainingFailed` if training fails (validation is then never invoked),
    /// `ValidationFailed` if validation fails.
    pub async fn run_detailed(&self, handle: &BackendHandle) -> HarnessResult<PipelineReport> {
        let run_id = RunId::new();
        let span = info_span!("pipeline", run_id = %run_id, backend = handle.id());
        self.execute(run_id, handle).instrument(span).await
    }

    async fn execute(&self, run_id: RunId, handle: &BackendHandle) -> HarnessResult<PipelineReport> {
        let started_at = Utc::now();
        let mut tracker = StateTracker::new();

        tracker.advance(PipelineState::Training);
        info!(stage = %StageKind::Training, id = self.training.id(), "Stage started");
        let clock = Instant::now();
        let trained = match self.training.train(handle.backend()).await.and_then(|output| {
            output.validate()?;
            Ok(output)
        }) {
            Ok(output) => output,
            Err(e) => {
                tracker.advance(PipelineState::Failed);
                error!(stage = %StageKind::Training, error = %e, "Stage failed");
                return Err(HarnessError::TrainingFailed(e));
            }
        };
        let training_seconds = clock.elapsed().as_secs_f64();
        info!(
            stage = %StageKind::Training,
            parameters = trained.parameters.len(),
            bias = trained.bias,
            seconds = training_seconds,
            "Stage finished"
        );

        tracker.advance(PipelineState::Validating);
        info!(stage = %StageKind::Validation, id = self.validation.id(), "Stage started");
        let clock = Instant::now();
        let validation =
            match self.validation.validate(handle.backend(), &trained.parameters, trained.bias).await {
                Ok(output) => output,
                Err(e) => {
                    tracker.advance(PipelineState::Failed);
                    error!(stage = %StageKind::Validation, error = %e, "Stage failed");
                    return Err(HarnessError::ValidationFailed(e));
                }
            };
        let validation_seconds = clock.elapsed().as_secs_f64();
        info!(
            stage = %StageKind::Validation,
            miss_rate = validation.miss_rate(),
            seconds = validation_seconds,
            "Stage finished"
        );

        tracker.advance(PipelineState::Done);
        Ok(PipelineReport {
            run_id,
            started_at,
            backend: handle.id().to_string(),
            training_stage: self.training.id().to_string(),
            validation_stage: self.validation.id().to_string(),
            training: trained,
            validation,
            training_seconds,
            validation_seconds,
        })
    }
}
