//! QCC Core
//!
//! The experiment harness:
//! - Acquiring and releasing a backend (`BackendHandle`)
//! - Timestamping the backend's diagnostic messages (`TimestampedLogger`)
//! - Running training then validation against it (`PipelineRunner`)
//! - Wiring the three together for one run (`Harness`)

pub mod backends;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod handle;
pub mod harness;
pub mod pipeline;
pub mod replay;
pub mod report;

pub use config::{
    BackendConfig, ConfigError, ConfigLayer, ConfigResult, DiagnosticsConfig, DiagnosticsOutput, HarnessConfig,
    OutputConfig, OutputFormat,
};
pub use diagnostics::{
    CollectingSink, StdoutSink, TimestampedLogger, TimestampedMessage, TimestampedSink, Timestamper, TracingSink,
    format_duration,
};
pub use error::{HarnessError, HarnessResult};
pub use handle::{BackendHandle, HandleOptions};
pub use harness::Harness;
pub use pipeline::{PipelineReport, PipelineRunner, PipelineState, RunId};
pub use replay::{ExperimentPlan, PlanError, ReplayTrainingStage, ReplayValidationStage};
pub use report::{format_miss_rate, format_validation};
