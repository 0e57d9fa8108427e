//! QCC Training
//!
//! Backend-agnostic contracts for two-stage experiments:
//! - Computational backends (`Backend`, `BackendFactory`)
//! - Their diagnostic message stream (`DiagnosticChannel`)
//! - Training and validation stages and the values they exchange

pub mod backend;
pub mod diagnostics;
pub mod error;
pub mod output;
pub mod stage;

pub use backend::{Backend, BackendFactory};
pub use diagnostics::{DiagnosticChannel, DiagnosticListener, DiagnosticMessage, SubscriptionId};
pub use error::{BackendError, BackendResult, StageError, StageResult};
pub use output::{TrainingOutput, ValidationOutput};
pub use stage::{StageKind, TrainingStage, ValidationStage};
