//! Run command implementation.
//!
//! Executes an experiment plan against the local backend.

use anyhow::Context;
use qcc_core::backends::LocalBackendFactory;
use qcc_core::{
    DiagnosticsOutput, ExperimentPlan, Harness, HarnessConfig, OutputFormat, StdoutSink, TracingSink,
    format_validation,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Flags given to `qcc run`; each one overrides the loaded configuration.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub plan: PathBuf,
    pub json: bool,
    pub qubits: Option<u32>,
    pub memory_limit_mb: Option<u64>,
    pub diagnostics: Option<DiagnosticsOutput>,
}

fn apply_overrides(config: &mut HarnessConfig, options: &RunOptions) {
    if let Some(qubits) = options.qubits {
        config.backend.qubits = qubits;
    }
    if let Some(limit) = options.memory_limit_mb {
        config.backend.memory_limit_mb = limit;
    }
    if let Some(output) = options.diagnostics {
        config.diagnostics.output = output;
    }
    if options.json {
        config.output.format = OutputFormat::Json;
    }
}

/// Execute the run command.
///
/// Stdout carries the timestamped diagnostics followed by the report line. With
/// JSON output, stdout diagnostics move to tracing (stderr) so stdout stays a
/// single JSON document.
pub async fn execute(options: RunOptions, mut config: HarnessConfig) -> anyhow::Result<()> {
    apply_overrides(&mut config, &options);
    config.validate()?;

    let plan = ExperimentPlan::load(&options.plan)
        .with_context(|| format!("Failed to load experiment plan: {}", options.plan.display()))?;
    debug!(plan = %options.plan.display(), backend = ?config.backend, "Loaded experiment plan");

    let factory = Arc::new(LocalBackendFactory::from_config(&config.backend));
    let harness = Harness::new(factory).with_options(config.diagnostics.handle_options());
    let harness = match (config.diagnostics.output, config.output.format) {
        (DiagnosticsOutput::Off, _) => harness.without_diagnostics(),
        (DiagnosticsOutput::Tracing, _) | (DiagnosticsOutput::Stdout, OutputFormat::Json) => {
            harness.with_sink(Arc::new(TracingSink))
        }
        (DiagnosticsOutput::Stdout, OutputFormat::Human) => harness.with_sink(Arc::new(StdoutSink)),
    };

    let report = harness.execute(&plan.into_runner()).await.context("Experiment run failed")?;

    match config.output.format {
        OutputFormat::Human => println!("{}", format_validation(&report.validation)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}
