//! End-to-end run: acquire a backend, attach timestamped logging, run the
//! pipeline, release the backend.

use crate::diagnostics::{StdoutSink, TimestampedLogger, TimestampedSink};
use crate::error::HarnessResult;
use crate::handle::{BackendHandle, HandleOptions};
use crate::pipeline::{PipelineReport, PipelineRunner};
use qcc_training::{BackendFactory, TrainingStage, ValidationStage};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct Harness {
    factory: Arc<dyn BackendFactory>,
    options: HandleOptions,
    sink: Option<Arc<dyn TimestampedSink>>,
}

impl fmt::Debug for Harness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Harness")
            .field("factory", &self.factory.id())
            .field("options", &self.options)
            .field("diagnostics", &self.sink.is_some())
            .finish()
    }
}

impl Harness {
    /// Creates a harness that prints timestamped diagnostics to stdout.
    #[must_use]
    pub fn new(factory: Arc<dyn BackendFactory>) -> Self {
        Self { factory, options: HandleOptions::default(), sink: Some(Arc::new(StdoutSink)) }
    }

    #[must_use]
    pub fn with_options(mut self, options: HandleOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn TimestampedSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Runs without attaching a timestamped logger.
    #[must_use]
    pub fn without_diagnostics(mut self) -> Self {
        self.sink = None;
        self
    }

    /// Executes one run of `runner` against a freshly acquired backend.
    ///
    /// The backend is released on every path. If a stage failed and the release
    /// failed too, the stage error wins and the release error is logged. If the
    /// future is dropped mid-run, the handle's `Drop` releases the backend.
    pub async fn execute<T, V>(&self, runner: &PipelineRunner<T, V>) -> HarnessResult<PipelineReport>
    where
        T: TrainingStage,
        V: ValidationStage,
    {
        let handle = BackendHandle::acquire(self.factory.as_ref(), &self.options)?;
        let logger = self.sink.clone().map(|sink| TimestampedLogger::attach(&handle, sink));

        let outcome = runner.run_detailed(&handle).await;

        if let Some(logger) = logger {
            let run_clock = logger.run_start().elapsed();
            let forwarded = logger.detach(handle.diagnostics());
            debug!(forwarded, seconds = run_clock.as_secs_f64(), "Diagnostics stream closed");
        }
        let released = handle.release();

        match (outcome, released) {
            (Ok(report), Ok(())) => {
                info!(run_id = %report.run_id, miss_rate = report.miss_rate(), "Run complete");
                Ok(report)
            }
            (Ok(_), Err(e)) | (Err(e), Ok(())) => Err(e),
            (Err(e), Err(release_error)) => {
                warn!(error = %release_error, "Backend release failed after stage failure");
                Err(e)
            }
        }
    }
}
