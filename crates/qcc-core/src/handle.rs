//! Exclusive ownership of one backend instance for the duration of a run.

use crate::error::{HarnessError, HarnessResult};
use qcc_training::{Backend, BackendFactory, BackendResult, DiagnosticChannel};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

/// Configuration applied while a handle is being acquired, before any
/// diagnostic listener can attach.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandleOptions {
    /// Silence the backend's raw stdout output so only formatted lines appear.
    pub disable_default_sink: bool,
}

impl Default for HandleOptions {
    fn default() -> Self {
        Self { disable_default_sink: true }
    }
}

/// Owns an acquired backend.
///
/// The handle is not `Clone`; stages borrow the backend through
/// [`backend`](Self::backend). [`release`](Self::release) consumes the handle, and
/// dropping an unreleased handle (early return, panic, cancelled future) shuts
/// the backend down from `Drop`. Either way `Backend::shutdown` runs exactly once.
pub struct BackendHandle {
    backend: Box<dyn Backend>,
    released: bool,
}

impl fmt::Debug for BackendHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendHandle")
            .field("backend", &self.backend.id())
            .field("released", &self.released)
            .finish()
    }
}

impl BackendHandle {
    /// Constructs a backend through `factory` and applies `options` to it.
    ///
    /// # Errors
    /// Returns `HarnessError::BackendUnavailable` if the factory cannot build the
    /// backend.
    pub fn acquire(factory: &dyn BackendFactory, options: &HandleOptions) -> HarnessResult<Self> {
        let backend = factory.create().map_err(|e| {
            warn!(factory = factory.id(), error = %e, "Backend acquisition failed");
            HarnessError::BackendUnavailable(e)
        })?;

        if options.disable_default_sink {
            backend.diagnostics().disable_default_sink();
        }

        info!(backend = backend.id(), factory = factory.id(), "Backend acquired");
        Ok(Self { backend, released: false })
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    pub fn diagnostics(&self) -> &DiagnosticChannel {
        self.backend.diagnostics()
    }

    pub fn id(&self) -> &str {
        self.backend.id()
    }

    /// Shuts the backend down and gives up the handle.
    ///
    /// # Errors
    /// Returns `HarnessError::ReleaseFailed` if the backend reports a shutdown error.
    /// The backend is considered released either way.
    pub fn release(mut self) -> HarnessResult<()> {
        self.shutdown_once().map_err(HarnessError::ReleaseFailed)
    }

    fn shutdown_once(&mut self) -> BackendResult<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        let result = self.backend.shutdown();
        match &result {
            Ok(()) => info!(backend = self.backend.id(), "Backend released"),
            Err(e) => warn!(backend = self.backend.id(), error = %e, "Backend released with error"),
        }
        result
    }
}

impl Drop for BackendHandle {
    fn drop(&mut self) {
        if !self.released {
            warn!(backend = self.backend.id(), "BackendHandle dropped without release - shutting down");
            let _ = self.shutdown_once();
        }
    }
}
