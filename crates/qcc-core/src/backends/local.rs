//! In-process state-vector backend.
//!
//! Reserves nothing up front; it checks that a state vector of the configured
//! width fits the memory limit and then hands out a diagnostic channel that
//! stages can emit through.

use crate::config::BackendConfig;
use qcc_training::{Backend, BackendError, BackendFactory, BackendResult, DiagnosticChannel};
use tracing::debug;

/// Bytes per complex amplitude (two `f64`s).
pub const BYTES_PER_AMPLITUDE: u128 = 16;

/// Largest register width the local backend accepts.
pub const MAX_QUBITS: u32 = 63;

/// Memory needed for a full state vector over `qubits` qubits.
pub fn state_vector_bytes(qubits: u32) -> u128 {
    BYTES_PER_AMPLITUDE << qubits
}

#[derive(Debug)]
pub struct LocalBackend {
    qubits: u32,
    channel: DiagnosticChannel,
    shut_down: bool,
}

impl LocalBackend {
    pub fn qubits(&self) -> u32 {
        self.qubits
    }
}

impl Backend for LocalBackend {
    fn id(&self) -> &str {
        "local-statevector"
    }

    fn diagnostics(&self) -> &DiagnosticChannel {
        &self.channel
    }

    fn shutdown(&mut self) -> BackendResult<()> {
        if self.shut_down {
            return Err(BackendError::Shutdown("backend already shut down".to_string()));
        }
        self.shut_down = true;
        self.channel.close();
        debug!(qubits = self.qubits, "Local backend shut down");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalBackendFactory {
    qubits: u32,
    memory_limit_bytes: u64,
}

impl LocalBackendFactory {
    #[must_use]
    pub fn new(qubits: u32, memory_limit_bytes: u64) -> Self {
        Self { qubits, memory_limit_bytes }
    }

    #[must_use]
    pub fn from_config(config: &BackendConfig) -> Self {
        Self::new(config.qubits, config.memory_limit_mb.saturating_mul(1024 * 1024))
    }
}

impl BackendFactory for LocalBackendFactory {
    fn id(&self) -> &'static str {
        "local"
    }

    fn create(&self) -> BackendResult<Box<dyn Backend>> {
        if self.qubits == 0 || self.qubits > MAX_QUBITS {
            return Err(BackendError::InvalidConfig(format!(
                "qubits must be within 1..={MAX_QUBITS}, got {}",
                self.qubits
            )));
        }

        let required = state_vector_bytes(self.qubits);
        let limit = u128::from(self.memory_limit_bytes);
        if required > limit {
            return Err(BackendError::InsufficientMemory { required, limit });
        }

        debug!(qubits = self.qubits, bytes = %required, "Local backend created");
        Ok(Box::new(LocalBackend { qubits: self.qubits, channel: DiagnosticChannel::new(), shut_down: false }))
    }
}
