use crate::diagnostics::DiagnosticChannel;
use crate::error::BackendResult;

/// A computational backend that training and validation stages execute against.
///
/// Implementations own whatever native resources the engine needs. The harness
/// calls [`shutdown`](Backend::shutdown) exactly once before dropping the backend.
pub trait Backend: Send + Sync {
    fn id(&self) -> &str;

    fn diagnostics(&self) -> &DiagnosticChannel;

    fn shutdown(&mut self) -> BackendResult<()>;
}

/// Constructs backend instances on demand.
pub trait BackendFactory: Send + Sync {
    fn id(&self) -> &'static str;

    fn create(&self) -> BackendResult<Box<dyn Backend>>;
}
