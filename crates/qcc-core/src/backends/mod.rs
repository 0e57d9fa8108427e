//! Concrete backends shipped with the harness.

pub mod local;

pub use local::{LocalBackend, LocalBackendFactory};
