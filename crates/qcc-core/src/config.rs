//! Harness configuration file support.
//!
//! Configuration precedence (highest first):
//! 1. CLI arguments (applied by the binary)
//! 2. Environment variables (`QCC_*`)
//! 3. Explicit config file (`--config`)
//! 4. Local config file (`./.qccrc`)
//! 5. Global config file (`~/.qcc/config.toml`)
//! 6. Defaults

use crate::handle::HandleOptions;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Harness configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Log level
    #[serde(default)]
    pub log_level: Option<String>,

    /// Backend sizing
    #[serde(default)]
    pub backend: BackendConfig,

    /// Diagnostic output
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,

    /// Output format preferences
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Register width of the local state-vector backend.
    #[serde(default = "default_qubits")]
    pub qubits: u32,

    /// Memory the backend may claim, in MiB.
    #[serde(default = "default_memory_limit_mb")]
    pub memory_limit_mb: u64,
}

fn default_qubits() -> u32 {
    8
}

fn default_memory_limit_mb() -> u64 {
    1024
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self { qubits: default_qubits(), memory_limit_mb: default_memory_limit_mb() }
    }
}

/// Where timestamped diagnostic lines go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticsOutput {
    #[default]
    Stdout,
    Tracing,
    Off,
}

impl FromStr for DiagnosticsOutput {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stdout" => Ok(Self::Stdout),
            "tracing" => Ok(Self::Tracing),
            "off" | "none" => Ok(Self::Off),
            other => Err(ConfigError::InvalidValue(format!("unknown diagnostics output: {other}"))),
        }
    }
}

impl fmt::Display for DiagnosticsOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdout => f.write_str("stdout"),
            Self::Tracing => f.write_str("tracing"),
            Self::Off => f.write_str("off"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    #[serde(default)]
    pub output: DiagnosticsOutput,

    /// Silence the backend's raw stdout output.
    #[serde(default = "default_true")]
    pub disable_default_sink: bool,
}

fn default_true() -> bool {
    true
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self { output: DiagnosticsOutput::default(), disable_default_sink: true }
    }
}

impl DiagnosticsConfig {
    pub fn handle_options(&self) -> HandleOptions {
        HandleOptions { disable_default_sink: self.disable_default_sink }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

/// Output format configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

/// A single configuration file as written.
///
/// Keys absent from the file stay `None`, so a layer that sets a value back to
/// its default still overrides the layers beneath it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ConfigLayer {
    pub log_level: Option<String>,
    #[serde(default)]
    pub backend: BackendLayer,
    #[serde(default)]
    pub diagnostics: DiagnosticsLayer,
    #[serde(default)]
    pub output: OutputLayer,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BackendLayer {
    pub qubits: Option<u32>,
    pub memory_limit_mb: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DiagnosticsLayer {
    pub output: Option<DiagnosticsOutput>,
    pub disable_default_sink: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OutputLayer {
    pub format: Option<OutputFormat>,
}

impl ConfigLayer {
    /// Load one layer from a TOML file.
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))
    }
}

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found.
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    /// Failed to read configuration file.
    #[error("Failed to read configuration file: {0}")]
    ReadError(String),

    /// Failed to parse configuration file.
    #[error("Failed to parse configuration file: {0}")]
    ParseError(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

impl HarnessConfig {
    /// Load configuration from a TOML file, filling unset keys with defaults.
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let mut config = Self::default();
        config.merge(&ConfigLayer::load_from_file(path)?);
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save_to_file(&self, path: &Path) -> ConfigResult<()> {
        let content = self.to_toml()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::ReadError(format!("Failed to create directory: {}", e)))?;
        }

        std::fs::write(path, content).map_err(|e| ConfigError::ReadError(format!("Failed to write file: {}", e)))
    }

    pub fn to_toml(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(format!("Failed to serialize: {}", e)))
    }

    /// Get default global configuration file path.
    pub fn default_global_path() -> PathBuf {
        std::env::var("HOME").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from(".")).join(".qcc").join("config.toml")
    }

    /// Get default local configuration file path.
    pub fn default_local_path() -> PathBuf {
        PathBuf::from(".qccrc")
    }

    /// Discover and load configuration files, then apply environment overrides.
    ///
    /// Missing files are skipped. A file that exists but cannot be parsed is an
    /// error, as is an explicit path that does not exist.
    pub fn discover_and_load(explicit: Option<&Path>) -> ConfigResult<Self> {
        let mut config = Self::default();

        for path in [Self::default_global_path(), Self::default_local_path()] {
            match ConfigLayer::load_from_file(&path) {
                Ok(layer) => config.merge(&layer),
                Err(ConfigError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }

        if let Some(path) = explicit {
            config.merge(&ConfigLayer::load_from_file(path)?);
        }

        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Merge a file layer into this configuration.
    ///
    /// Every key the layer sets overrides the current value.
    pub fn merge(&mut self, layer: &ConfigLayer) {
        if let Some(ref log_level) = layer.log_level {
            self.log_level = Some(log_level.clone());
        }
        if let Some(qubits) = layer.backend.qubits {
            self.backend.qubits = qubits;
        }
        if let Some(limit) = layer.backend.memory_limit_mb {
            self.backend.memory_limit_mb = limit;
        }
        if let Some(output) = layer.diagnostics.output {
            self.diagnostics.output = output;
        }
        if let Some(disable) = layer.diagnostics.disable_default_sink {
            self.diagnostics.disable_default_sink = disable;
        }
        if let Some(format) = layer.output.format {
            self.output.format = format;
        }
    }

    /// Apply `QCC_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> ConfigResult<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply `QCC_*` overrides using `lookup` to read variables.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup("QCC_LOG_LEVEL") {
            self.log_level = Some(level);
        }
        if let Some(qubits) = lookup("QCC_QUBITS") {
            self.backend.qubits = qubits
                .trim()
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("QCC_QUBITS={qubits}: {e}")))?;
        }
        if let Some(limit) = lookup("QCC_MEMORY_LIMIT_MB") {
            self.backend.memory_limit_mb = limit
                .trim()
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("QCC_MEMORY_LIMIT_MB={limit}: {e}")))?;
        }
        if let Some(output) = lookup("QCC_DIAGNOSTICS") {
            self.diagnostics.output = output.parse()?;
        }
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(ref level) = self.log_level {
            if !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
                return Err(ConfigError::InvalidValue(format!("unknown log level: {level}")));
            }
        }
        if self.backend.qubits == 0 {
            return Err(ConfigError::InvalidValue("backend.qubits must be >= 1".to_string()));
        }
        if self.backend.memory_limit_mb == 0 {
            return Err(ConfigError::InvalidValue("backend.memory_limit_mb must be >= 1".to_string()));
        }
        Ok(())
    }
}
