//! CLI configuration loading and merging.

use anyhow::Context;
use qcc_core::HarnessConfig;
use std::path::Path;

/// Load and merge CLI configuration.
///
/// Configuration precedence:
/// 1. CLI arguments (applied by each command)
/// 2. Environment variables (QCC_*)
/// 3. Explicit config file (--config)
/// 4. Local config file (./.qccrc)
/// 5. Global config file (~/.qcc/config.toml)
/// 6. Defaults
pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<HarnessConfig> {
    HarnessConfig::discover_and_load(explicit).context("Failed to load configuration")
}
