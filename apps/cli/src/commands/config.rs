//! Config command implementation.

use anyhow::Context;
use qcc_core::HarnessConfig;

/// Print the effective configuration as TOML.
pub fn execute(config: &HarnessConfig) -> anyhow::Result<()> {
    let rendered = config.to_toml().context("Failed to render configuration")?;
    print!("{rendered}");
    Ok(())
}
