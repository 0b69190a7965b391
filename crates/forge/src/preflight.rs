//! Host tool checks.
//!
//! Everything the run will shell out to is verified up front, so a missing
//! tool fails in a second instead of after a long stage.

use anyhow::{bail, Result};

/// External tools every run needs, cross or native.
const REQUIRED_TOOLS: &[&str] = &["git", "cmake", "ninja", "tar", "xz"];

/// Check all required tools, reporting every missing one.
pub fn check() -> Result<()> {
    let missing = missing_tools(REQUIRED_TOOLS);
    if !missing.is_empty() {
        for tool in &missing {
            eprintln!("[FAIL] missing `{tool}` in PATH");
        }
        bail!("missing required tools: {}", missing.join(", "));
    }
    Ok(())
}

fn missing_tools(tools: &[&str]) -> Vec<String> {
    tools
        .iter()
        .filter(|tool| which::which(tool).is_err())
        .map(ToString::to_string)
        .collect()
}
