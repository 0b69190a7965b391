//! Source checkout management.
//!
//! Cinder release branches follow the `release/<major>.x` convention, so the
//! branch to build is derived from the version tag. An existing checkout is
//! reused only when it is on the expected branch; otherwise it is discarded
//! and fetched again rather than building from the wrong line.

use anyhow::{bail, Context, Result};
use std::path::Path;
use std::process::Command;

pub const SOURCE_URL: &str = "https://github.com/cinder-lang/cinder.git";

/// Map a version tag to its release branch: `19.1.2` -> `release/19.x`.
pub fn release_branch(version: &str) -> Result<String> {
    let major = version
        .split('.')
        .next()
        .filter(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
        .with_context(|| format!("cannot derive a release branch from version `{version}`"))?;
    Ok(format!("release/{major}.x"))
}

/// Make sure the source checkout exists and is on the right branch.
pub fn ensure(source_dir: &Path, version: &str) -> Result<()> {
    let branch = release_branch(version)?;
    println!("=== Source ===");

    if source_dir.exists() {
        if !source_dir.join(".git").exists() {
            bail!(
                "{} exists but is not a git checkout; remove it and retry",
                source_dir.display()
            );
        }
        let current = current_branch(source_dir)?;
        if current == branch {
            println!("  cached: {} ({branch})", source_dir.display());
            return Ok(());
        }
        println!("  checkout is on {current}, want {branch}; refetching");
        std::fs::remove_dir_all(source_dir)
            .with_context(|| format!("failed to remove stale checkout {}", source_dir.display()))?;
    }

    clone(source_dir, &branch)
}

fn current_branch(dir: &Path) -> Result<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--abbrev-ref", "HEAD"])
        .current_dir(dir)
        .output()
        .context("failed to run git")?;
    if !output.status.success() {
        bail!("git rev-parse failed in {}", dir.display());
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn clone(dest: &Path, branch: &str) -> Result<()> {
    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    println!("  fetching {SOURCE_URL} @ {branch}...");
    let status = Command::new("git")
        .args(["clone", "--depth", "1", "--single-branch", "--branch", branch, SOURCE_URL])
        .arg(dest)
        .status()
        .context("failed to run git clone")?;
    if !status.success() {
        bail!("git clone failed for branch {branch}");
    }
    Ok(())
}
