//! Environment configuration.
//!
//! The whole configuration surface is environment variables, read once at
//! startup into an immutable `Config`. Nothing downstream touches the
//! process environment again.

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Release tag built when `FORGE_VERSION` is unset.
pub const DEFAULT_VERSION: &str = "19.1.2";

#[derive(Clone, Debug)]
pub struct Config {
    /// Release version tag, e.g. `19.1.2`. Also selects the source branch.
    pub version: String,
    /// Checkout location of the Cinder source tree.
    pub source_dir: PathBuf,
    /// Root under which per-target build trees live.
    pub build_root: PathBuf,
    /// Where release archives are written.
    pub dist_dir: PathBuf,
    /// Override for the native helper tool install directory. Populated
    /// internally when unset.
    pub helper_dir: Option<PathBuf>,
    /// Retain per-target build trees after the run.
    pub keep_build: bool,
    /// Worker count handed to the build system.
    pub jobs: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let jobs = match std::env::var("FORGE_JOBS") {
            Ok(raw) => raw
                .parse::<usize>()
                .ok()
                .filter(|&n| n > 0)
                .with_context(|| format!("FORGE_JOBS must be a positive integer, got `{raw}`"))?,
            Err(_) => default_jobs(),
        };

        Ok(Config {
            version: std::env::var("FORGE_VERSION").unwrap_or_else(|_| DEFAULT_VERSION.to_string()),
            source_dir: path_var("FORGE_SOURCE_DIR", "cinder"),
            build_root: path_var("FORGE_BUILD_DIR", "build"),
            dist_dir: PathBuf::from("dist"),
            helper_dir: std::env::var_os("FORGE_HELPER_DIR").map(PathBuf::from),
            keep_build: flag_set(std::env::var("FORGE_KEEP_BUILD").ok().as_deref()),
            jobs,
        })
    }
}

fn path_var(name: &str, default: &str) -> PathBuf {
    std::env::var_os(name)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}

/// A flag variable counts as set unless it is empty or `0`.
fn flag_set(value: Option<&str>) -> bool {
    match value {
        Some("") | Some("0") | None => false,
        Some(_) => true,
    }
}

fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZero::get)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_set() {
        assert!(!flag_set(None));
        assert!(!flag_set(Some("")));
        assert!(!flag_set(Some("0")));
        assert!(flag_set(Some("1")));
        assert!(flag_set(Some("yes")));
    }

    #[test]
    fn test_default_jobs_is_positive() {
        assert!(default_jobs() >= 1);
    }
}
