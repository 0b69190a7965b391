//! Per-target build lock.
//!
//! Two runs for the same target would share build and install directories, so
//! they are serialized with a lock file under the build root. Different
//! targets use disjoint, target-namespaced paths and need no coordination.

use crate::platform::Target;
use anyhow::{Context, Result};
use lockfile::Lockfile;
use std::path::Path;

/// Held for the duration of a run; the lock file is removed on drop.
pub struct BuildLock {
    _file: Lockfile,
}

pub fn acquire(build_root: &Path, target: &Target) -> Result<BuildLock> {
    std::fs::create_dir_all(build_root)
        .with_context(|| format!("failed to create {}", build_root.display()))?;
    let path = build_root.join(format!("{}.lock", target.triple()));
    let file = Lockfile::create(&path).with_context(|| {
        format!(
            "could not take build lock {} (is another run for this target active?)",
            path.display()
        )
    })?;
    Ok(BuildLock { _file: file })
}
