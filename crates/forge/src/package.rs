//! Release packaging.
//!
//! A finished install tree is copied into a per-target release directory
//! under a fixed top-level name, then compressed into the versioned archive.
//! The release directory is recreated from scratch every time so it always
//! reflects exactly the most recent successful build, never a merge of two.

use crate::platform::Target;
use crate::stage::Packager;
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

/// Top-level directory name inside every release archive.
pub const ARCHIVE_ROOT: &str = "cinder";

/// The install tree a stage claimed to produce is not there. That is a
/// sequencing bug, not an environment problem.
#[derive(Debug, Error)]
#[error("install tree missing at {0}; an upstream stage misreported success")]
pub struct MissingInstallTree(pub PathBuf);

pub struct DistPackager {
    dist_dir: PathBuf,
    version: String,
}

impl DistPackager {
    pub fn new(dist_dir: PathBuf, version: String) -> Self {
        DistPackager { dist_dir, version }
    }
}

impl Packager for DistPackager {
    fn package(&mut self, target: &Target, install_dir: &Path) -> Result<PathBuf> {
        package(&self.dist_dir, &self.version, target, install_dir)
    }
}

pub fn archive_name(version: &str, target: &Target) -> String {
    format!("{version}-{}.tar.xz", target.triple())
}

/// Build the release archive for `target` from `install_dir`.
pub fn package(
    dist_dir: &Path,
    version: &str,
    target: &Target,
    install_dir: &Path,
) -> Result<PathBuf> {
    if !install_dir.is_dir() {
        return Err(MissingInstallTree(install_dir.to_path_buf()).into());
    }

    let staging = stage_release_tree(dist_dir, target, install_dir)?;

    let archive = dist_dir.join(archive_name(version, target));
    if archive.exists() {
        fs::remove_file(&archive)?;
    }
    compress(&staging, &archive)?;

    let size = fs::metadata(&archive)?.len();
    println!(
        "  archive: {} ({:.1} MB)",
        archive.display(),
        size as f64 / 1_000_000.0
    );
    Ok(archive)
}

/// Recreate `dist/<triple>/` and copy the install tree beneath
/// [`ARCHIVE_ROOT`]. Destructive on purpose: stale contents from an earlier
/// run must not leak into the new release.
pub fn stage_release_tree(dist_dir: &Path, target: &Target, install_dir: &Path) -> Result<PathBuf> {
    let staging = dist_dir.join(target.triple());
    if staging.exists() {
        fs::remove_dir_all(&staging)
            .with_context(|| format!("failed to clear release dir {}", staging.display()))?;
    }
    fs::create_dir_all(&staging)?;
    copy_tree(install_dir, &staging.join(ARCHIVE_ROOT))?;
    Ok(staging)
}

fn compress(staging: &Path, archive: &Path) -> Result<()> {
    let status = Command::new("tar")
        .arg("-C")
        .arg(staging)
        .arg("-cJf")
        .arg(archive)
        .arg(ARCHIVE_ROOT)
        .status()
        .context("failed to run tar")?;
    if !status.success() {
        bail!("`tar` exited with {status}");
    }
    Ok(())
}

/// Copy a directory recursively, preserving symlinks (install trees link
/// clang++ to clang and similar).
fn copy_tree(src: &Path, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest)?;
    for entry in
        fs::read_dir(src).with_context(|| format!("failed to read {}", src.display()))?
    {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let to = dest.join(entry.file_name());
        if file_type.is_dir() {
            copy_tree(&entry.path(), &to)?;
        } else if file_type.is_symlink() {
            copy_link(&entry.path(), &to)?;
        } else {
            fs::copy(entry.path(), &to)
                .with_context(|| format!("failed to copy {}", entry.path().display()))?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_link(from: &Path, to: &Path) -> Result<()> {
    let link = fs::read_link(from)?;
    std::os::unix::fs::symlink(link, to)
        .with_context(|| format!("failed to link {}", to.display()))?;
    Ok(())
}

#[cfg(not(unix))]
fn copy_link(from: &Path, to: &Path) -> Result<()> {
    fs::copy(from, to).with_context(|| format!("failed to copy {}", from.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::resolve;

    fn fake_install_tree(root: &Path) {
        for dir in ["bin", "include/clang", "lib", "share"] {
            fs::create_dir_all(root.join(dir)).unwrap();
        }
        fs::write(root.join("bin/clang"), b"#!fake").unwrap();
        fs::write(root.join("lib/libclang.a"), b"ar").unwrap();
        #[cfg(unix)]
        std::os::unix::fs::symlink("clang", root.join("bin/clang++")).unwrap();
    }

    #[test]
    fn test_archive_name() {
        let target = resolve("aarch64-linux-gnu").unwrap();
        assert_eq!(
            archive_name("19.1.2", &target),
            "19.1.2-aarch64-linux-gnu.tar.xz"
        );
    }

    #[test]
    fn test_stage_release_tree_copies_under_archive_root() {
        let tmp = tempfile::tempdir().unwrap();
        let install = tmp.path().join("install");
        fake_install_tree(&install);
        let dist = tmp.path().join("dist");
        let target = resolve("x86_64-linux-gnu").unwrap();

        let staging = stage_release_tree(&dist, &target, &install).unwrap();

        assert_eq!(staging, dist.join("x86_64-linux-gnu"));
        assert!(staging.join("cinder/bin/clang").is_file());
        assert!(staging.join("cinder/lib/libclang.a").is_file());
        assert!(staging.join("cinder/include/clang").is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn test_stage_release_tree_preserves_symlinks() {
        let tmp = tempfile::tempdir().unwrap();
        let install = tmp.path().join("install");
        fake_install_tree(&install);
        let dist = tmp.path().join("dist");
        let target = resolve("x86_64-linux-gnu").unwrap();

        let staging = stage_release_tree(&dist, &target, &install).unwrap();

        let link = staging.join("cinder/bin/clang++");
        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_link(&link).unwrap(), PathBuf::from("clang"));
    }

    #[test]
    fn test_stage_release_tree_is_destructive() {
        let tmp = tempfile::tempdir().unwrap();
        let install = tmp.path().join("install");
        fake_install_tree(&install);
        let dist = tmp.path().join("dist");
        let target = resolve("x86_64-linux-gnu").unwrap();

        // Leftovers from a previous run must not survive.
        let stale = dist.join("x86_64-linux-gnu/cinder/bin/old-tool");
        fs::create_dir_all(stale.parent().unwrap()).unwrap();
        fs::write(&stale, b"stale").unwrap();

        let staging = stage_release_tree(&dist, &target, &install).unwrap();

        assert!(!staging.join("cinder/bin/old-tool").exists());
        assert!(staging.join("cinder/bin/clang").is_file());
    }

    #[test]
    fn test_package_rejects_missing_install_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let dist = tmp.path().join("dist");
        let target = resolve("x86_64-linux-gnu").unwrap();
        let missing = tmp.path().join("no-install");

        let err = package(&dist, "19.1.2", &target, &missing).unwrap_err();

        assert!(err.downcast_ref::<MissingInstallTree>().is_some());
        // Nothing should have been staged for a bogus install tree.
        assert!(!dist.join("x86_64-linux-gnu").exists());
    }
}
