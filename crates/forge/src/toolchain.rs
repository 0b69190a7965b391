//! Compiler toolchain selection.
//!
//! Native builds use the host's default triad. Cross builds use
//! triple-prefixed binutils-style names and pin the target sysroot; they also
//! require the native tablegen helpers to be built first, since those run on
//! the host during the main build regardless of the final architecture.

use crate::host::Host;
use crate::platform::{requires_cross, Target};
use std::path::PathBuf;
use thiserror::Error;

/// Names of the code generators that must run on the host.
pub const HELPER_TOOLS: &[&str] = &["llvm-tblgen", "clang-tblgen"];

/// The compiler/archiver/strip executables a build will use.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolchainSpec {
    cc: String,
    cxx: String,
    ar: String,
    strip: String,
    sysroot: Option<PathBuf>,
}

#[derive(Debug, Error)]
#[error("cross tool `{tool}` for {triple} not found in PATH")]
pub struct MissingToolchain {
    pub tool: String,
    pub triple: &'static str,
}

/// Pick the toolchain for building `target` on `host`.
///
/// Pure name selection; PATH discovery happens in [`ToolchainSpec::verify`]
/// so the decision itself stays testable without a populated PATH.
pub fn resolve(target: &Target, host: &Host) -> ToolchainSpec {
    if requires_cross(target, host) {
        let triple = target.triple();
        ToolchainSpec {
            cc: format!("{triple}-gcc"),
            cxx: format!("{triple}-g++"),
            ar: format!("{triple}-ar"),
            strip: format!("{triple}-strip"),
            sysroot: Some(PathBuf::from(format!("/usr/{triple}"))),
        }
    } else {
        ToolchainSpec {
            cc: "cc".to_string(),
            cxx: "c++".to_string(),
            ar: "ar".to_string(),
            strip: "strip".to_string(),
            sysroot: None,
        }
    }
}

impl ToolchainSpec {
    pub fn cc(&self) -> &str {
        &self.cc
    }

    pub fn cxx(&self) -> &str {
        &self.cxx
    }

    pub fn ar(&self) -> &str {
        &self.ar
    }

    pub fn strip(&self) -> &str {
        &self.strip
    }

    /// Root under which target libraries and headers live. `None` for native
    /// builds, which search the usual host paths.
    pub fn sysroot(&self) -> Option<&std::path::Path> {
        self.sysroot.as_deref()
    }

    pub fn is_cross(&self) -> bool {
        self.sysroot.is_some()
    }

    /// Check that every tool in the spec is discoverable, reporting the first
    /// missing executable by name. Runs before any build step so a missing
    /// cross compiler aborts in seconds, not hours.
    pub fn verify(&self, target: &Target) -> Result<(), MissingToolchain> {
        for tool in [&self.cc, &self.cxx, &self.ar, &self.strip] {
            if which::which(tool).is_err() {
                return Err(MissingToolchain {
                    tool: tool.clone(),
                    triple: target.triple(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Arch, Family};
    use crate::platform::resolve as resolve_target;

    #[test]
    fn test_native_triad_has_no_prefix() {
        let target = resolve_target("x86_64-linux-gnu").unwrap();
        let host = Host {
            family: Family::Linux,
            arch: Arch::X86_64,
        };
        let spec = resolve(&target, &host);
        assert_eq!(spec.cc(), "cc");
        assert_eq!(spec.cxx(), "c++");
        assert_eq!(spec.ar(), "ar");
        assert_eq!(spec.strip(), "strip");
        assert!(spec.sysroot().is_none());
        assert!(!spec.is_cross());
    }

    #[test]
    fn test_cross_triad_is_triple_prefixed() {
        let target = resolve_target("aarch64-w64-mingw32").unwrap();
        let host = Host {
            family: Family::Linux,
            arch: Arch::X86_64,
        };
        let spec = resolve(&target, &host);
        assert_eq!(spec.cc(), "aarch64-w64-mingw32-gcc");
        assert_eq!(spec.cxx(), "aarch64-w64-mingw32-g++");
        assert_eq!(spec.ar(), "aarch64-w64-mingw32-ar");
        assert_eq!(spec.strip(), "aarch64-w64-mingw32-strip");
        assert_eq!(
            spec.sysroot().unwrap(),
            std::path::Path::new("/usr/aarch64-w64-mingw32")
        );
        assert!(spec.is_cross());
    }

    #[test]
    fn test_verify_reports_missing_tool_by_name() {
        let target = resolve_target("x86_64-w64-mingw32").unwrap();
        let spec = ToolchainSpec {
            cc: "no-such-compiler-xyzzy-gcc".to_string(),
            cxx: "no-such-compiler-xyzzy-g++".to_string(),
            ar: "no-such-compiler-xyzzy-ar".to_string(),
            strip: "no-such-compiler-xyzzy-strip".to_string(),
            sysroot: Some(PathBuf::from("/usr/x86_64-w64-mingw32")),
        };
        let err = spec.verify(&target).unwrap_err();
        assert_eq!(err.tool, "no-such-compiler-xyzzy-gcc");
        assert!(err.to_string().contains("no-such-compiler-xyzzy-gcc"));
    }
}
