//! Target platform catalog.
//!
//! The set of platforms Cinder releases are built for is a fixed table.
//! Matching is exact: a typo'd or unknown triple is rejected up front rather
//! than silently building the wrong platform.

use crate::host::{Arch, Family, Host};
use thiserror::Error;

/// A platform the toolchain can be built for.
///
/// Wraps one entry of the catalog; only [`resolve`] creates these, so holding
/// a `Target` proves the triple was recognized.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Target {
    triple: &'static str,
    arch: Arch,
    family: Family,
}

impl Target {
    pub fn triple(&self) -> &'static str {
        self.triple
    }

    pub fn arch(&self) -> Arch {
        self.arch
    }

    pub fn family(&self) -> Family {
        self.family
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.triple)
    }
}

/// Supported release targets.
const TARGETS: &[Target] = &[
    Target {
        triple: "x86_64-linux-gnu",
        arch: Arch::X86_64,
        family: Family::Linux,
    },
    Target {
        triple: "aarch64-linux-gnu",
        arch: Arch::Aarch64,
        family: Family::Linux,
    },
    Target {
        triple: "x86_64-apple-darwin",
        arch: Arch::X86_64,
        family: Family::Apple,
    },
    Target {
        triple: "aarch64-apple-darwin",
        arch: Arch::Aarch64,
        family: Family::Apple,
    },
    Target {
        triple: "x86_64-w64-mingw32",
        arch: Arch::X86_64,
        family: Family::Windows,
    },
    Target {
        triple: "i686-w64-mingw32",
        arch: Arch::I686,
        family: Family::Windows,
    },
    Target {
        triple: "aarch64-w64-mingw32",
        arch: Arch::Aarch64,
        family: Family::Windows,
    },
];

#[derive(Debug, Error)]
#[error("unsupported target `{0}`")]
pub struct UnsupportedTarget(pub String);

/// Look up a target triple in the catalog.
pub fn resolve(triple: &str) -> Result<Target, UnsupportedTarget> {
    TARGETS
        .iter()
        .find(|t| t.triple == triple)
        .copied()
        .ok_or_else(|| UnsupportedTarget(triple.to_string()))
}

/// All catalog triples, for diagnostics.
pub fn supported_triples() -> impl Iterator<Item = &'static str> {
    TARGETS.iter().map(|t| t.triple)
}

/// Whether building `target` on `host` needs a cross toolchain.
///
/// Windows targets are built with a mingw toolchain on every host except
/// Windows itself; everything else cross-compiles exactly when the target
/// architecture or OS family differs from the host's.
pub fn requires_cross(target: &Target, host: &Host) -> bool {
    if target.family() == Family::Windows && host.family != Family::Windows {
        return true;
    }
    target.arch() != host.arch || target.family() != host.family
}
