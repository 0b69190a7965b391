//! Host machine detection.
//!
//! The OS family and CPU architecture are detected once at process start and
//! threaded through everything downstream; nothing re-reads the ambient
//! environment mid-build.

use anyhow::{bail, Result};

/// Operating system family of a build host or target platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Family {
    Linux,
    Apple,
    Windows,
}

impl Family {
    /// Name used by CMake's `CMAKE_SYSTEM_NAME`.
    pub fn cmake_system_name(self) -> &'static str {
        match self {
            Family::Linux => "Linux",
            Family::Apple => "Darwin",
            Family::Windows => "Windows",
        }
    }
}

/// CPU architecture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arch {
    X86_64,
    I686,
    Aarch64,
}

/// The machine running the orchestrator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Host {
    pub family: Family,
    pub arch: Arch,
}

impl Host {
    /// Detect the host from the compiled-in platform constants.
    pub fn detect() -> Result<Self> {
        Ok(Host {
            family: family_from_os(std::env::consts::OS)?,
            arch: arch_from_name(std::env::consts::ARCH)?,
        })
    }
}

fn family_from_os(os: &str) -> Result<Family> {
    match os {
        "linux" => Ok(Family::Linux),
        "macos" => Ok(Family::Apple),
        "windows" => Ok(Family::Windows),
        _ => bail!("unsupported host operating system: {os}"),
    }
}

fn arch_from_name(arch: &str) -> Result<Arch> {
    match arch {
        "x86_64" => Ok(Arch::X86_64),
        "x86" => Ok(Arch::I686),
        "aarch64" => Ok(Arch::Aarch64),
        _ => bail!("unsupported host architecture: {arch}"),
    }
}
