//! Build plan derivation.

use crate::host::{Family, Host};
use crate::platform::{requires_cross, Target};
use crate::toolchain::{self, ToolchainSpec};

/// Everything decided up front for one orchestrator invocation.
///
/// Derived once from (target, host) and read-only afterwards; a different
/// target or host means a new plan, never a mutated one.
#[derive(Clone, Debug)]
pub struct BuildPlan {
    target: Target,
    host: Host,
    toolchain: ToolchainSpec,
    cross: bool,
    two_stage: bool,
}

impl BuildPlan {
    pub fn new(target: Target, host: Host) -> Self {
        let cross = requires_cross(&target, &host);
        BuildPlan {
            target,
            host,
            toolchain: toolchain::resolve(&target, &host),
            cross,
            // Windows releases bootstrap themselves: stage 1 builds a minimal
            // clang+lld, stage 2 builds the full set.
            two_stage: target.family() == Family::Windows,
        }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn toolchain(&self) -> &ToolchainSpec {
        &self.toolchain
    }

    pub fn cross(&self) -> bool {
        self.cross
    }

    pub fn two_stage(&self) -> bool {
        self.two_stage
    }

    /// Cross builds need llvm-tblgen/clang-tblgen compiled for the host
    /// before the main build can configure.
    pub fn needs_helpers(&self) -> bool {
        self.cross
    }
}
