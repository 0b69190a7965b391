//! CMake/Ninja invocation.
//!
//! The build system is an external collaborator: forge hands it a flag list
//! and a source directory, waits, and treats any non-zero exit as fatal for
//! the stage. Compilation parallelism lives entirely inside Ninja.

use crate::stage::{BuildRunner, StageDescriptor};
use anyhow::{bail, Context, Result};
use std::path::Path;
use std::process::Command;

pub struct NinjaRunner {
    jobs: usize,
}

impl NinjaRunner {
    pub fn new(jobs: usize) -> Self {
        NinjaRunner { jobs }
    }
}

impl BuildRunner for NinjaRunner {
    fn configure(&mut self, stage: &StageDescriptor, source_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(&stage.build_dir)
            .with_context(|| format!("failed to create {}", stage.build_dir.display()))?;
        // The build dir is the working directory, so the source path must
        // stay valid from there.
        let source_dir = std::fs::canonicalize(source_dir)
            .with_context(|| format!("source checkout missing at {}", source_dir.display()))?;

        println!("  configure: {}", stage.build_dir.display());
        let mut cmd = Command::new("cmake");
        cmd.current_dir(&stage.build_dir);
        cmd.args(["-G", "Ninja"]);
        cmd.args(stage.options.to_flags());
        cmd.arg(source_dir.join("llvm"));
        run(cmd, "cmake")
    }

    fn build(&mut self, stage: &StageDescriptor) -> Result<()> {
        println!("  build: {} (-j {})", stage.build_dir.display(), self.jobs);
        let mut cmd = Command::new("ninja");
        cmd.current_dir(&stage.build_dir);
        cmd.args(ninja_args(self.jobs, stage.build_targets));
        run(cmd, "ninja")
    }

    fn install(&mut self, stage: &StageDescriptor) -> Result<()> {
        println!("  install: {}", stage.install_dir.display());
        let mut cmd = Command::new("ninja");
        cmd.current_dir(&stage.build_dir);
        cmd.args(ninja_args(self.jobs, stage.install_targets));
        run(cmd, "ninja")
    }
}

fn ninja_args(jobs: usize, targets: &[&str]) -> Vec<String> {
    let mut args = vec!["-j".to_string(), jobs.to_string()];
    args.extend(targets.iter().map(ToString::to_string));
    args
}

/// Ninja's own diagnostics go straight to our stdout/stderr; on failure the
/// exit status is reported as-is.
fn run(mut cmd: Command, name: &str) -> Result<()> {
    let status = cmd
        .status()
        .with_context(|| format!("failed to launch `{name}`"))?;
    if !status.success() {
        bail!("`{name}` exited with {status}");
    }
    Ok(())
}
