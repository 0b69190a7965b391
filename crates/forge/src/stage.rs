//! Stage sequencing.
//!
//! One run is either a single configure/build/install pass or a two-stage
//! bootstrap, optionally preceded by a native helper-tool build on cross
//! targets. The sequencer drives those phases in order over a [`BuildRunner`]
//! collaborator; a failure in any phase is fatal for the run, with no retry,
//! because toolchain builds are hours long and not safe to blindly re-enter.

use crate::config::Config;
use crate::options::{compose, ComposeCtx, OptionSet};
use crate::plan::BuildPlan;
use crate::platform::Target;
use crate::toolchain::HELPER_TOOLS;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// One phase of a build.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageKind {
    /// Native tablegen pre-build for cross targets.
    Helpers,
    Single,
    Stage1,
    Stage2,
}

impl StageKind {
    /// Build-system targets produced by this stage. Empty means the default
    /// (everything).
    pub fn build_targets(self) -> &'static [&'static str] {
        match self {
            StageKind::Helpers => HELPER_TOOLS,
            StageKind::Stage1 => &["clang", "lld"],
            StageKind::Single | StageKind::Stage2 => &[],
        }
    }

    /// Install targets for this stage. Stage 1 installs only the components
    /// the stage 2 bootstrap needs.
    pub fn install_targets(self) -> &'static [&'static str] {
        match self {
            StageKind::Helpers => &["install-llvm-tblgen", "install-clang-tblgen"],
            StageKind::Stage1 => &[
                "install-clang",
                "install-lld",
                "install-clang-resource-headers",
            ],
            StageKind::Single | StageKind::Stage2 => &["install"],
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            StageKind::Helpers => "native helpers",
            StageKind::Single => "build",
            StageKind::Stage1 => "stage 1",
            StageKind::Stage2 => "stage 2",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Configure,
    Build,
    Install,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Step::Configure => "configure",
            Step::Build => "build",
            Step::Install => "install",
        })
    }
}

/// Where the sequencer currently is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Idle,
    NativeHelper,
    Single,
    Stage1,
    Stage2,
    Packaging,
    Done,
    Failed,
}

#[derive(Debug, Error)]
pub enum StageError {
    #[error("native helper build failed at {step}: {err}")]
    Helpers { step: Step, err: anyhow::Error },
    #[error("{kind} failed at {step}: {err}")]
    Stage {
        kind: StageKind,
        step: Step,
        err: anyhow::Error,
    },
    #[error("packaging failed: {err}")]
    Packaging { err: anyhow::Error },
}

/// Per-target directory layout under the build root.
///
/// Every stage gets its own build/install pair, so no two stages or targets
/// can write to the same path.
#[derive(Clone, Debug)]
pub struct Layout {
    target_root: PathBuf,
    helper_dir: PathBuf,
}

impl Layout {
    pub fn new(cfg: &Config, target: &Target) -> Self {
        let target_root = cfg.build_root.join(target.triple());
        let helper_dir = cfg
            .helper_dir
            .clone()
            .unwrap_or_else(|| target_root.join("helpers"));
        Layout {
            target_root,
            helper_dir,
        }
    }

    /// Root of everything this run writes for its target.
    pub fn target_root(&self) -> &Path {
        &self.target_root
    }

    /// Published location of the native tablegen helpers.
    pub fn helper_dir(&self) -> &Path {
        &self.helper_dir
    }

    pub fn build_dir(&self, kind: StageKind) -> PathBuf {
        match kind {
            StageKind::Helpers => self.target_root.join("helpers-build"),
            StageKind::Single => self.target_root.join("build"),
            StageKind::Stage1 => self.target_root.join("stage1"),
            StageKind::Stage2 => self.target_root.join("stage2"),
        }
    }

    pub fn install_dir(&self, kind: StageKind) -> PathBuf {
        match kind {
            StageKind::Helpers => self.helper_dir.clone(),
            StageKind::Stage1 => self.target_root.join("stage1-install"),
            StageKind::Single | StageKind::Stage2 => self.target_root.join("install"),
        }
    }
}

/// A fully composed stage, ready to hand to the build system.
#[derive(Clone, Debug)]
pub struct StageDescriptor {
    pub kind: StageKind,
    pub options: OptionSet,
    pub build_dir: PathBuf,
    pub install_dir: PathBuf,
    pub build_targets: &'static [&'static str],
    pub install_targets: &'static [&'static str],
}

impl StageDescriptor {
    pub fn new(plan: &BuildPlan, layout: &Layout, kind: StageKind) -> Self {
        let install_dir = layout.install_dir(kind);
        let stage1_install = layout.install_dir(StageKind::Stage1);
        let ctx = ComposeCtx {
            target: plan.target(),
            host: plan.host(),
            toolchain: plan.toolchain(),
            cross: plan.cross(),
            helper_dir: layout.helper_dir(),
            stage1_install: (kind == StageKind::Stage2).then_some(stage1_install.as_path()),
        };
        let options = compose(&ctx, kind, &install_dir);
        StageDescriptor {
            kind,
            options,
            build_dir: layout.build_dir(kind),
            install_dir,
            build_targets: kind.build_targets(),
            install_targets: kind.install_targets(),
        }
    }
}

/// The external build system, behind a seam so the sequencer's transitions
/// can be exercised without launching real processes.
pub trait BuildRunner {
    fn configure(&mut self, stage: &StageDescriptor, source_dir: &Path) -> anyhow::Result<()>;
    fn build(&mut self, stage: &StageDescriptor) -> anyhow::Result<()>;
    fn install(&mut self, stage: &StageDescriptor) -> anyhow::Result<()>;
}

/// Turns a finished install tree into a release archive.
pub trait Packager {
    fn package(&mut self, target: &Target, install_dir: &Path) -> anyhow::Result<PathBuf>;
}

pub struct Sequencer<'a, R: BuildRunner> {
    plan: &'a BuildPlan,
    layout: &'a Layout,
    source_dir: &'a Path,
    runner: R,
    state: RunState,
}

impl<'a, R: BuildRunner> Sequencer<'a, R> {
    pub fn new(plan: &'a BuildPlan, layout: &'a Layout, source_dir: &'a Path, runner: R) -> Self {
        Sequencer {
            plan,
            layout,
            source_dir,
            runner,
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Drive the whole run: helpers (cross only), then the stage sequence,
    /// then packaging. Returns the archive path.
    pub fn run(&mut self, packager: &mut dyn Packager) -> Result<PathBuf, StageError> {
        if self.plan.needs_helpers() {
            self.state = RunState::NativeHelper;
            println!("=== Building native helpers ===");
            let helpers = StageDescriptor::new(self.plan, self.layout, StageKind::Helpers);
            if let Err((step, err)) = self.exec(&helpers) {
                self.state = RunState::Failed;
                return Err(StageError::Helpers { step, err });
            }
            println!("  published: {}", self.layout.helper_dir().display());
        }

        let kinds: &[StageKind] = if self.plan.two_stage() {
            &[StageKind::Stage1, StageKind::Stage2]
        } else {
            &[StageKind::Single]
        };

        for &kind in kinds {
            self.state = match kind {
                StageKind::Single => RunState::Single,
                StageKind::Stage1 => RunState::Stage1,
                StageKind::Stage2 => RunState::Stage2,
                StageKind::Helpers => RunState::NativeHelper,
            };
            println!("=== {} ({}) ===", kind, self.plan.target());
            let stage = StageDescriptor::new(self.plan, self.layout, kind);
            if let Err((step, err)) = self.exec(&stage) {
                self.state = RunState::Failed;
                return Err(StageError::Stage { kind, step, err });
            }
        }

        let final_kind = if self.plan.two_stage() {
            StageKind::Stage2
        } else {
            StageKind::Single
        };
        let install_dir = self.layout.install_dir(final_kind);

        self.state = RunState::Packaging;
        println!("=== Packaging {} ===", self.plan.target());
        match packager.package(self.plan.target(), &install_dir) {
            Ok(archive) => {
                self.state = RunState::Done;
                Ok(archive)
            }
            Err(err) => {
                self.state = RunState::Failed;
                Err(StageError::Packaging { err })
            }
        }
    }

    fn exec(&mut self, stage: &StageDescriptor) -> Result<(), (Step, anyhow::Error)> {
        self.runner
            .configure(stage, self.source_dir)
            .map_err(|e| (Step::Configure, e))?;
        self.runner.build(stage).map_err(|e| (Step::Build, e))?;
        self.runner.install(stage).map_err(|e| (Step::Install, e))?;
        Ok(())
    }
}
