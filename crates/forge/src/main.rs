//! # Cinder Forge
//!
//! Builds a release archive of the Cinder toolchain for one target platform.
//!
//! ## Usage
//!
//! ```bash
//! forge x86_64-linux-gnu        # native build, single stage
//! forge aarch64-w64-mingw32     # cross build, two-stage bootstrap
//! ```
//!
//! Configuration is environment-only: `FORGE_VERSION`, `FORGE_SOURCE_DIR`,
//! `FORGE_BUILD_DIR`, `FORGE_HELPER_DIR`, `FORGE_JOBS`, `FORGE_KEEP_BUILD`.

use anyhow::{Context, Result};
use clap::Parser;
use forge::config::Config;
use forge::host::Host;
use forge::package::DistPackager;
use forge::plan::BuildPlan;
use forge::runner::NinjaRunner;
use forge::stage::{Layout, Sequencer};
use forge::{lock, platform, preflight, source};

#[derive(Parser)]
#[command(name = "forge", about = "Cinder toolchain release builder")]
struct Cli {
    /// Target platform to build, e.g. x86_64-linux-gnu
    target: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = Config::from_env()?;
    let host = Host::detect()?;

    let target = platform::resolve(&cli.target).map_err(|err| {
        eprintln!("supported targets:");
        for triple in platform::supported_triples() {
            eprintln!("  {triple}");
        }
        err
    })?;

    preflight::check()?;

    let plan = BuildPlan::new(target, host);
    plan.toolchain().verify(&target)?;

    println!("=== Build plan ===");
    println!("  target:    {target}");
    println!("  version:   {}", cfg.version);
    println!("  cross:     {}", plan.cross());
    println!("  two-stage: {}", plan.two_stage());
    println!("  cc:        {}", plan.toolchain().cc());
    println!("  jobs:      {}", cfg.jobs);

    source::ensure(&cfg.source_dir, &cfg.version)?;

    let _lock = lock::acquire(&cfg.build_root, &target)?;
    let layout = Layout::new(&cfg, &target);

    let mut packager = DistPackager::new(cfg.dist_dir.clone(), cfg.version.clone());
    let mut sequencer = Sequencer::new(&plan, &layout, &cfg.source_dir, NinjaRunner::new(cfg.jobs));
    let result = sequencer.run(&mut packager);

    // Build trees are cleaned on success and failure alike.
    if cfg.keep_build {
        println!("  keeping build tree at {}", layout.target_root().display());
    } else if layout.target_root().exists() {
        std::fs::remove_dir_all(layout.target_root()).with_context(|| {
            format!("failed to clean build tree {}", layout.target_root().display())
        })?;
    }

    let archive = result?;
    println!("=== Done ===");
    println!("  release: {}", archive.display());
    Ok(())
}
