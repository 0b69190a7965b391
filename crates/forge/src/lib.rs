//! Build orchestration for Cinder toolchain releases.
//!
//! Structure:
//! - `platform` - supported target catalog and cross-compilation predicate
//! - `toolchain` - compiler triad selection and helper-tool requirements
//! - `plan` - per-invocation build plan
//! - `options` - layered CMake option composition
//! - `stage` - stage sequencing over the build-system collaborator
//! - `runner` - the real CMake/Ninja collaborator
//! - `source` - source checkout fetch and branch policy
//! - `package` - release staging and archive creation
//! - `preflight`, `lock`, `config`, `host` - run setup

pub mod config;
pub mod host;
pub mod lock;
pub mod options;
pub mod package;
pub mod plan;
pub mod platform;
pub mod preflight;
pub mod runner;
pub mod source;
pub mod stage;
pub mod toolchain;
