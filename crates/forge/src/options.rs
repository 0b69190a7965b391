//! CMake option composition.
//!
//! A build's configuration is assembled from fixed layers: base flags common
//! to every platform, a platform-family group picked by the target's triple
//! (never the host), a cross-compilation overlay, a stage overlay, and the
//! install prefix last. Later layers override earlier ones per key; the
//! flattened list is deduplicated and order-stable, so two compositions with
//! the same inputs produce identical flag lists.
//!
//! Composition is a pure function of its inputs. It never looks at the
//! filesystem or environment.

use crate::host::{Family, Host};
use crate::platform::Target;
use crate::stage::StageKind;
use crate::toolchain::ToolchainSpec;
use std::path::Path;

/// Which layer set an option. Later variants take precedence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Layer {
    Base,
    Platform,
    Cross,
    Stage,
    InstallPrefix,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Entry {
    key: String,
    value: String,
    layer: Layer,
}

/// An ordered, deduplicated set of `-DKEY=VALUE` configure flags.
///
/// Keys keep the position of their first definition so diagnostics stay
/// readable; overriding a key replaces its value in place.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OptionSet {
    entries: Vec<Entry>,
}

impl OptionSet {
    pub fn new() -> Self {
        OptionSet::default()
    }

    /// Set `key`, overriding any earlier layer's value.
    pub fn set(&mut self, layer: Layer, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.entries.iter_mut().find(|e| e.key == key) {
            Some(entry) => {
                entry.value = value;
                entry.layer = layer;
            }
            None => self.entries.push(Entry {
                key: key.to_string(),
                value,
                layer,
            }),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.value.as_str())
    }

    /// The layer that last set `key`.
    pub fn layer_of(&self, key: &str) -> Option<Layer> {
        self.entries.iter().find(|e| e.key == key).map(|e| e.layer)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Flatten into the flag list handed to the configure invocation.
    pub fn to_flags(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| format!("-D{}={}", e.key, e.value))
            .collect()
    }
}

/// Inputs the composer needs beyond the stage itself.
#[derive(Clone, Copy, Debug)]
pub struct ComposeCtx<'a> {
    pub target: &'a Target,
    pub host: &'a Host,
    pub toolchain: &'a ToolchainSpec,
    pub cross: bool,
    /// Where the native tablegen helpers were installed. Only read by the
    /// cross overlay; the helper build publishes this before any cross stage
    /// composes.
    pub helper_dir: &'a Path,
    /// Stage 1's install tree, for the stage 2 self-host handoff.
    pub stage1_install: Option<&'a Path>,
}

/// Compose the full option set for one stage.
pub fn compose(ctx: &ComposeCtx<'_>, kind: StageKind, install_dir: &Path) -> OptionSet {
    if kind == StageKind::Helpers {
        return compose_helpers(install_dir);
    }

    let mut set = OptionSet::new();
    base_layer(&mut set);
    family_layer(&mut set, ctx.target.family());
    if ctx.cross {
        cross_layer(&mut set, ctx);
    }
    stage_layer(&mut set, ctx, kind);
    set.set(
        Layer::InstallPrefix,
        "CMAKE_INSTALL_PREFIX",
        install_dir.display().to_string(),
    );
    set
}

/// Option set for the native tablegen helper build: the base configuration
/// plus utility installs, no platform or cross layers. Always compiled with
/// the host's default toolchain.
fn compose_helpers(install_dir: &Path) -> OptionSet {
    let mut set = OptionSet::new();
    base_layer(&mut set);
    set.set(Layer::Stage, "LLVM_INSTALL_UTILS", "ON");
    set.set(
        Layer::InstallPrefix,
        "CMAKE_INSTALL_PREFIX",
        install_dir.display().to_string(),
    );
    set
}

fn base_layer(set: &mut OptionSet) {
    set.set(Layer::Base, "CMAKE_BUILD_TYPE", "Release");
    set.set(Layer::Base, "LLVM_ENABLE_PROJECTS", "clang;lld");
    set.set(Layer::Base, "LLVM_TARGETS_TO_BUILD", "X86;AArch64");
    set.set(Layer::Base, "LLVM_ENABLE_ASSERTIONS", "OFF");
    set.set(Layer::Base, "LLVM_ENABLE_EH", "OFF");
    set.set(Layer::Base, "LLVM_ENABLE_RTTI", "OFF");
    set.set(Layer::Base, "LLVM_ENABLE_BINDINGS", "OFF");
    set.set(Layer::Base, "LLVM_INCLUDE_TESTS", "OFF");
    set.set(Layer::Base, "LLVM_INCLUDE_EXAMPLES", "OFF");
    set.set(Layer::Base, "LLVM_INCLUDE_BENCHMARKS", "OFF");
}

fn family_layer(set: &mut OptionSet, family: Family) {
    match family {
        Family::Apple => {
            set.set(Layer::Platform, "LLVM_ENABLE_LIBCXX", "ON");
            set.set(Layer::Platform, "LLVM_LINK_LLVM_DYLIB", "OFF");
            set.set(Layer::Platform, "LLVM_ENABLE_ZSTD", "OFF");
        }
        Family::Linux => {
            set.set(Layer::Platform, "LLVM_STATIC_LINK_CXX_STDLIB", "ON");
            set.set(Layer::Platform, "LLVM_ENABLE_TERMINFO", "OFF");
            set.set(Layer::Platform, "LLVM_LINK_LLVM_DYLIB", "OFF");
        }
        Family::Windows => {
            set.set(
                Layer::Platform,
                "CMAKE_EXE_LINKER_FLAGS",
                "-static-libgcc -static-libstdc++",
            );
            set.set(Layer::Platform, "LLVM_LINK_LLVM_DYLIB", "OFF");
            set.set(Layer::Platform, "LLVM_ENABLE_LIBXML2", "OFF");
        }
    }
}

fn cross_layer(set: &mut OptionSet, ctx: &ComposeCtx<'_>) {
    let triple = ctx.target.triple();
    set.set(
        Layer::Cross,
        "CMAKE_SYSTEM_NAME",
        ctx.target.family().cmake_system_name(),
    );
    set.set(Layer::Cross, "CMAKE_C_COMPILER", ctx.toolchain.cc());
    set.set(Layer::Cross, "CMAKE_CXX_COMPILER", ctx.toolchain.cxx());
    set.set(Layer::Cross, "CMAKE_AR", ctx.toolchain.ar());
    set.set(Layer::Cross, "CMAKE_STRIP", ctx.toolchain.strip());
    if let Some(sysroot) = ctx.toolchain.sysroot() {
        // Programs come from the host PATH; libraries and headers only from
        // the target sysroot.
        set.set(
            Layer::Cross,
            "CMAKE_FIND_ROOT_PATH",
            sysroot.display().to_string(),
        );
        set.set(Layer::Cross, "CMAKE_FIND_ROOT_PATH_MODE_PROGRAM", "NEVER");
        set.set(Layer::Cross, "CMAKE_FIND_ROOT_PATH_MODE_LIBRARY", "ONLY");
        set.set(Layer::Cross, "CMAKE_FIND_ROOT_PATH_MODE_INCLUDE", "ONLY");
    }
    set.set(Layer::Cross, "LLVM_DEFAULT_TARGET_TRIPLE", triple);
    set.set(Layer::Cross, "LLVM_HOST_TRIPLE", triple);
    set.set(
        Layer::Cross,
        "LLVM_TABLEGEN",
        ctx.helper_dir.join("bin/llvm-tblgen").display().to_string(),
    );
    set.set(
        Layer::Cross,
        "CLANG_TABLEGEN",
        ctx.helper_dir
            .join("bin/clang-tblgen")
            .display()
            .to_string(),
    );
}

fn stage_layer(set: &mut OptionSet, ctx: &ComposeCtx<'_>, kind: StageKind) {
    set.set(Layer::Stage, "CLANG_DEFAULT_LINKER", "lld");
    match kind {
        // Stage 1 stays minimal: compiler and linker executables, no
        // runtimes or libraries.
        StageKind::Stage1 | StageKind::Helpers => {}
        StageKind::Single | StageKind::Stage2 => {
            set.set(Layer::Stage, "LLVM_ENABLE_RUNTIMES", "compiler-rt");
            set.set(Layer::Stage, "CLANG_DEFAULT_RTLIB", "compiler-rt");
        }
    }
    // Self-host handoff: a Windows host compiles stage 2 with the clang it
    // just built. Cross builds from other hosts keep the cross toolchain.
    if kind == StageKind::Stage2 && ctx.host.family == Family::Windows {
        if let Some(stage1) = ctx.stage1_install {
            set.set(
                Layer::Stage,
                "CMAKE_C_COMPILER",
                stage1.join("bin/clang").display().to_string(),
            );
            set.set(
                Layer::Stage,
                "CMAKE_CXX_COMPILER",
                stage1.join("bin/clang++").display().to_string(),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Arch;
    use crate::plan::BuildPlan;
    use crate::platform::resolve;
    use std::collections::HashSet;
    use std::path::PathBuf;

    fn linux_host() -> Host {
        Host {
            family: Family::Linux,
            arch: Arch::X86_64,
        }
    }

    fn windows_host() -> Host {
        Host {
            family: Family::Windows,
            arch: Arch::X86_64,
        }
    }

    fn ctx_for<'a>(plan: &'a BuildPlan, helper_dir: &'a Path) -> ComposeCtx<'a> {
        ComposeCtx {
            target: plan.target(),
            host: plan.host(),
            toolchain: plan.toolchain(),
            cross: plan.cross(),
            helper_dir,
            stage1_install: None,
        }
    }

    #[test]
    fn test_later_layer_wins() {
        let mut set = OptionSet::new();
        set.set(Layer::Base, "LLVM_ENABLE_ZSTD", "ON");
        set.set(Layer::Platform, "LLVM_ENABLE_ZSTD", "OFF");
        assert_eq!(set.get("LLVM_ENABLE_ZSTD"), Some("OFF"));
        assert_eq!(set.layer_of("LLVM_ENABLE_ZSTD"), Some(Layer::Platform));
        assert_eq!(set.len(), 1);
        assert_eq!(set.to_flags(), vec!["-DLLVM_ENABLE_ZSTD=OFF".to_string()]);
    }

    #[test]
    fn test_override_keeps_first_position() {
        let mut set = OptionSet::new();
        set.set(Layer::Base, "A", "1");
        set.set(Layer::Base, "B", "2");
        set.set(Layer::Stage, "A", "3");
        assert_eq!(set.to_flags(), vec!["-DA=3".to_string(), "-DB=2".to_string()]);
    }

    #[test]
    fn test_composition_is_idempotent() {
        let plan = BuildPlan::new(resolve("x86_64-w64-mingw32").unwrap(), linux_host());
        let helpers = PathBuf::from("build/x86_64-w64-mingw32/helpers");
        let install = PathBuf::from("build/x86_64-w64-mingw32/stage1-install");
        let ctx = ctx_for(&plan, &helpers);
        let first = compose(&ctx, StageKind::Stage1, &install);
        let second = compose(&ctx, StageKind::Stage1, &install);
        assert_eq!(first, second);
        assert_eq!(first.to_flags(), second.to_flags());
    }

    #[test]
    fn test_flags_have_no_duplicate_keys() {
        let plan = BuildPlan::new(resolve("aarch64-w64-mingw32").unwrap(), linux_host());
        let helpers = PathBuf::from("helpers");
        let ctx = ComposeCtx {
            stage1_install: Some(Path::new("stage1-install")),
            ..ctx_for(&plan, &helpers)
        };
        let set = compose(&ctx, StageKind::Stage2, Path::new("install"));
        let flags = set.to_flags();
        let keys: Vec<&str> = flags
            .iter()
            .filter_map(|f| f.strip_prefix("-D"))
            .filter_map(|f| f.split('=').next())
            .collect();
        assert_eq!(keys.len(), flags.len());
        let unique: HashSet<&str> = keys.iter().copied().collect();
        assert_eq!(keys.len(), unique.len());
    }

    #[test]
    fn test_native_build_has_no_cross_overlay() {
        let plan = BuildPlan::new(resolve("x86_64-linux-gnu").unwrap(), linux_host());
        let helpers = PathBuf::from("helpers");
        let set = compose(
            &ctx_for(&plan, &helpers),
            StageKind::Single,
            Path::new("install"),
        );
        assert_eq!(set.get("CMAKE_SYSTEM_NAME"), None);
        assert_eq!(set.get("LLVM_TABLEGEN"), None);
        assert_eq!(set.get("CMAKE_C_COMPILER"), None);
        assert_eq!(set.get("CMAKE_INSTALL_PREFIX"), Some("install"));
    }

    #[test]
    fn test_cross_overlay_pins_sysroot_and_tools() {
        let plan = BuildPlan::new(resolve("aarch64-linux-gnu").unwrap(), linux_host());
        let helpers = PathBuf::from("build/aarch64-linux-gnu/helpers");
        let set = compose(
            &ctx_for(&plan, &helpers),
            StageKind::Single,
            Path::new("install"),
        );
        assert_eq!(set.get("CMAKE_SYSTEM_NAME"), Some("Linux"));
        assert_eq!(set.get("CMAKE_C_COMPILER"), Some("aarch64-linux-gnu-gcc"));
        assert_eq!(
            set.get("CMAKE_FIND_ROOT_PATH"),
            Some("/usr/aarch64-linux-gnu")
        );
        assert_eq!(set.get("CMAKE_FIND_ROOT_PATH_MODE_PROGRAM"), Some("NEVER"));
        assert_eq!(set.get("CMAKE_FIND_ROOT_PATH_MODE_LIBRARY"), Some("ONLY"));
        assert_eq!(
            set.get("LLVM_DEFAULT_TARGET_TRIPLE"),
            Some("aarch64-linux-gnu")
        );
        assert_eq!(
            set.get("LLVM_TABLEGEN"),
            Some("build/aarch64-linux-gnu/helpers/bin/llvm-tblgen")
        );
    }

    #[test]
    fn test_stage1_drops_runtimes() {
        let plan = BuildPlan::new(resolve("x86_64-w64-mingw32").unwrap(), linux_host());
        let helpers = PathBuf::from("helpers");
        let ctx = ctx_for(&plan, &helpers);
        let stage1 = compose(&ctx, StageKind::Stage1, Path::new("s1"));
        let stage2 = compose(&ctx, StageKind::Stage2, Path::new("s2"));
        assert_eq!(stage1.get("LLVM_ENABLE_RUNTIMES"), None);
        assert_eq!(stage2.get("LLVM_ENABLE_RUNTIMES"), Some("compiler-rt"));
    }

    #[test]
    fn test_stage2_redirect_only_on_windows_host() {
        let target = resolve("x86_64-w64-mingw32").unwrap();
        let helpers = PathBuf::from("helpers");
        let stage1_install = PathBuf::from("build/x86_64-w64-mingw32/stage1-install");

        // Cross from Linux: stage 2 keeps the mingw cross compiler.
        let cross_plan = BuildPlan::new(target, linux_host());
        let ctx = ComposeCtx {
            stage1_install: Some(&stage1_install),
            ..ctx_for(&cross_plan, &helpers)
        };
        let set = compose(&ctx, StageKind::Stage2, Path::new("install"));
        assert_eq!(set.get("CMAKE_C_COMPILER"), Some("x86_64-w64-mingw32-gcc"));

        // Native Windows host: stage 2 self-hosts on stage 1's clang.
        let native_plan = BuildPlan::new(target, windows_host());
        let ctx = ComposeCtx {
            stage1_install: Some(&stage1_install),
            ..ctx_for(&native_plan, &helpers)
        };
        let set = compose(&ctx, StageKind::Stage2, Path::new("install"));
        assert_eq!(
            set.get("CMAKE_C_COMPILER"),
            Some("build/x86_64-w64-mingw32/stage1-install/bin/clang")
        );
        assert_eq!(set.layer_of("CMAKE_C_COMPILER"), Some(Layer::Stage));
    }

    #[test]
    fn test_helpers_set_is_native_and_minimal() {
        let set = compose_helpers(Path::new("build/t/helpers"));
        assert_eq!(set.get("LLVM_INSTALL_UTILS"), Some("ON"));
        assert_eq!(set.get("CMAKE_C_COMPILER"), None);
        assert_eq!(set.get("CMAKE_SYSTEM_NAME"), None);
        assert_eq!(set.get("CMAKE_INSTALL_PREFIX"), Some("build/t/helpers"));
    }

    #[test]
    fn test_install_prefix_is_last_flag() {
        let plan = BuildPlan::new(resolve("x86_64-linux-gnu").unwrap(), linux_host());
        let helpers = PathBuf::from("helpers");
        let set = compose(
            &ctx_for(&plan, &helpers),
            StageKind::Single,
            Path::new("install"),
        );
        let flags = set.to_flags();
        assert_eq!(
            flags.last().map(String::as_str),
            Some("-DCMAKE_INSTALL_PREFIX=install")
        );
    }
}
