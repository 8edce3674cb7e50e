//! Implementation of `sammy build`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::builder::firmware::FirmwareBuild;
use crate::builder::pipeline::{run_step, run_steps, StepExecutor};
use crate::core::build_target::{ArtifactSet, BuildTarget};
use crate::core::workspace::Workspace;
use crate::util::context::GlobalContext;
use crate::util::fs;
use crate::util::shell::{Shell, Status};

/// Options for the build command. Unset fields fall back to `[build]`
/// config, then to the built-in defaults.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Source file, relative to the working directory
    pub source: PathBuf,
    pub optimization: Option<String>,
    pub platform: Option<String>,
    pub linker_script: Option<String>,
    pub toolchain: Option<String>,
    pub compiler: Option<String>,
}

/// Make a user-supplied source path absolute and canonical, then locate
/// the workspace it belongs to.
pub(crate) fn locate_source(ctx: &GlobalContext, source: &Path) -> Result<(Workspace, PathBuf)> {
    let source = ctx.resolve_path(source);
    let source = source.canonicalize().unwrap_or(source);
    let ws = Workspace::locate(&source)?;
    tracing::debug!("workspace root: {}", ws.root().display());
    Ok((ws, source))
}

/// Compile `opts.source` into a firmware image and generate every artifact.
pub fn build(
    ctx: &GlobalContext,
    opts: &BuildOptions,
    executor: &mut dyn StepExecutor,
) -> Result<ArtifactSet> {
    let shell = ctx.shell();
    let (ws, source) = locate_source(ctx, &opts.source)?;
    let config = ctx.config(Some(&ws)).build;

    let pick = |flag: &Option<String>, configured: &str| {
        flag.clone().unwrap_or_else(|| configured.to_string())
    };
    let target = BuildTarget {
        source,
        optimization: pick(&opts.optimization, config.optimization()),
        platform: pick(&opts.platform, config.platform()),
        linker_script: pick(&opts.linker_script, config.linker_script()),
        toolchain: pick(&opts.toolchain, config.toolchain()),
        compiler: pick(&opts.compiler, config.compiler()),
    };

    let build = FirmwareBuild::assemble(&ws, &target)?;
    fs::ensure_dir(build.artifacts.dir())?;

    if let Err(e) = run_step(shell, &build.compile, executor) {
        shell.heading("Build command:");
        shell.raw(&build.compile.command);
        dump_file(shell, "Build Log Contents:", &build.artifacts.log());
        return Err(e.context("build failed"));
    }

    run_steps(shell, &build.artifact_steps, executor)
        .context("artifact generation failed")?;

    shell.heading("Section Memory Usage");
    dump_file(shell, "", &build.artifacts.size());
    dump_file(shell, "", &build.artifacts.size_percent());
    dump_file(shell, "Build Log Contents:", &build.artifacts.log());

    shell.status(
        Status::Finished,
        fs::relative_path(ws.root(), &build.artifacts.elf()).display(),
    );
    Ok(build.artifacts)
}

/// Print a captured output file, optionally under a heading. Missing files
/// are skipped; a tool that printed nothing leaves none.
fn dump_file(shell: &Shell, heading: &str, path: &Path) {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            if !heading.is_empty() {
                shell.heading(heading);
            }
            shell.raw(contents.trim_end());
        }
        Err(e) => tracing::debug!("not printing {}: {}", path.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::pipeline::testing::RecordingExecutor;
    use crate::core::errors::SammyError;
    use crate::test_support::workspace;
    use tempfile::TempDir;

    fn context(ws: &Workspace) -> GlobalContext {
        GlobalContext::with_cwd(ws.root().to_path_buf(), Shell::capture()).with_global_config(None)
    }

    /// Workspace with `main.cpp` and a `demo` platform.
    fn demo_project(with_flags: bool) -> (TempDir, Workspace) {
        let (tmp, ws) = workspace();
        std::fs::write(ws.root().join("main.cpp"), "int main() {}\n").unwrap();
        let platform = ws.platform_dir("demo");
        std::fs::create_dir_all(&platform).unwrap();
        if with_flags {
            std::fs::write(platform.join("gcc.txt"), "-mthumb -mcpu=cortex-m3\n").unwrap();
        }
        (tmp, ws)
    }

    fn demo_options() -> BuildOptions {
        BuildOptions {
            source: PathBuf::from("main.cpp"),
            platform: Some("demo".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_flags_invokes_nothing() {
        let (_tmp, ws) = demo_project(false);
        let ctx = context(&ws);
        let mut exec = RecordingExecutor::default();

        let err = build(&ctx, &demo_options(), &mut exec).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<SammyError>(),
            Some(SammyError::PlatformFlagsMissing { platform, .. }) if platform == "demo"
        ));
        assert!(exec.commands.is_empty());
    }

    #[test]
    fn test_full_build_runs_all_steps() {
        let (_tmp, ws) = demo_project(true);
        let ctx = context(&ws);
        let mut exec = RecordingExecutor::default();

        let artifacts = build(&ctx, &demo_options(), &mut exec).unwrap();

        assert_eq!(exec.commands.len(), 6);
        assert!(exec.commands[0].has_arg("-mthumb"));
        assert!(exec.commands[0].has_arg("-Og"));
        assert_eq!(artifacts.stem(), "demo.main.cpp");
        assert!(artifacts.dir().is_dir());
        assert!(ctx
            .shell()
            .captured()
            .iter()
            .any(|l| l.contains("Section Memory Usage")));
    }

    #[test]
    fn test_compile_failure_skips_artifacts() {
        let (_tmp, ws) = demo_project(true);
        let ctx = context(&ws);
        let mut exec = RecordingExecutor::failing_at(0);

        let err = build(&ctx, &demo_options(), &mut exec).unwrap_err();

        assert_eq!(exec.commands.len(), 1);
        assert!(err.to_string().contains("build failed"));
        assert!(matches!(
            err.downcast_ref::<SammyError>(),
            Some(SammyError::StepFailed { .. })
        ));
        let lines = ctx.shell().captured();
        let at = lines.iter().position(|l| l == "Build command:").unwrap();
        assert!(lines[at + 1].contains("-DPLATFORM=demo"));
    }

    #[test]
    fn test_artifact_failure_stops_remaining_steps() {
        let (_tmp, ws) = demo_project(true);
        let ctx = context(&ws);
        // compile is invocation 0; the .S disassembly is artifact step 3
        let mut exec = RecordingExecutor::failing_at(3);

        let err = build(&ctx, &demo_options(), &mut exec).unwrap_err();

        assert_eq!(exec.commands.len(), 4);
        assert!(err.to_string().contains("artifact generation failed"));
        match err.downcast_ref::<SammyError>() {
            Some(SammyError::StepFailed { label, .. }) => assert!(label.starts_with(".S")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_project_config_supplies_defaults() {
        let (_tmp, ws) = demo_project(true);
        std::fs::write(
            ws.config_path(),
            "[build]\nplatform = \"demo\"\noptimization = \"2\"\ncompiler = \"clang++\"\n",
        )
        .unwrap();
        let ctx = context(&ws);
        let mut exec = RecordingExecutor::default();

        let opts = BuildOptions {
            source: PathBuf::from("main.cpp"),
            ..Default::default()
        };
        build(&ctx, &opts, &mut exec).unwrap();

        let compile = &exec.commands[0];
        assert!(compile.has_arg("-O2"));
        assert!(compile.program.ends_with("clang++"));
        // a prefix-less compiler uses bare binutils
        assert!(exec.commands[1].program.ends_with("bin/objcopy"));
    }

    #[test]
    fn test_source_outside_workspace() {
        let outside = TempDir::new().unwrap();
        std::fs::write(outside.path().join("main.cpp"), "").unwrap();
        let ctx = GlobalContext::with_cwd(outside.path().to_path_buf(), Shell::capture())
            .with_global_config(None);
        let mut exec = RecordingExecutor::default();

        let err = build(&ctx, &demo_options(), &mut exec).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SammyError>(),
            Some(SammyError::WorkspaceNotFound { .. })
        ));
        assert!(exec.commands.is_empty());
    }
}
