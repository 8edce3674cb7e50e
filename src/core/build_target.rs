//! Build targets and the artifact paths they produce.
//!
//! A build always compiles exactly one source file; nothing is cached
//! between invocations.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::core::errors::SammyError;
use crate::core::workspace::Workspace;

/// Configuration of one cross-compiled firmware build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTarget {
    /// Absolute path of the source file.
    pub source: PathBuf,
    /// Value appended to `-O`.
    pub optimization: String,
    /// Platform identifier, e.g. `lpc40xx`.
    pub platform: String,
    /// Linker script file name inside the platform directory.
    pub linker_script: String,
    /// Package name of the toolchain under `packages/`.
    pub toolchain: String,
    /// Compiler executable name inside the toolchain's `bin/`.
    pub compiler: String,
}

/// Configuration of one host-side test build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostTestTarget {
    /// Absolute path of the test source file.
    pub source: PathBuf,
    /// Host compiler, looked up on `PATH` when not a path.
    pub compiler: String,
}

/// Directory of `source` relative to the workspace root.
///
/// Fails with `WorkspaceNotFound` when the source lies outside `ws`.
pub fn relative_source_dir(ws: &Workspace, source: &Path) -> Result<PathBuf> {
    let parent = source.parent().unwrap_or(source);
    ws.relative(parent).ok_or_else(|| {
        SammyError::WorkspaceNotFound {
            start: source.to_path_buf(),
        }
        .into()
    })
}

fn file_name(source: &Path) -> String {
    source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Paths of everything one firmware build writes.
///
/// All files share the stem `<platform>.<source-basename>` inside
/// `build/<platform>/<relative-source-dir>/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSet {
    dir: PathBuf,
    stem: String,
}

impl ArtifactSet {
    pub fn new(ws: &Workspace, target: &BuildTarget) -> Result<Self> {
        let relative = relative_source_dir(ws, &target.source)?;
        Ok(ArtifactSet {
            dir: ws.build_dir().join(&target.platform).join(relative),
            stem: format!("{}.{}", target.platform, file_name(&target.source)),
        })
    }

    /// Directory holding every artifact.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    fn with_suffix(&self, suffix: &str) -> PathBuf {
        self.dir.join(format!("{}{}", self.stem, suffix))
    }

    pub fn elf(&self) -> PathBuf {
        self.with_suffix(".elf")
    }

    pub fn bin(&self) -> PathBuf {
        self.with_suffix(".bin")
    }

    pub fn hex(&self) -> PathBuf {
        self.with_suffix(".hex")
    }

    /// Disassembly without source.
    pub fn disassembly(&self) -> PathBuf {
        self.with_suffix(".S")
    }

    /// Disassembly interleaved with source and all headers.
    pub fn listing(&self) -> PathBuf {
        self.with_suffix(".lst")
    }

    pub fn size(&self) -> PathBuf {
        self.with_suffix(".size")
    }

    /// Linker memory-usage report (compile stdout).
    pub fn size_percent(&self) -> PathBuf {
        self.with_suffix(".size.percent")
    }

    /// Compiler diagnostics (compile stderr).
    pub fn log(&self) -> PathBuf {
        self.with_suffix(".log")
    }
}

/// Paths of a host-test build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestArtifacts {
    dir: PathBuf,
    name: String,
}

impl TestArtifacts {
    pub fn new(ws: &Workspace, target: &HostTestTarget) -> Result<Self> {
        let relative = relative_source_dir(ws, &target.source)?;
        Ok(TestArtifacts {
            dir: ws.build_dir().join("test").join(relative),
            name: file_name(&target.source),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The test executable.
    pub fn executable(&self) -> PathBuf {
        self.dir.join(format!("{}.exe", self.name))
    }

    /// Coverage counters left by a previous run.
    pub fn coverage_data(&self) -> PathBuf {
        self.dir.join(format!("{}.gcda", self.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(source: &str) -> BuildTarget {
        BuildTarget {
            source: PathBuf::from(source),
            optimization: "g".into(),
            platform: "demo".into(),
            linker_script: "default.ld".into(),
            toolchain: "gcc-arm".into(),
            compiler: "arm-none-eabi-g++".into(),
        }
    }

    #[test]
    fn test_artifact_naming() {
        let ws = Workspace::new("/proj");
        let set = ArtifactSet::new(&ws, &target("/proj/demos/blinky/main.cpp")).unwrap();

        assert_eq!(set.dir(), Path::new("/proj/build/demo/demos/blinky"));
        assert_eq!(set.stem(), "demo.main.cpp");
        assert_eq!(set.elf(), PathBuf::from("/proj/build/demo/demos/blinky/demo.main.cpp.elf"));
        assert!(set.size_percent().ends_with("demo.main.cpp.size.percent"));
        assert!(set.listing().ends_with("demo.main.cpp.lst"));
        assert!(set.disassembly().ends_with("demo.main.cpp.S"));
        assert!(set.log().ends_with("demo.main.cpp.log"));
    }

    #[test]
    fn test_source_at_root() {
        let ws = Workspace::new("/proj");
        let set = ArtifactSet::new(&ws, &target("/proj/main.cpp")).unwrap();
        assert_eq!(set.dir(), Path::new("/proj/build/demo"));
    }

    #[test]
    fn test_source_outside_workspace() {
        let ws = Workspace::new("/proj");
        let err = ArtifactSet::new(&ws, &target("/other/main.cpp")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SammyError>(),
            Some(SammyError::WorkspaceNotFound { .. })
        ));
    }

    #[test]
    fn test_host_test_paths() {
        let ws = Workspace::new("/proj");
        let t = HostTestTarget {
            source: PathBuf::from("/proj/tests/uart_test.cpp"),
            compiler: "g++-10".into(),
        };
        let artifacts = TestArtifacts::new(&ws, &t).unwrap();
        assert_eq!(
            artifacts.executable(),
            PathBuf::from("/proj/build/test/tests/uart_test.cpp.exe")
        );
        assert_eq!(
            artifacts.coverage_data(),
            PathBuf::from("/proj/build/test/tests/uart_test.cpp.gcda")
        );
    }
}
