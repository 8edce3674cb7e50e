//! Cross-compiled firmware builds.
//!
//! One compiler invocation compiles and links the application source
//! together with the platform's `startup.cpp`; the resulting ELF is then fed
//! through objcopy, objdump and size to produce the rest of the
//! [`ArtifactSet`].

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::builder::command::{CommandSpec, Redirect};
use crate::builder::pipeline::Step;
use crate::core::build_target::{ArtifactSet, BuildTarget};
use crate::core::errors::SammyError;
use crate::core::workspace::Workspace;
use crate::util::fs;
use crate::util::shell::Status;

/// Per-platform extra compiler flags, appended verbatim.
pub const PLATFORM_FLAGS_FILE: &str = "gcc.txt";

/// Platform initialisation source compiled into every image.
pub const STARTUP_FILE: &str = "startup.cpp";

const FUNCTIONALITY_FLAGS: &[&str] = &[
    "-fexceptions",
    "-ffunction-sections",
    "-fdata-sections",
    "-fdiagnostics-color",
];

const DISABLED_FLAGS: &[&str] = &[
    "-fno-rtti",
    "-fno-threadsafe-statics",
    "-fno-omit-frame-pointer",
];

const WARNING_FLAGS: &[&str] = &[
    "-Wno-main",
    "-Wall",
    "-Wformat=2",
    "-Wno-uninitialized",
    "-Wnull-dereference",
    "-Wold-style-cast",
    "-Woverloaded-virtual",
    "-Wsuggest-override",
    "-Wno-psabi",
];

const LINKER_FLAGS: &[&str] = &[
    "-Wl,--gc-sections",
    "-Wl,--print-memory-usage",
    "--specs=nano.specs",
];

/// Compiler driver names a binutils prefix is derived from.
const DRIVER_SUFFIXES: &[&str] = &["clang++", "clang", "g++", "gcc", "c++", "cc"];

/// Everything needed to run one firmware build.
#[derive(Debug, Clone)]
pub struct FirmwareBuild {
    pub artifacts: ArtifactSet,
    /// Compile+link producing the ELF.
    pub compile: Step,
    /// Post-link steps, in the order they must run.
    pub artifact_steps: Vec<Step>,
}

/// Binutils belonging to a compiler: `arm-none-eabi-g++` pairs with
/// `arm-none-eabi-objcopy`, a bare `g++` with `objcopy`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binutils {
    pub objcopy: PathBuf,
    pub objdump: PathBuf,
    pub size: PathBuf,
}

impl Binutils {
    pub fn for_compiler(bin_dir: &Path, compiler: &str) -> Self {
        let prefix = tool_prefix(compiler);
        Binutils {
            objcopy: bin_dir.join(format!("{}objcopy", prefix)),
            objdump: bin_dir.join(format!("{}objdump", prefix)),
            size: bin_dir.join(format!("{}size", prefix)),
        }
    }
}

/// The target prefix of a compiler driver name, including the trailing `-`.
///
/// A version suffix (`arm-none-eabi-g++-10`) is ignored.
pub fn tool_prefix(compiler: &str) -> &str {
    let driver = match compiler.rsplit_once('-') {
        Some((driver, version))
            if !version.is_empty() && version.chars().all(|c| c.is_ascii_digit() || c == '.') =>
        {
            driver
        }
        _ => compiler,
    };
    for suffix in DRIVER_SUFFIXES {
        if let Some(prefix) = driver.strip_suffix(suffix) {
            if prefix.is_empty() || prefix.ends_with('-') {
                return prefix;
            }
        }
    }
    ""
}

/// Read the platform flags file and split it into arguments.
///
/// A missing file is a configuration error, never an empty flag set.
pub fn read_platform_flags(ws: &Workspace, platform: &str) -> Result<Vec<String>> {
    let path = ws.platform_dir(platform).join(PLATFORM_FLAGS_FILE);
    if !path.is_file() {
        return Err(SammyError::PlatformFlagsMissing {
            platform: platform.to_string(),
            path,
        }
        .into());
    }
    let contents = fs::read_to_string(&path)?;
    Ok(contents.split_whitespace().map(str::to_string).collect())
}

impl FirmwareBuild {
    /// Assemble the compile command and the artifact steps for `target`.
    pub fn assemble(ws: &Workspace, target: &BuildTarget) -> Result<Self> {
        let platform_flags = read_platform_flags(ws, &target.platform)?;
        let artifacts = ArtifactSet::new(ws, target)?;

        let bin_dir = ws.toolchain_bin_dir(&target.toolchain);
        let library_dir = ws.library_dir();
        let platform_dir = ws.platform_dir(&target.platform);

        let compile = CommandSpec::new(bin_dir.join(&target.compiler))
            .args(FUNCTIONALITY_FLAGS.iter().copied())
            .args(DISABLED_FLAGS.iter().copied())
            .args(WARNING_FLAGS.iter().copied())
            .args(LINKER_FLAGS.iter().copied())
            .arg("-T")
            .path_arg(&platform_dir.join(&target.linker_script))
            .args(["-g", "-std=c++20"])
            .arg("-I")
            .path_arg(&library_dir)
            .arg(format!("-O{}", target.optimization))
            .arg(format!("-DPLATFORM={}", target.platform))
            .args(platform_flags)
            .path_arg(&platform_dir.join(STARTUP_FILE))
            .path_arg(&target.source)
            .arg("-o")
            .path_arg(&artifacts.elf())
            .stdout(Redirect::file(artifacts.size_percent()))
            .stderr(Redirect::file(artifacts.log()));

        let compile = Step::new(
            Status::Building,
            format!("'{}'", artifacts.elf().display()),
            compile,
        );
        let artifact_steps = artifact_steps(&Binutils::for_compiler(&bin_dir, &target.compiler), &artifacts);

        Ok(FirmwareBuild {
            artifacts,
            compile,
            artifact_steps,
        })
    }
}

/// The five post-link steps, in order: binary, hex, disassembly,
/// disassembly with source, size report.
pub fn artifact_steps(tools: &Binutils, artifacts: &ArtifactSet) -> Vec<Step> {
    let elf = artifacts.elf();

    vec![
        Step::new(
            Status::Generating,
            ".bin  (binary)",
            CommandSpec::new(&tools.objcopy)
                .args(["-O", "binary"])
                .path_arg(&elf)
                .path_arg(&artifacts.bin()),
        ),
        Step::new(
            Status::Generating,
            ".hex  (intel HEX file)",
            CommandSpec::new(&tools.objcopy)
                .args(["-O", "ihex"])
                .path_arg(&elf)
                .path_arg(&artifacts.hex()),
        ),
        Step::new(
            Status::Generating,
            ".S    (disassembly)",
            CommandSpec::new(&tools.objdump)
                .args(["--disassemble", "--demangle"])
                .path_arg(&elf)
                .stdout(Redirect::file(artifacts.disassembly())),
        ),
        Step::new(
            Status::Generating,
            ".lst  (disassembly with source code)",
            CommandSpec::new(&tools.objdump)
                .args(["--all-headers", "--source", "--disassemble", "--demangle"])
                .path_arg(&elf)
                .stdout(Redirect::file(artifacts.listing())),
        ),
        Step::new(
            Status::Generating,
            ".size (size information)",
            CommandSpec::new(&tools.size)
                .path_arg(&elf)
                .stdout(Redirect::file(artifacts.size())),
        ),
    ]
}
