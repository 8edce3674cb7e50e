//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell as CompletionShell;

use sammy::core::package_ref::DEFAULT_TAG;
use sammy::util::shell::ColorChoice;

/// sammy - workspace manager for SJSU-Dev2 firmware projects
#[derive(Parser)]
#[command(name = "sammy")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print only errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Coloring: auto, always, never
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    pub color: ColorChoice,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create projects and manage their packages
    Project(ProjectArgs),

    /// Cross compile a source file into a firmware image
    Build(BuildArgs),

    /// Compile a unit test for the host and optionally run it
    BuildTest(BuildTestArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct ProjectArgs {
    #[command(subcommand)]
    pub command: ProjectCommands,
}

#[derive(Subcommand)]
pub enum ProjectCommands {
    /// Create a new project and install its default packages
    Start(StartArgs),

    /// Install a package into the enclosing project
    Install(InstallArgs),

    /// Remove an installed package
    Remove(RemoveArgs),

    /// List packages available from the registry
    List,
}

#[derive(Args)]
pub struct StartArgs {
    /// Project directory to create
    pub name: PathBuf,

    /// Only create the skeleton; install no packages
    #[arg(long)]
    pub no_install: bool,
}

#[derive(Args)]
pub struct InstallArgs {
    /// Registry name or repository URL
    pub library: String,

    /// Directory inside the project
    #[arg(short, long, default_value = ".")]
    pub dir: PathBuf,

    /// Branch or tag to check out
    #[arg(short, long, default_value = DEFAULT_TAG)]
    pub tag: String,
}

#[derive(Args)]
pub struct RemoveArgs {
    /// Package name or the URL it was installed from
    pub library: String,

    /// Directory inside the project
    #[arg(short, long, default_value = ".")]
    pub dir: PathBuf,
}

#[derive(Args)]
pub struct BuildArgs {
    /// Source file containing `main`
    #[arg(default_value = "main.cpp")]
    pub source: PathBuf,

    /// Optimization level passed as -O<level>
    #[arg(short, long)]
    pub optimization: Option<String>,

    /// Target platform, e.g. lpc40xx
    #[arg(short, long)]
    pub platform: Option<String>,

    /// Linker script inside the platform's linker directory
    #[arg(short, long)]
    pub linker_script: Option<String>,

    /// Toolchain package providing the compiler
    #[arg(short, long)]
    pub toolchain: Option<String>,

    /// Compiler executable inside the toolchain's bin directory
    #[arg(short, long)]
    pub compiler: Option<String>,
}

#[derive(Args)]
pub struct BuildTestArgs {
    /// Test source file
    pub source: PathBuf,

    /// Host compiler
    #[arg(short, long)]
    pub compiler: Option<String>,

    /// Run the test executable after building it
    #[arg(short, long)]
    pub run: bool,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: CompletionShell,
}
