//! Global context for sammy operations.
//!
//! Carries the working directory, the shell and the location of the global
//! config file into every operation. Nothing in the crate changes the
//! process working directory; relative paths are resolved against
//! [`GlobalContext::cwd`].

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use directories::ProjectDirs;

use crate::core::workspace::Workspace;
use crate::util::config::{load_config, Config};
use crate::util::shell::Shell;

/// Project directories for sammy
static PROJECT_DIRS: LazyLock<Option<ProjectDirs>> =
    LazyLock::new(|| ProjectDirs::from("", "", "sammy"));

/// Global context containing the shell and configuration paths.
#[derive(Debug)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// User-wide config file, if the platform has a config directory
    global_config: Option<PathBuf>,

    shell: Shell,
}

impl GlobalContext {
    /// Create a context for the process working directory.
    pub fn new(shell: Shell) -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Ok(Self::with_cwd(cwd, shell))
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf, shell: Shell) -> Self {
        GlobalContext {
            cwd,
            global_config: PROJECT_DIRS
                .as_ref()
                .map(|dirs| dirs.config_dir().join("config.toml")),
            shell,
        }
    }

    /// Use `path` as the global config file, or none at all.
    pub fn with_global_config(mut self, path: Option<PathBuf>) -> Self {
        self.global_config = path;
        self
    }

    /// Get the current working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn shell(&self) -> &Shell {
        &self.shell
    }

    /// Resolve a user-supplied path against the working directory.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }

    /// Merged configuration, including the workspace's own config when
    /// one is given.
    pub fn config(&self, ws: Option<&Workspace>) -> Config {
        let project = ws.map(Workspace::config_path);
        load_config(self.global_config.as_deref(), project.as_deref())
    }

    /// Locate the workspace enclosing `dir` (relative to cwd).
    pub fn locate_workspace(&self, dir: &Path) -> Result<Workspace> {
        Workspace::locate(&self.resolve_path(dir))
    }
}
