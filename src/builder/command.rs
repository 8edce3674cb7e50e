//! Structured descriptions of external tool invocations.
//!
//! Every compiler, binutils or test run is described as a [`CommandSpec`]
//! before anything is spawned: program path, ordered arguments, working
//! directory and where stdout/stderr go. Nothing is ever joined into a shell
//! string, so arguments need no quoting and assemblers can be tested without
//! spawning processes.

use std::fmt;
use std::path::{Path, PathBuf};

/// Where a stream of the child process goes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Redirect {
    /// Share the parent's stream.
    #[default]
    Inherit,
    /// Truncate and write to a file.
    File(PathBuf),
    /// Discard.
    Null,
}

impl Redirect {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Redirect::File(path.into())
    }

    /// The file this stream is written to, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Redirect::File(path) => Some(path),
            _ => None,
        }
    }
}

/// A command to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// The program to run (e.g., "arm-none-eabi-g++")
    pub program: PathBuf,
    /// Command arguments
    pub args: Vec<String>,
    /// Working directory, inherited when `None`
    pub cwd: Option<PathBuf>,
    pub stdout: Redirect,
    pub stderr: Redirect,
}

impl CommandSpec {
    /// Create a new command spec.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        CommandSpec {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            stdout: Redirect::Inherit,
            stderr: Redirect::Inherit,
        }
    }

    /// Add an argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add a path argument.
    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy())
    }

    /// Add multiple arguments.
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(|a| a.into()));
        self
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn stdout(mut self, redirect: Redirect) -> Self {
        self.stdout = redirect;
        self
    }

    pub fn stderr(mut self, redirect: Redirect) -> Self {
        self.stderr = redirect;
        self
    }

    /// The file capturing this command's diagnostics (its stderr).
    pub fn log_path(&self) -> Option<&Path> {
        self.stderr.path()
    }

    /// Whether `arg` appears verbatim in the argument list.
    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }
}

impl fmt::Display for CommandSpec {
    /// Human-readable rendering for diagnostics; not meant to be re-parsed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " '{}'", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        if let Redirect::File(path) = &self.stdout {
            write!(f, " 1> {}", path.display())?;
        }
        if let Redirect::File(path) = &self.stderr {
            write!(f, " 2> {}", path.display())?;
        }
        Ok(())
    }
}
