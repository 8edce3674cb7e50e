//! Subprocess execution utilities.

use std::ffi::OsStr;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use anyhow::{Context, Result};

/// Destination of a child's output stream.
#[derive(Debug, Clone, Default)]
enum Sink {
    #[default]
    Inherit,
    File(PathBuf),
    Null,
}

impl Sink {
    fn to_stdio(&self) -> Result<Stdio> {
        Ok(match self {
            Sink::Inherit => Stdio::inherit(),
            Sink::Null => Stdio::null(),
            Sink::File(path) => {
                let file = File::create(path)
                    .with_context(|| format!("failed to create {}", path.display()))?;
                Stdio::from(file)
            }
        })
    }
}

/// Builder for subprocess execution.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    stdout: Sink,
    stderr: Sink,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            cwd: None,
            stdout: Sink::Inherit,
            stderr: Sink::Inherit,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    /// Write stdout to a file, truncating it.
    pub fn stdout_file(mut self, path: impl AsRef<Path>) -> Self {
        self.stdout = Sink::File(path.as_ref().to_path_buf());
        self
    }

    /// Write stderr to a file, truncating it.
    pub fn stderr_file(mut self, path: impl AsRef<Path>) -> Self {
        self.stderr = Sink::File(path.as_ref().to_path_buf());
        self
    }

    pub fn stdout_null(mut self) -> Self {
        self.stdout = Sink::Null;
        self
    }

    pub fn stderr_null(mut self) -> Self {
        self.stderr = Sink::Null;
        self
    }

    fn build_command(&self) -> Result<Command> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }
        cmd.stdout(self.stdout.to_stdio()?);
        cmd.stderr(self.stderr.to_stdio()?);

        Ok(cmd)
    }

    /// Run to completion and return the exit status.
    pub fn status(&self) -> Result<ExitStatus> {
        let mut cmd = self.build_command()?;
        tracing::debug!("running `{}`", self.display_command());
        let status = cmd
            .status()
            .with_context(|| format!("failed to execute `{}`", self.program.display()))?;
        Ok(status)
    }

    /// Display the command for error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Find an executable in PATH.
pub fn find_executable(name: impl AsRef<OsStr>) -> Option<PathBuf> {
    which::which(name).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[cfg(unix)]
    #[test]
    fn test_stdout_redirected_to_file() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("out.txt");

        let status = ProcessBuilder::new("echo")
            .arg("hello")
            .stdout_file(&out)
            .status()
            .unwrap();

        assert!(status.success());
        assert_eq!(std::fs::read_to_string(&out).unwrap().trim(), "hello");
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_reported_not_raised() {
        let status = ProcessBuilder::new("false").status().unwrap();
        assert!(!status.success());
    }

    #[test]
    fn test_missing_program_is_an_error() {
        assert!(ProcessBuilder::new("definitely-not-a-real-program-sammy")
            .status()
            .is_err());
    }

    #[test]
    fn test_display_command() {
        let pb = ProcessBuilder::new("gcc").args(["-Wall", "-o", "output", "input.c"]);
        assert_eq!(pb.display_command(), "gcc -Wall -o output input.c");
    }
}
