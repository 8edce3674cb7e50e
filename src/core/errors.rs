//! Error taxonomy for workspace, package and build operations.
//!
//! Operations return `anyhow::Result`, but every failure a user is expected to
//! act on is one of these variants so callers can `downcast_ref` and render
//! the matching help text.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::core::workspace::MARKER_DIR;

/// A failure of a top-level `sammy` command.
#[derive(Debug, Error, Diagnostic)]
pub enum SammyError {
    /// No marker directory between the start path and the filesystem root.
    #[error("`{}` does not exist within a SJSU-Dev2 project (no `{}` found)", start.display(), MARKER_DIR)]
    #[diagnostic(
        code(sammy::workspace::not_found),
        help("Run `sammy project start <name>` to create a project, or pass a path inside one")
    )]
    WorkspaceNotFound { start: PathBuf },

    /// Identifier is neither a registry key nor a clonable URL.
    #[error("`{identifier}` is not a known package and not a valid repository URL")]
    #[diagnostic(
        code(sammy::package::invalid_reference),
        help("Run `sammy project list` to see the available packages")
    )]
    InvalidPackageReference { identifier: String },

    /// Cloning or checking out a package failed.
    #[error("failed to fetch `{url}` at `{tag}`: {message}")]
    #[diagnostic(
        code(sammy::package::fetch_failed),
        help("Check your network connection and that the tag or branch exists")
    )]
    FetchFailed {
        url: String,
        tag: String,
        message: String,
    },

    /// `remove` on a package that has no cache entry.
    #[error("package `{name}` is not installed (no `{}`)", path.display())]
    #[diagnostic(code(sammy::package::not_found))]
    PackageNotFound { name: String, path: PathBuf },

    /// The selected platform has no `gcc.txt` flags file.
    #[error("platform `{platform}` has no compiler flags file at `{}`", path.display())]
    #[diagnostic(
        code(sammy::build::platform_flags_missing),
        help("Install the platform library, e.g. `sammy project install lib{platform}`")
    )]
    PlatformFlagsMissing { platform: String, path: PathBuf },

    /// An external step exited unsuccessfully.
    #[error("{label} failed")]
    #[diagnostic(code(sammy::pipeline::step_failed))]
    StepFailed {
        label: String,
        #[help]
        log: Option<String>,
    },
}

impl SammyError {
    /// Build a `StepFailed` error, pointing at the captured log if one exists.
    pub fn step_failed(label: impl Into<String>, log: Option<&std::path::Path>) -> Self {
        SammyError::StepFailed {
            label: label.into(),
            log: log.map(|p| format!("captured output: {}", p.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_failed_carries_label_and_log() {
        let err = SammyError::step_failed("Generating .hex", Some(std::path::Path::new("/p/a.log")));
        assert_eq!(err.to_string(), "Generating .hex failed");
        let help = err.help().map(|h| h.to_string()).unwrap();
        assert!(help.contains("/p/a.log"));
    }

    #[test]
    fn test_workspace_not_found_mentions_marker() {
        let err = SammyError::WorkspaceNotFound {
            start: PathBuf::from("/tmp/nowhere"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/tmp/nowhere"));
        assert!(msg.contains(".sj2"));
        assert!(err.code().is_some());
    }
}
