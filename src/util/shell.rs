//! Centralized shell output.
//!
//! The Shell owns every line `sammy` prints for humans:
//! - Status messages with a right-aligned, colored status word
//! - The per-step check/cross contract shared by install and build
//! - Fetch progress bars (via indicatif)
//! - Raw dumps of captured build logs
//!
//! Commands never print directly; they hand text to the Shell they were
//! given, which keeps quiet mode and colour handling in one place.

use std::fmt::Display;
use std::io::{self, IsTerminal, Write};
use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressStyle};

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// --quiet: errors only, no progress
    Quiet,
    /// Default: status messages + progress bars
    #[default]
    Normal,
    /// --verbose: status messages, debug logs, no progress bars
    Verbose,
}

/// Color output mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    /// Detect TTY and use colors if available.
    #[default]
    Auto,
    /// Always use ANSI colors.
    Always,
    /// Never use ANSI colors.
    Never,
}

impl std::str::FromStr for ColorChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(ColorChoice::Auto),
            "always" => Ok(ColorChoice::Always),
            "never" => Ok(ColorChoice::Never),
            _ => Err(format!(
                "invalid color choice '{}'; expected 'auto', 'always', or 'never'",
                s
            )),
        }
    }
}

/// Status types for output messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    // Success statuses (green)
    Created,
    Finished,
    Linked,
    Removed,

    // In-progress statuses (cyan)
    Creating,
    Installing,
    Fetching,
    Building,
    Generating,
    Running,

    // Info statuses (blue)
    Info,

    // Warning statuses (yellow)
    Skipped,
    Warning,

    // Error status (red)
    Error,
}

impl Status {
    fn as_str(&self) -> &'static str {
        match self {
            Status::Created => "Created",
            Status::Finished => "Finished",
            Status::Linked => "Linked",
            Status::Removed => "Removed",
            Status::Creating => "Creating",
            Status::Installing => "Installing",
            Status::Fetching => "Fetching",
            Status::Building => "Building",
            Status::Generating => "Generating",
            Status::Running => "Running",
            Status::Info => "Info",
            Status::Skipped => "Skipped",
            Status::Warning => "Warning",
            Status::Error => "error",
        }
    }

    fn color_code(&self) -> &'static str {
        match self {
            Status::Created | Status::Finished | Status::Linked | Status::Removed => "\x1b[1;32m",
            Status::Creating
            | Status::Installing
            | Status::Fetching
            | Status::Building
            | Status::Generating
            | Status::Running => "\x1b[1;36m",
            Status::Info => "\x1b[1;34m",
            Status::Skipped | Status::Warning => "\x1b[1;33m",
            Status::Error => "\x1b[1;31m",
        }
    }
}

/// Width the status word is right-aligned to.
const STATUS_WIDTH: usize = 12;

const CHECK_MARK: &str = "\u{2705}";
const CROSS_MARK: &str = "\u{274c}";

/// Central shell for all CLI output.
#[derive(Debug)]
pub struct Shell {
    verbosity: Verbosity,
    use_color: bool,
    /// When set, lines are recorded here instead of written to the terminal
    captured: Option<Mutex<Vec<String>>>,
}

impl Shell {
    /// Create a shell writing to the terminal.
    pub fn new(verbosity: Verbosity, color: ColorChoice) -> Self {
        let use_color = match color {
            ColorChoice::Auto => io::stderr().is_terminal(),
            ColorChoice::Always => true,
            ColorChoice::Never => false,
        };

        Shell {
            verbosity,
            use_color,
            captured: None,
        }
    }

    /// Create a shell from CLI flags. Quiet wins over verbose.
    pub fn from_flags(quiet: bool, verbose: bool, color: ColorChoice) -> Self {
        let verbosity = if quiet {
            Verbosity::Quiet
        } else if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        };
        Shell::new(verbosity, color)
    }

    /// A colorless shell that records its output, for tests.
    pub fn capture() -> Self {
        Shell {
            verbosity: Verbosity::Normal,
            use_color: false,
            captured: Some(Mutex::new(Vec::new())),
        }
    }

    /// Lines recorded by a [`Shell::capture`] shell.
    pub fn captured(&self) -> Vec<String> {
        self.captured
            .as_ref()
            .and_then(|c| c.lock().ok().map(|lines| lines.clone()))
            .unwrap_or_default()
    }

    pub fn is_quiet(&self) -> bool {
        self.verbosity == Verbosity::Quiet
    }

    pub fn is_verbose(&self) -> bool {
        self.verbosity == Verbosity::Verbose
    }

    /// Print a status message: `{status:>12} {message}`.
    ///
    /// In quiet mode, only Error status is printed.
    pub fn status(&self, status: Status, msg: impl Display) {
        if self.is_quiet() && status != Status::Error {
            return;
        }
        let line = format!("{} {}", self.format_status(status), msg);
        self.emit_err(&line, true);
    }

    pub fn warn(&self, msg: impl Display) {
        self.status(Status::Warning, msg);
    }

    pub fn error(&self, msg: impl Display) {
        self.status(Status::Error, msg);
    }

    /// Start a pass/fail step; the label is printed without a newline and
    /// the mark follows once the step resolves.
    pub fn begin_step(&self, status: Status, label: impl Display) -> StepLine<'_> {
        if !self.is_quiet() {
            let line = format!("{} {} ", self.format_status(status), label);
            self.emit_err(&line, false);
        }
        StepLine {
            shell: self,
            label: label.to_string(),
            resolved: false,
        }
    }

    /// Print a bold heading to stdout (summaries, log dumps).
    pub fn heading(&self, text: impl Display) {
        let line = if self.use_color {
            format!("\x1b[1m{}\x1b[0m", text)
        } else {
            text.to_string()
        };
        self.emit_out(&line);
    }

    /// Print text verbatim to stdout.
    pub fn raw(&self, text: impl Display) {
        self.emit_out(&text.to_string());
    }

    /// Create a progress bar, or `None` when one would garble the output.
    pub fn progress(&self, msg: impl Display) -> Option<ProgressBar> {
        if self.is_quiet() || self.is_verbose() || self.captured.is_some() {
            return None;
        }
        if !io::stderr().is_terminal() {
            return None;
        }
        let pb = ProgressBar::new(0);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}/{len}")
            .map(|s| s.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        pb.set_message(msg.to_string());
        Some(pb)
    }

    fn format_status(&self, status: Status) -> String {
        let text = status.as_str();
        if self.use_color {
            format!(
                "{}{:>width$}\x1b[0m",
                status.color_code(),
                text,
                width = STATUS_WIDTH
            )
        } else {
            format!("{:>width$}", text, width = STATUS_WIDTH)
        }
    }

    fn emit_err(&self, text: &str, newline: bool) {
        if let Some(captured) = &self.captured {
            if let Ok(mut lines) = captured.lock() {
                lines.push(text.to_string());
            }
            return;
        }
        let mut stderr = io::stderr().lock();
        if newline {
            let _ = writeln!(stderr, "{}", text);
        } else {
            let _ = write!(stderr, "{}", text);
            let _ = stderr.flush();
        }
    }

    fn emit_out(&self, text: &str) {
        if let Some(captured) = &self.captured {
            if let Ok(mut lines) = captured.lock() {
                lines.push(text.to_string());
            }
            return;
        }
        println!("{}", text);
    }

    fn finish_step(&self, label: &str, success: bool) {
        if self.is_quiet() {
            if !success {
                self.error(format!("{} failed", label));
            }
            return;
        }
        let mark = if success { CHECK_MARK } else { CROSS_MARK };
        if let Some(captured) = &self.captured {
            if let Ok(mut lines) = captured.lock() {
                match lines.last_mut() {
                    Some(last) => last.push_str(mark),
                    None => lines.push(mark.to_string()),
                }
            }
            return;
        }
        eprintln!("{}", mark);
    }
}

impl Default for Shell {
    fn default() -> Self {
        Shell::new(Verbosity::Normal, ColorChoice::Auto)
    }
}

/// An in-flight step line; resolves to a check or a cross.
///
/// Dropping an unresolved step marks it failed so the line is never left
/// dangling when an error propagates with `?`.
pub struct StepLine<'a> {
    shell: &'a Shell,
    label: String,
    resolved: bool,
}

impl StepLine<'_> {
    pub fn succeed(mut self) {
        self.resolved = true;
        self.shell.finish_step(&self.label, true);
    }

    pub fn fail(mut self) {
        self.resolved = true;
        self.shell.finish_step(&self.label, false);
    }

    /// Resolve from a result, passing it through.
    pub fn finish<T, E>(self, result: Result<T, E>) -> Result<T, E> {
        match &result {
            Ok(_) => self.succeed(),
            Err(_) => self.fail(),
        }
        result
    }
}

impl Drop for StepLine<'_> {
    fn drop(&mut self) {
        if !self.resolved {
            self.shell.finish_step(&self.label, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_choice_parse() {
        assert_eq!("auto".parse::<ColorChoice>().unwrap(), ColorChoice::Auto);
        assert_eq!("always".parse::<ColorChoice>().unwrap(), ColorChoice::Always);
        assert_eq!("never".parse::<ColorChoice>().unwrap(), ColorChoice::Never);
        assert!("invalid".parse::<ColorChoice>().is_err());
    }

    #[test]
    fn test_status_formatting() {
        let shell = Shell::new(Verbosity::Normal, ColorChoice::Never);
        let formatted = shell.format_status(Status::Linked);
        assert_eq!(formatted.trim(), "Linked");
        assert_eq!(formatted.len(), STATUS_WIDTH);
    }

    #[test]
    fn test_from_flags() {
        assert!(Shell::from_flags(true, true, ColorChoice::Never).is_quiet());
        assert!(Shell::from_flags(false, true, ColorChoice::Never).is_verbose());
        let normal = Shell::from_flags(false, false, ColorChoice::Never);
        assert!(!normal.is_quiet() && !normal.is_verbose());
    }

    #[test]
    fn test_step_marks() {
        let shell = Shell::capture();
        shell.begin_step(Status::Generating, ".bin").succeed();
        shell.begin_step(Status::Generating, ".hex").fail();
        {
            let _dropped = shell.begin_step(Status::Generating, ".S");
        }

        let lines = shell.captured();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains(".bin") && lines[0].ends_with(CHECK_MARK));
        assert!(lines[1].contains(".hex") && lines[1].ends_with(CROSS_MARK));
        assert!(lines[2].ends_with(CROSS_MARK));
    }

    #[test]
    fn test_step_finish_passes_result_through() {
        let shell = Shell::capture();
        let ok: Result<u8, &str> = shell.begin_step(Status::Building, "a").finish(Ok(7));
        assert_eq!(ok, Ok(7));
        let err: Result<u8, &str> = shell.begin_step(Status::Building, "b").finish(Err("x"));
        assert_eq!(err, Err("x"));
    }
}
