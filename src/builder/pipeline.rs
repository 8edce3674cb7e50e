//! Ordered pass/fail steps over external tools.
//!
//! Install, build, build-test and artifact generation are all lists of
//! [`Step`]s run in order. The first step that fails stops the list and
//! surfaces as [`SammyError::StepFailed`]; nothing is retried.

use anyhow::Result;

use crate::builder::command::{CommandSpec, Redirect};
use crate::core::errors::SammyError;
use crate::util::fs::ensure_dir;
use crate::util::process::ProcessBuilder;
use crate::util::shell::{Shell, Status};

/// One labelled external invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub status: Status,
    pub label: String,
    pub command: CommandSpec,
}

impl Step {
    pub fn new(status: Status, label: impl Into<String>, command: CommandSpec) -> Self {
        Step {
            status,
            label: label.into(),
            command,
        }
    }
}

/// Runs a command to completion and reports whether it succeeded.
///
/// An `Err` means the command could not be run at all (e.g. missing
/// program); a clean nonzero exit is `Ok(false)`.
pub trait StepExecutor {
    fn execute(&mut self, command: &CommandSpec) -> Result<bool>;
}

/// Executes commands as real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessExecutor;

impl StepExecutor for ProcessExecutor {
    fn execute(&mut self, command: &CommandSpec) -> Result<bool> {
        let mut pb = ProcessBuilder::new(&command.program).args(&command.args);
        if let Some(cwd) = &command.cwd {
            pb = pb.cwd(cwd);
        }
        pb = match &command.stdout {
            Redirect::Inherit => pb,
            Redirect::Null => pb.stdout_null(),
            Redirect::File(path) => {
                create_parent(path)?;
                pb.stdout_file(path)
            }
        };
        pb = match &command.stderr {
            Redirect::Inherit => pb,
            Redirect::Null => pb.stderr_null(),
            Redirect::File(path) => {
                create_parent(path)?;
                pb.stderr_file(path)
            }
        };

        Ok(pb.status()?.success())
    }
}

fn create_parent(path: &std::path::Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_dir(parent),
        _ => Ok(()),
    }
}

/// Run a single step, printing its label and a check or cross.
pub fn run_step(shell: &Shell, step: &Step, executor: &mut dyn StepExecutor) -> Result<()> {
    tracing::debug!("{}: {}", step.label, step.command);
    let line = shell.begin_step(step.status, &step.label);

    match executor.execute(&step.command) {
        Ok(true) => {
            line.succeed();
            Ok(())
        }
        Ok(false) => {
            line.fail();
            Err(SammyError::step_failed(&step.label, step.command.log_path()).into())
        }
        Err(e) => {
            line.fail();
            shell.error(format!("{:#}", e));
            Err(SammyError::step_failed(&step.label, step.command.log_path()).into())
        }
    }
}

/// Run steps in order, stopping at the first failure.
pub fn run_steps(shell: &Shell, steps: &[Step], executor: &mut dyn StepExecutor) -> Result<()> {
    for step in steps {
        run_step(shell, step, executor)?;
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingExecutor;
    use super::*;

    fn steps(n: usize) -> Vec<Step> {
        (1..=n)
            .map(|i| {
                Step::new(
                    Status::Generating,
                    format!("step {}", i),
                    CommandSpec::new(format!("tool{}", i)).stderr(Redirect::file(format!("/b/{}.log", i))),
                )
            })
            .collect()
    }

    #[test]
    fn test_all_steps_run_in_order() {
        let shell = Shell::capture();
        let mut exec = RecordingExecutor::default();
        run_steps(&shell, &steps(5), &mut exec).unwrap();

        let programs: Vec<_> = exec
            .commands
            .iter()
            .map(|c| c.program.display().to_string())
            .collect();
        assert_eq!(programs, ["tool1", "tool2", "tool3", "tool4", "tool5"]);
    }

    #[test]
    fn test_failure_short_circuits() {
        let shell = Shell::capture();
        let mut exec = RecordingExecutor::failing_at(2);
        let err = run_steps(&shell, &steps(5), &mut exec).unwrap_err();

        assert_eq!(exec.commands.len(), 3, "steps 4 and 5 must not run");
        match err.downcast_ref::<SammyError>() {
            Some(SammyError::StepFailed { label, log }) => {
                assert_eq!(label, "step 3");
                assert!(log.as_deref().unwrap().contains("/b/3.log"));
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let lines = shell.captured();
        assert_eq!(lines.len(), 3);
        assert!(lines[2].contains("step 3"));
    }

    #[cfg(unix)]
    #[test]
    fn test_process_executor_redirects() {
        let tmp = tempfile::TempDir::new().unwrap();
        let out = tmp.path().join("nested/out.txt");
        let cmd = CommandSpec::new("echo")
            .arg("artifact")
            .stdout(Redirect::file(&out));

        assert!(ProcessExecutor.execute(&cmd).unwrap());
        assert_eq!(std::fs::read_to_string(out).unwrap().trim(), "artifact");
    }

    #[test]
    fn test_unspawnable_program_is_step_failure() {
        let shell = Shell::capture();
        let step = Step::new(
            Status::Building,
            "Building x",
            CommandSpec::new("definitely-not-a-real-program-sammy"),
        );
        let err = run_step(&shell, &step, &mut ProcessExecutor).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SammyError>(),
            Some(SammyError::StepFailed { .. })
        ));
    }
}
