//! Compiler driver for firmware and host-test builds.
//!
//! Assemblers turn a target into [`CommandSpec`]s; the pipeline runs them in
//! order with a pass/fail mark per step.

pub mod command;
pub mod firmware;
pub mod pipeline;

pub use command::{CommandSpec, Redirect};
pub use firmware::{Binutils, FirmwareBuild};
pub use host_test::HostTestBuild;
pub use pipeline::{run_step, run_steps, ProcessExecutor, Step, StepExecutor};
