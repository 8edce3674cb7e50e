//! sammy - workspace manager for SJSU-Dev2 firmware projects
//!
//! This crate provides the core library functionality for sammy:
//! locating project workspaces, installing packages into them, and
//! driving the cross compiler and binutils that turn one source file into
//! a firmware image.

pub mod builder;
pub mod core;
pub mod ops;
pub mod sources;
pub mod util;

/// Test fixtures for sammy unit tests.
///
/// This module is only available when compiling with `--cfg test`.
#[cfg(test)]
pub mod test_support;

pub use core::{errors::SammyError, workspace::Workspace};
pub use util::context::GlobalContext;
