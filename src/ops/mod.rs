//! High-level operations.
//!
//! This module contains the implementation of sammy commands.

pub mod sammy_build;
pub mod sammy_install;
pub mod sammy_new;

pub use sammy_build::{build, BuildOptions};
pub use sammy_install::{
    install_package, install_packages, list_packages, local_repository, remove_package,
    resolve_package, InstallResult, PackageSources,
};
pub use sammy_new::{create_skeleton, start_project, StartOptions};
pub use sammy_test::{build_test, TestOptions};
