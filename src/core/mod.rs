//! Core data structures for sammy.
//!
//! This module contains the foundational types used throughout sammy:
//! - The workspace and its directory layout
//! - Package references and registry indexes
//! - Build targets and artifact paths
//! - The error taxonomy

pub mod build_target;
pub mod errors;
pub mod package_ref;
pub mod workspace;

pub use build_target::{ArtifactSet, BuildTarget, HostTestTarget, TestArtifacts};
pub use errors::SammyError;
pub use package_ref::{PackageIndex, PackageRef, Resolution};
pub use workspace::{find_workspace_root, Workspace, MARKER_DIR, MARKER_FILE};
