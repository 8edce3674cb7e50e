//! Package sources.
//!
//! Registries map package names to clone URLs; fetchers turn a URL and a
//! tag into a checked-out directory.

pub mod git;
pub mod registry;

pub use git::{Fetcher, GitFetcher};
pub use registry::{registry_from_config, static_entries, PackageRegistry};
