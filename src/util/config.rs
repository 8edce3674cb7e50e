//! Configuration file support for sammy.
//!
//! sammy supports two configuration file locations:
//! - Global: `<config_dir>/sammy/config.toml` - User-wide defaults
//! - Project: `.sj2/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config, and command-line
//! flags take precedence over both.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::package_ref::PackageRef;
use crate::util::fs;

/// GitHub organization whose repositories form the default registry.
pub const DEFAULT_ORGANIZATION: &str = "SJSU-Dev2";

/// GitHub REST endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

pub const DEFAULT_OPTIMIZATION: &str = "g";
pub const DEFAULT_PLATFORM: &str = "lpc40xx";
pub const DEFAULT_LINKER_SCRIPT: &str = "default.ld";
pub const DEFAULT_TOOLCHAIN: &str = "gcc-arm-none-eabi-nano-exceptions";
pub const DEFAULT_COMPILER: &str = "arm-none-eabi-g++";
pub const DEFAULT_TEST_COMPILER: &str = "g++-10";

/// sammy configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Package registry settings
    pub registry: RegistryConfig,

    /// Firmware build defaults
    pub build: BuildConfig,

    /// Host test build defaults
    pub test: TestConfig,

    /// New project settings
    pub project: ProjectConfig,
}

/// How the registry is listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegistryKind {
    /// Every repository of a GitHub organization.
    #[default]
    GithubOrg,
    /// A JSON object mapping names to clone URLs.
    Index,
}

/// Registry configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub kind: Option<RegistryKind>,

    /// Location of the index document (`index` registries)
    pub url: Option<String>,

    /// Organization to list (`github-org` registries)
    pub organization: Option<String>,

    /// Only repositories whose name starts with this are packages
    pub prefix: Option<String>,

    /// GitHub API base URL
    pub api_url: Option<String>,

    /// Static name -> URL entries consulted before the remote listing
    pub packages: BTreeMap<String, String>,
}

impl RegistryConfig {
    pub fn kind(&self) -> RegistryKind {
        self.kind.unwrap_or_default()
    }

    pub fn organization(&self) -> &str {
        self.organization.as_deref().unwrap_or(DEFAULT_ORGANIZATION)
    }

    pub fn api_url(&self) -> &str {
        self.api_url.as_deref().unwrap_or(DEFAULT_API_URL)
    }
}

/// Firmware build defaults, overridden by `sammy build` flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub optimization: Option<String>,
    pub platform: Option<String>,
    pub linker_script: Option<String>,
    pub toolchain: Option<String>,
    pub compiler: Option<String>,
}

impl BuildConfig {
    pub fn optimization(&self) -> &str {
        self.optimization.as_deref().unwrap_or(DEFAULT_OPTIMIZATION)
    }

    pub fn platform(&self) -> &str {
        self.platform.as_deref().unwrap_or(DEFAULT_PLATFORM)
    }

    pub fn linker_script(&self) -> &str {
        self.linker_script.as_deref().unwrap_or(DEFAULT_LINKER_SCRIPT)
    }

    pub fn toolchain(&self) -> &str {
        self.toolchain.as_deref().unwrap_or(DEFAULT_TOOLCHAIN)
    }

    pub fn compiler(&self) -> &str {
        self.compiler.as_deref().unwrap_or(DEFAULT_COMPILER)
    }
}

/// Host test defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TestConfig {
    pub compiler: Option<String>,
}

impl TestConfig {
    pub fn compiler(&self) -> &str {
        self.compiler.as_deref().unwrap_or(DEFAULT_TEST_COMPILER)
    }
}

/// Settings for `sammy project start`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Packages installed into every new project, in order
    pub default_packages: Option<Vec<PackageRef>>,
}

impl ProjectConfig {
    pub fn default_packages(&self) -> Vec<PackageRef> {
        match &self.default_packages {
            Some(packages) => packages.clone(),
            None => builtin_default_packages(),
        }
    }
}

/// Core library, the ARM Cortex and two MCU platforms, then the toolchain.
pub fn builtin_default_packages() -> Vec<PackageRef> {
    vec![
        PackageRef::latest("libcore"),
        PackageRef::latest("libarmcortex"),
        PackageRef::latest("liblpc40xx"),
        PackageRef::latest("libstm32f10x"),
        PackageRef::new(DEFAULT_TOOLCHAIN, "gcc10-2020-q2-preview"),
    ]
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        // Registry settings
        if other.registry.kind.is_some() {
            self.registry.kind = other.registry.kind;
        }
        if other.registry.url.is_some() {
            self.registry.url = other.registry.url;
        }
        if other.registry.organization.is_some() {
            self.registry.organization = other.registry.organization;
        }
        if other.registry.prefix.is_some() {
            self.registry.prefix = other.registry.prefix;
        }
        if other.registry.api_url.is_some() {
            self.registry.api_url = other.registry.api_url;
        }
        // Static entries accumulate; the later file wins per name
        self.registry.packages.extend(other.registry.packages);

        // Build settings
        if other.build.optimization.is_some() {
            self.build.optimization = other.build.optimization;
        }
        if other.build.platform.is_some() {
            self.build.platform = other.build.platform;
        }
        if other.build.linker_script.is_some() {
            self.build.linker_script = other.build.linker_script;
        }
        if other.build.toolchain.is_some() {
            self.build.toolchain = other.build.toolchain;
        }
        if other.build.compiler.is_some() {
            self.build.compiler = other.build.compiler;
        }

        if other.test.compiler.is_some() {
            self.test.compiler = other.test.compiler;
        }

        if other.project.default_packages.is_some() {
            self.project.default_packages = other.project.default_packages;
        }
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.sj2/config.toml)
/// 2. Global config (<config_dir>/sammy/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: Option<&Path>) -> Config {
    let mut config = Config::default();

    // Load global config first
    if let Some(path) = global_path.filter(|p| p.exists()) {
        config.merge(Config::load_or_default(path));
    }

    // Project config overrides global
    if let Some(path) = project_path.filter(|p| p.exists()) {
        config.merge(Config::load_or_default(path));
    }

    config
}
