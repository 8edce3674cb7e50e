//! Package references and their resolution to clone URLs.
//!
//! A user names a package either by its registry key (`libcore`) or by a
//! repository URL in any of the forms git understands. Resolution happens
//! once, up front, and produces a [`Resolution`] that the rest of the
//! install path consumes without re-inspecting the identifier.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::core::errors::SammyError;

/// Branch checked out when no tag is given.
pub const DEFAULT_TAG: &str = "main";

/// `user@host:path` scp-style git remotes.
static SCP_LIKE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._-]+@[A-Za-z0-9.-]+:(?P<path>[^/\\][^\\]*)$")
        .expect("scp-like url regex is valid")
});

/// A package the user asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRef {
    /// Registry key or repository URL.
    pub name: String,
    /// Branch or tag to check out.
    #[serde(default = "default_tag")]
    pub tag: String,
}

fn default_tag() -> String {
    DEFAULT_TAG.to_string()
}

impl PackageRef {
    pub fn new(name: impl Into<String>, tag: impl Into<String>) -> Self {
        PackageRef {
            name: name.into(),
            tag: tag.into(),
        }
    }

    /// Reference at the default branch.
    pub fn latest(name: impl Into<String>) -> Self {
        PackageRef::new(name, DEFAULT_TAG)
    }
}

impl fmt::Display for PackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.tag)
    }
}

/// Mapping of package short names to clone URLs, as published by a registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageIndex {
    packages: BTreeMap<String, String>,
}

impl PackageIndex {
    pub fn new() -> Self {
        PackageIndex::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, url: impl Into<String>) {
        self.packages.insert(name.into(), url.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.packages.get(name).map(String::as_str)
    }

    /// Entries of `other` replace entries with the same name.
    pub fn extend(&mut self, other: PackageIndex) {
        self.packages.extend(other.packages);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.packages.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

impl FromIterator<(String, String)> for PackageIndex {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        PackageIndex {
            packages: iter.into_iter().collect(),
        }
    }
}

/// Where a package identifier points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A registry key and the URL the registry maps it to.
    Registry { name: String, url: String },
    /// The identifier was itself a repository URL.
    DirectUrl(String),
}

impl Resolution {
    /// Resolve `identifier` against `index`.
    ///
    /// Registry keys win over URL interpretation; an unknown identifier that
    /// is not a repository URL is an [`SammyError::InvalidPackageReference`].
    pub fn resolve(identifier: &str, index: &PackageIndex) -> Result<Self, SammyError> {
        if let Some(url) = index.get(identifier) {
            return Ok(Resolution::Registry {
                name: identifier.to_string(),
                url: url.to_string(),
            });
        }

        if repository_name(identifier).is_some() {
            return Ok(Resolution::DirectUrl(identifier.to_string()));
        }

        Err(SammyError::InvalidPackageReference {
            identifier: identifier.to_string(),
        })
    }

    /// URL handed to the fetcher.
    pub fn clone_url(&self) -> &str {
        match self {
            Resolution::Registry { url, .. } => url,
            Resolution::DirectUrl(url) => url,
        }
    }

    /// Directory name used under `packages/` and `library/`.
    pub fn short_name(&self) -> String {
        match self {
            Resolution::Registry { name, url } => {
                repository_name(url).unwrap_or_else(|| name.clone())
            }
            Resolution::DirectUrl(url) => {
                // resolve() only produces DirectUrl for URLs with a repository name
                repository_name(url).unwrap_or_else(|| url.clone())
            }
        }
    }
}

/// Repository name of a git remote: the final path segment without `.git`.
///
/// Accepts `http(s)://`, `ssh://`, `git://` and `file://` URLs, scp-style
/// `git@host:org/repo.git` remotes, and absolute local paths. Returns `None`
/// for anything else, including bare words.
pub fn repository_name(remote: &str) -> Option<String> {
    let remote = remote.trim();
    if remote.is_empty() {
        return None;
    }

    let path = if let Ok(url) = Url::parse(remote) {
        match url.scheme() {
            "http" | "https" | "ssh" | "git" | "git+ssh" => {
                url.host_str()?;
                url.path().to_string()
            }
            "file" => url.path().to_string(),
            _ => {
                // Windows drive letters parse as a one-letter scheme
                if url.scheme().len() == 1 {
                    remote.to_string()
                } else {
                    return None;
                }
            }
        }
    } else if let Some(caps) = SCP_LIKE.captures(remote) {
        caps["path"].to_string()
    } else if std::path::Path::new(remote).is_absolute() {
        remote.to_string()
    } else {
        return None;
    };

    let segment = path
        .trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()?;
    let name = segment.strip_suffix(".git").unwrap_or(segment);

    if name.is_empty() || name == "." || name == ".." {
        None
    } else {
        Some(name.to_string())
    }
}
