//! Implementation of `sammy project install`, `remove` and `list`.

use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::errors::SammyError;
use crate::core::package_ref::{repository_name, PackageIndex, PackageRef, Resolution};
use crate::core::workspace::Workspace;
use crate::sources::git::Fetcher;
use crate::sources::registry::PackageRegistry;
use crate::util::fs;
use crate::util::shell::{Shell, Status};

/// Prefix of the staging directories a fetch lands in before the swap.
const STAGING_PREFIX: &str = ".fetch-";

/// Where package names are looked up.
pub struct PackageSources<'a> {
    /// Remote listing, only consulted when the identifier could be a key
    pub registry: &'a dyn PackageRegistry,

    /// Static entries that win over the remote listing
    pub overrides: &'a PackageIndex,
}

/// Outcome of a successful install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallResult {
    /// Directory name under `packages/` and `library/`
    pub name: String,

    /// URL the package was cloned from
    pub url: String,

    /// The package cache entry
    pub package_dir: PathBuf,

    /// The dependency link, when the package ships library sources
    pub link: Option<PathBuf>,
}

/// Whether `identifier` can name a registry entry. URLs and paths cannot,
/// so installing from them never needs the remote listing.
fn could_be_registry_key(identifier: &str) -> bool {
    !identifier.is_empty() && !identifier.contains(['/', '\\', ':', '@'])
}

/// Make a relative path to an existing local repository absolute.
///
/// Bare words stay registry keys even when a directory of that name exists;
/// write `./libfoo` to install from it.
pub fn local_repository(cwd: &Path, identifier: &str) -> Option<PathBuf> {
    let path = Path::new(identifier);
    if could_be_registry_key(identifier)
        || path.is_absolute()
        || repository_name(identifier).is_some()
    {
        return None;
    }
    let full = cwd.join(path);
    if !full.is_dir() {
        return None;
    }
    Some(full.canonicalize().unwrap_or(full))
}

/// A package name must be one plain path component so it only ever
/// addresses its own entry under `packages/` and `library/`.
fn checked_name(name: String, identifier: &str) -> Result<String, SammyError> {
    let mut components = Path::new(&name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(component)), None) if component == name.as_str() => Ok(name),
        _ => Err(SammyError::InvalidPackageReference {
            identifier: identifier.to_string(),
        }),
    }
}

/// Resolve a user-supplied identifier to a clone URL.
pub fn resolve_package(identifier: &str, sources: &PackageSources<'_>) -> Result<Resolution> {
    if sources.overrides.get(identifier).is_some() {
        return Ok(Resolution::resolve(identifier, sources.overrides)?);
    }

    if !could_be_registry_key(identifier) {
        return Ok(Resolution::resolve(identifier, &PackageIndex::new())?);
    }

    let index = sources.registry.fetch_index().with_context(|| {
        format!(
            "failed to look up `{}` in {}",
            identifier,
            sources.registry.describe()
        )
    })?;
    tracing::debug!("registry lists {} packages", index.len());
    Ok(Resolution::resolve(identifier, &index)?)
}

/// All known packages: the remote listing with static entries on top.
pub fn list_packages(sources: &PackageSources<'_>) -> Result<PackageIndex> {
    let mut index = sources
        .registry
        .fetch_index()
        .with_context(|| format!("failed to list {}", sources.registry.describe()))?;
    index.extend(sources.overrides.clone());
    Ok(index)
}

/// Install one package into the workspace.
///
/// The package is fetched into a staging directory inside `packages/` and
/// only swapped into place once the fetch succeeded, so a failed reinstall
/// leaves the previous cache entry and its link untouched.
pub fn install_package(
    shell: &Shell,
    ws: &Workspace,
    package: &PackageRef,
    sources: &PackageSources<'_>,
    fetcher: &dyn Fetcher,
) -> Result<InstallResult> {
    let resolution = resolve_package(&package.name, sources)?;
    let name = checked_name(resolution.short_name(), &package.name)?;
    let url = resolution.clone_url().to_string();
    tracing::debug!("{} resolved to {} ({})", package.name, url, name);

    shell.status(Status::Fetching, format!("{} ({})", url, package.tag));
    let outcome = fetch_into_cache(shell, ws, &name, &url, &package.tag, fetcher)
        .map(|package_dir| {
            let link = link_package(shell, ws, &name);
            InstallResult {
                name: name.clone(),
                url: url.clone(),
                package_dir,
                link,
            }
        });

    shell
        .begin_step(Status::Installing, format!("{}@{}", name, package.tag))
        .finish(outcome)
}

/// Install packages in order, stopping at the first failure.
pub fn install_packages(
    shell: &Shell,
    ws: &Workspace,
    packages: &[PackageRef],
    sources: &PackageSources<'_>,
    fetcher: &dyn Fetcher,
) -> Result<Vec<InstallResult>> {
    packages
        .iter()
        .map(|package| install_package(shell, ws, package, sources, fetcher))
        .collect()
}

fn fetch_into_cache(
    shell: &Shell,
    ws: &Workspace,
    name: &str,
    url: &str,
    tag: &str,
    fetcher: &dyn Fetcher,
) -> Result<PathBuf> {
    let packages_dir = ws.packages_dir();
    fs::ensure_dir(&packages_dir)?;

    // Same filesystem as the destination, so the swap is a rename
    let staging = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempdir_in(&packages_dir)
        .with_context(|| format!("failed to create staging directory in {}", packages_dir.display()))?;
    let checkout = staging.path().join(name);

    fetcher.fetch(shell, url, tag, &checkout)?;

    // The previous entry moves aside first and is only deleted once the new
    // checkout is in place; dropping `staging` cleans up whatever is left
    let dest = ws.package_dir(name);
    let previous = staging.path().join(format!("{}.previous", name));
    let replacing = dest.exists();
    if replacing {
        std::fs::rename(&dest, &previous)
            .with_context(|| format!("failed to move aside {}", dest.display()))?;
    }
    if let Err(e) = std::fs::rename(&checkout, &dest) {
        if replacing {
            if let Err(restore) = std::fs::rename(&previous, &dest) {
                tracing::warn!("failed to restore {}: {}", dest.display(), restore);
            }
        }
        return Err(anyhow::Error::new(e).context(format!(
            "failed to move {} into {}",
            checkout.display(),
            dest.display()
        )));
    }
    if replacing {
        if let Err(e) = fs::force_remove_dir_all(&previous) {
            tracing::warn!("failed to remove previous {}: {:#}", name, e);
        }
    }
    tracing::info!("fetched {} into {}", url, dest.display());

    Ok(dest)
}

/// Point `library/<name>` at `packages/<name>/<name>`, or drop a stale link
/// when the package has no library sources.
///
/// Link failures only cost the link; the fetched package stays installed.
fn link_package(shell: &Shell, ws: &Workspace, name: &str) -> Option<PathBuf> {
    let link = ws.library_link(name);
    let target = ws.package_sources(name);

    if !target.is_dir() {
        tracing::debug!("{} has no {} directory; not linking", name, name);
        if let Err(e) = fs::remove_link_if_exists(&link) {
            tracing::warn!("failed to remove stale link {}: {}", link.display(), e);
        }
        return None;
    }

    let result = fs::ensure_dir(&ws.library_dir())
        .and_then(|()| fs::replace_symlink(&target, &link).map_err(anyhow::Error::from));
    match result {
        Ok(()) => {
            shell.status(
                Status::Linked,
                format!(
                    "{} -> {}",
                    display_relative(ws, &link),
                    display_relative(ws, &target)
                ),
            );
            Some(link)
        }
        Err(e) => {
            tracing::warn!("failed to link {}: {:#}", link.display(), e);
            shell.warn(format!(
                "could not link {} to {}: {:#}",
                display_relative(ws, &link),
                display_relative(ws, &target),
                e
            ));
            None
        }
    }
}

fn display_relative(ws: &Workspace, path: &Path) -> String {
    fs::relative_path(ws.root(), path).display().to_string()
}

/// Directory name a `remove` argument refers to. URLs are accepted and
/// reduced to their repository name.
fn removal_name(identifier: &str) -> String {
    if could_be_registry_key(identifier) {
        return identifier.to_string();
    }
    repository_name(identifier).unwrap_or_else(|| identifier.to_string())
}

/// Remove a package's link and cache entry.
///
/// A missing link is fine; a missing cache entry is `PackageNotFound`.
pub fn remove_package(shell: &Shell, ws: &Workspace, identifier: &str) -> Result<()> {
    let name = checked_name(removal_name(identifier), identifier)?;
    let line = shell.begin_step(Status::Removed, &name);
    line.finish(remove_entry(ws, &name))
}

fn remove_entry(ws: &Workspace, name: &str) -> Result<()> {
    let link = ws.library_link(name);
    if fs::remove_link_if_exists(&link)
        .with_context(|| format!("failed to remove link {}", link.display()))?
    {
        tracing::info!("removed link {}", link.display());
    }

    let package_dir = ws.package_dir(name);
    if !package_dir.is_dir() {
        return Err(SammyError::PackageNotFound {
            name: name.to_string(),
            path: package_dir,
        }
        .into());
    }
    fs::force_remove_dir_all(&package_dir)?;
    tracing::info!("removed {}", package_dir.display());
    Ok(())
}
