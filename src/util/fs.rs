//! Filesystem utilities.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Read a file to string, with nice error messages.
pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read file: {}", path.display()))
}

/// Write a string to a file, creating parent directories if needed.
pub fn write_string(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, contents).with_context(|| format!("failed to write file: {}", path.display()))
}

/// Get the relative path from `base` to `path`.
pub fn relative_path(base: &Path, path: &Path) -> PathBuf {
    pathdiff::diff_paths(path, base).unwrap_or_else(|| path.to_path_buf())
}

/// Whether `path` is a symlink, dangling or not.
pub fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}

/// Remove a symlink. A missing link is not an error.
///
/// Returns whether a link was removed.
pub fn remove_link_if_exists(link: &Path) -> io::Result<bool> {
    let meta = match fs::symlink_metadata(link) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };

    if meta.file_type().is_symlink() {
        // Directory symlinks on Windows must be removed as directories
        match fs::remove_file(link) {
            Ok(()) => {}
            Err(_) if cfg!(windows) => fs::remove_dir(link)?,
            Err(e) => return Err(e),
        }
    } else if meta.is_dir() {
        fs::remove_dir(link)?;
    } else {
        fs::remove_file(link)?;
    }
    Ok(true)
}

/// Point `link` at `target`, replacing whatever link is there.
pub fn replace_symlink(target: &Path, link: &Path) -> io::Result<()> {
    remove_link_if_exists(link)?;
    symlink(target, link)
}

/// Create a symlink (platform-aware).
#[cfg(unix)]
pub fn symlink(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

#[cfg(windows)]
pub fn symlink(src: &Path, dst: &Path) -> io::Result<()> {
    // relative targets resolve against the link's directory
    let resolved = match dst.parent() {
        Some(parent) if src.is_relative() => parent.join(src),
        _ => src.to_path_buf(),
    };
    if resolved.is_dir() {
        std::os::windows::fs::symlink_dir(src, dst)
    } else {
        std::os::windows::fs::symlink_file(src, dst)
    }
}

/// Recursively delete `path`, clearing read-only bits first.
///
/// Git object files are written read-only, which makes a plain
/// `remove_dir_all` fail on some platforms.
pub fn force_remove_dir_all(path: &Path) -> Result<()> {
    for entry in WalkDir::new(path).contents_first(true).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!("skipping unreadable entry: {}", e);
                continue;
            }
        };
        if entry.path_is_symlink() {
            continue;
        }
        let meta = match entry.metadata() {
            Ok(meta) => meta,
            Err(_) => continue,
        };
        let mut perms = meta.permissions();
        if perms.readonly() {
            #[allow(clippy::permissions_set_readonly_false)]
            perms.set_readonly(false);
            fs::set_permissions(entry.path(), perms).with_context(|| {
                format!("failed to clear read-only bit on {}", entry.path().display())
            })?;
        }
    }

    fs::remove_dir_all(path)
        .with_context(|| format!("failed to remove directory: {}", path.display()))
}
