//! Workspace - the project tree rooted at the `.sj2` marker.
//!
//! Every package and build path is resolved relative to the workspace root,
//! which is found by searching upward from any path inside the project.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::errors::SammyError;

/// Name of the marker directory identifying a workspace root.
pub const MARKER_DIR: &str = ".sj2";

/// Empty file created inside the marker directory.
pub const MARKER_FILE: &str = "reserved";

/// A located project workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Wrap an already-known root directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Workspace { root: root.into() }
    }

    /// Locate the workspace enclosing `start`.
    pub fn locate(start: &Path) -> Result<Self> {
        find_workspace_root(start, MARKER_DIR).map(Workspace::new)
    }

    /// The workspace root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/.sj2`
    pub fn marker_dir(&self) -> PathBuf {
        self.root.join(MARKER_DIR)
    }

    /// Project-local configuration file.
    pub fn config_path(&self) -> PathBuf {
        self.marker_dir().join("config.toml")
    }

    /// Fetched package trees, one directory per short name.
    pub fn packages_dir(&self) -> PathBuf {
        self.root.join("packages")
    }

    /// Dependency links exposed on the compiler include path.
    pub fn library_dir(&self) -> PathBuf {
        self.root.join("library")
    }

    /// Root of all build outputs.
    pub fn build_dir(&self) -> PathBuf {
        self.root.join("build")
    }

    /// Cache entry for a package.
    pub fn package_dir(&self, short_name: &str) -> PathBuf {
        self.packages_dir().join(short_name)
    }

    /// Dependency link for a package.
    pub fn library_link(&self, short_name: &str) -> PathBuf {
        self.library_dir().join(short_name)
    }

    /// The directory a library's link points at: `packages/<name>/<name>`.
    pub fn package_sources(&self, short_name: &str) -> PathBuf {
        self.package_dir(short_name).join(short_name)
    }

    /// Platform support directory: `library/lib<platform>/platform`.
    pub fn platform_dir(&self, platform: &str) -> PathBuf {
        self.library_dir()
            .join(format!("lib{}", platform))
            .join("platform")
    }

    /// Binaries of a toolchain package: `packages/<toolchain>/bin`.
    pub fn toolchain_bin_dir(&self, toolchain: &str) -> PathBuf {
        self.package_dir(toolchain).join("bin")
    }

    /// Path of `path` relative to the root, if it lies inside the workspace.
    pub fn relative(&self, path: &Path) -> Option<PathBuf> {
        path.strip_prefix(&self.root).ok().map(Path::to_path_buf)
    }

    /// Create the marker and the standard directories under `root`.
    pub fn create(root: &Path) -> Result<Self> {
        let ws = Workspace::new(root);
        for dir in [ws.marker_dir(), ws.library_dir(), ws.packages_dir()] {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create directory: {}", dir.display()))?;
        }
        let marker_file = ws.marker_dir().join(MARKER_FILE);
        std::fs::write(&marker_file, "")
            .with_context(|| format!("failed to create {}", marker_file.display()))?;
        Ok(ws)
    }
}

/// Return the nearest ancestor of `start` (inclusive when `start` is a
/// directory) whose immediate children include `marker`.
pub fn find_workspace_root(start: &Path, marker: &str) -> Result<PathBuf> {
    let absolute = if start.is_absolute() {
        start.to_path_buf()
    } else {
        std::env::current_dir()
            .context("failed to get current directory")?
            .join(start)
    };
    let absolute = absolute.canonicalize().unwrap_or(absolute);

    let mut current = if absolute.is_dir() {
        absolute.clone()
    } else {
        match absolute.parent() {
            Some(parent) => parent.to_path_buf(),
            None => absolute.clone(),
        }
    };

    loop {
        tracing::debug!("searching for {} in {}", marker, current.display());
        if has_child(&current, marker) {
            return Ok(current);
        }

        let parent = current.parent().map(Path::to_path_buf).unwrap_or_else(|| current.clone());
        if parent == current {
            return Err(SammyError::WorkspaceNotFound { start: start.to_path_buf() }.into());
        }
        current = parent;
    }
}

fn has_child(dir: &Path, name: &str) -> bool {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries.flatten().any(|entry| entry.file_name() == name),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_locate_from_root() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().canonicalize().unwrap();
        Workspace::create(&root).unwrap();

        let ws = Workspace::locate(&root).unwrap();
        assert_eq!(ws.root(), root);
    }

    #[test]
    fn test_locate_from_any_depth() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().canonicalize().unwrap();
        Workspace::create(&root).unwrap();

        let mut nested = root.clone();
        for depth in 0..6 {
            nested = nested.join(format!("level{}", depth));
            std::fs::create_dir_all(&nested).unwrap();
            assert_eq!(Workspace::locate(&nested).unwrap().root(), root);
        }

        let file = nested.join("main.cpp");
        std::fs::write(&file, "int main() {}").unwrap();
        assert_eq!(Workspace::locate(&file).unwrap().root(), root);
    }

    #[test]
    fn test_nearest_marker_wins() {
        let tmp = TempDir::new().unwrap();
        let outer = tmp.path().canonicalize().unwrap();
        Workspace::create(&outer).unwrap();
        let inner = outer.join("sub/project");
        std::fs::create_dir_all(&inner).unwrap();
        Workspace::create(&inner).unwrap();

        let found = find_workspace_root(&inner.join("src"), MARKER_DIR);
        // `src` does not exist, so the search starts at its parent
        assert_eq!(found.unwrap(), inner);
    }

    #[test]
    fn test_outside_workspace_terminates() {
        let tmp = TempDir::new().unwrap();
        let err = find_workspace_root(tmp.path(), ".sj2-marker-that-does-not-exist").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SammyError>(),
            Some(SammyError::WorkspaceNotFound { .. })
        ));
    }

    #[test]
    fn test_create_layout() {
        let tmp = TempDir::new().unwrap();
        let ws = Workspace::create(tmp.path()).unwrap();

        assert!(ws.marker_dir().join(MARKER_FILE).is_file());
        assert!(ws.library_dir().is_dir());
        assert!(ws.packages_dir().is_dir());
    }

    #[test]
    fn test_paths() {
        let ws = Workspace::new("/proj");
        assert_eq!(ws.library_link("libcore"), PathBuf::from("/proj/library/libcore"));
        assert_eq!(
            ws.package_sources("libcore"),
            PathBuf::from("/proj/packages/libcore/libcore")
        );
        assert_eq!(
            ws.platform_dir("lpc40xx"),
            PathBuf::from("/proj/library/liblpc40xx/platform")
        );
        assert_eq!(
            ws.toolchain_bin_dir("gcc-arm"),
            PathBuf::from("/proj/packages/gcc-arm/bin")
        );
        assert_eq!(
            ws.relative(Path::new("/proj/demos/blinky")),
            Some(PathBuf::from("demos/blinky"))
        );
        assert_eq!(ws.relative(Path::new("/elsewhere")), None);
    }
}
