//! Test fixtures shared by unit tests.
//!
//! [`GitFixture`] is a throwaway local repository that install and fetch
//! tests clone from instead of the network.

use std::path::{Path, PathBuf};

use git2::{Repository, RepositoryInitOptions, Signature};
use tempfile::TempDir;

/// A local git repository whose default branch is `main`.
pub struct GitFixture {
    _dir: TempDir,
    path: PathBuf,
    repo: Repository,
}

impl GitFixture {
    /// Create an empty repository in a directory named `name`.
    pub fn new(name: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(name);
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("main");
        let repo = Repository::init_opts(&path, &opts).unwrap();
        GitFixture {
            _dir: dir,
            path,
            repo,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Clonable location of the repository.
    pub fn url(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }

    /// Write `file` and commit it on the current branch.
    pub fn commit(&self, file: &str, contents: &str, message: &str) {
        let full = self.path.join(file);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&full, contents).unwrap();

        let mut index = self.repo.index().unwrap();
        index.add_path(Path::new(file)).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = self.repo.find_tree(tree_id).unwrap();

        let sig = Signature::now("Sammy Test", "test@example.com").unwrap();
        let parent = self
            .repo
            .head()
            .ok()
            .and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<_> = parent.iter().collect();
        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .unwrap();
    }

    /// Lightweight tag at HEAD.
    pub fn tag(&self, name: &str) {
        let head = self.repo.head().unwrap().peel_to_commit().unwrap();
        self.repo
            .tag_lightweight(name, head.as_object(), false)
            .unwrap();
    }

    /// Create `name` at HEAD and switch to it.
    pub fn branch(&self, name: &str) {
        let head = self.repo.head().unwrap().peel_to_commit().unwrap();
        self.repo.branch(name, &head, false).unwrap();
        self.repo.set_head(&format!("refs/heads/{}", name)).unwrap();
    }
}

/// An initialized workspace in a temporary directory.
pub fn workspace() -> (TempDir, crate::core::workspace::Workspace) {
    let tmp = TempDir::new().unwrap();
    let ws = crate::core::workspace::Workspace::create(tmp.path()).unwrap();
    (tmp, ws)
}
