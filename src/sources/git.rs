//! Git fetcher - clones a package repository at a branch or tag.

use std::cell::Cell;
use std::path::Path;

use anyhow::{Context, Result};
use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{AutotagOption, BranchType, Cred, FetchOptions, Oid, RemoteCallbacks, Repository};

use crate::core::errors::SammyError;
use crate::util::shell::Shell;

/// Materializes a repository at a given revision into a directory.
///
/// `dest` must not exist yet; on failure the caller discards whatever was
/// left there.
pub trait Fetcher {
    fn fetch(&self, shell: &Shell, url: &str, tag: &str, dest: &Path) -> Result<()>;
}

/// Fetcher backed by libgit2.
#[derive(Debug, Default, Clone, Copy)]
pub struct GitFetcher;

impl Fetcher for GitFetcher {
    fn fetch(&self, shell: &Shell, url: &str, tag: &str, dest: &Path) -> Result<()> {
        tracing::info!("Cloning {} at {}", url, tag);

        let result = clone(shell, url, dest).and_then(|repo| {
            let commit = checkout(&repo, tag)?;
            tracing::debug!("{} at {} is {}", url, tag, commit);
            Ok(())
        });

        result.map_err(|e| {
            anyhow::Error::new(SammyError::FetchFailed {
                url: url.to_string(),
                tag: tag.to_string(),
                message: format!("{:#}", e),
            })
        })
    }
}

fn clone(shell: &Shell, url: &str, dest: &Path) -> Result<Repository> {
    let progress = shell.progress(format!("Receiving {}", url));

    // libgit2 retries the callback after a rejected key; ask the agent once
    let asked_agent = Cell::new(false);
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(|_url, username, _allowed| {
        if asked_agent.replace(true) {
            return Err(git2::Error::from_str("ssh agent offered no usable key"));
        }
        Cred::ssh_key_from_agent(username.unwrap_or("git"))
    });
    if let Some(pb) = &progress {
        callbacks.transfer_progress(|stats| {
            pb.set_length(stats.total_objects() as u64);
            pb.set_position(stats.received_objects() as u64);
            true
        });
    }

    let mut fetch_options = FetchOptions::new();
    fetch_options.remote_callbacks(callbacks);
    fetch_options.download_tags(AutotagOption::All);

    let repo = RepoBuilder::new()
        .fetch_options(fetch_options)
        .clone(url, dest)
        .with_context(|| format!("failed to clone {}", url));

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
    repo
}

/// Check out `tag`, trying a remote branch, then a tag, then a commit id.
///
/// Branches get a local branch of the same name so the working copy is not
/// left on a detached HEAD.
fn checkout(repo: &Repository, tag: &str) -> Result<Oid> {
    let mut force = CheckoutBuilder::new();
    force.force();

    if let Ok(remote) = repo.find_branch(&format!("origin/{}", tag), BranchType::Remote) {
        let commit = remote.get().peel_to_commit()?;
        let local = match repo.find_branch(tag, BranchType::Local) {
            Ok(branch) => branch,
            Err(_) => repo.branch(tag, &commit, false)?,
        };
        let local_ref = local
            .get()
            .name()
            .map(str::to_string)
            .with_context(|| format!("branch `{}` is not valid UTF-8", tag))?;
        repo.set_head(&local_ref)?;
        repo.checkout_head(Some(&mut force))?;
        return Ok(commit.id());
    }

    let commit = match repo.find_reference(&format!("refs/tags/{}", tag)) {
        Ok(reference) => reference.peel_to_commit()?,
        Err(_) => repo
            .revparse_single(tag)
            .and_then(|obj| obj.peel_to_commit())
            .with_context(|| format!("no branch, tag or commit named `{}`", tag))?,
    };

    repo.set_head_detached(commit.id())?;
    repo.checkout_head(Some(&mut force))?;
    Ok(commit.id())
}
