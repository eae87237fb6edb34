//! Repository access built on libgit2
//!
//! Opens local or remote repositories (cloning remote ones) and exposes the
//! two operations the importer needs: reading author timestamps out of the
//! source history and writing empty marker commits into the destination
//! worktree.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use git2::build::RepoBuilder;
use git2::{FetchOptions, Oid, RemoteCallbacks, Repository, Signature, Sort, Time};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::importer::Identity;

/// Directory remote repositories are cloned into, relative to the current
/// working directory. Fixed path, so concurrent runs in the same directory
/// would collide.
const CLONE_DIR: &str = "dest";

/// Errors opening or cloning a repository.
#[derive(Error, Debug)]
pub enum OpenError {
    #[error("failed to determine protocol from URL or filepath '{0}': found protocol separator '://' more than once")]
    AmbiguousScheme(String),

    #[error("failed to open local git repository '{path}': {source}")]
    Local { path: String, source: git2::Error },

    #[error("failed to clone remote repository '{url}': {source}")]
    Clone { url: String, source: git2::Error },
}

/// Errors creating a marker commit in the destination worktree.
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("repository has no working directory (bare repo?)")]
    BareRepository,

    #[error("failed to create marker file '{path}': {source}")]
    Marker {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to commit '{message}': {source}")]
    Commit { message: String, source: git2::Error },
}

/// Canonical string form of a timestamp (RFC 3339). Used for both the marker
/// file name and the commit message, so a replayed commit can be traced back
/// to its instant exactly.
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339()
}

fn from_git_time(time: &git2::Time) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(time.seconds(), 0).single()
}

/// A source or destination repository.
pub struct GitRepo {
    repo: Repository,
}

impl std::fmt::Debug for GitRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitRepo").finish_non_exhaustive()
    }
}

impl GitRepo {
    /// Open a repository from a locator: a plain local path, a `file://`
    /// URL (treated as a local path), or a remote URL that gets cloned into
    /// the fixed local `dest` directory.
    pub fn open(locator: &str) -> Result<Self, OpenError> {
        let parts: Vec<&str> = locator.split("://").collect();
        match parts.as_slice() {
            [path] => Self::open_local(path),
            ["file", path] => Self::open_local(path),
            [_, _] => Self::clone_remote(locator),
            _ => Err(OpenError::AmbiguousScheme(locator.to_string())),
        }
    }

    fn open_local(path: &str) -> Result<Self, OpenError> {
        let repo = Repository::open(path).map_err(|source| OpenError::Local {
            path: path.to_string(),
            source,
        })?;
        debug!("opened git repository at {:?}", repo.path());
        Ok(Self { repo })
    }

    fn clone_remote(url: &str) -> Result<Self, OpenError> {
        info!("cloning remote repository into local folder '{CLONE_DIR}'");

        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("valid template")
                .progress_chars("█▓▒░  "),
        );
        bar.set_message("receiving objects");

        let mut callbacks = RemoteCallbacks::new();
        callbacks.transfer_progress(|progress| {
            bar.set_length(progress.total_objects() as u64);
            bar.set_position(progress.received_objects() as u64);
            true
        });

        let mut fetch = FetchOptions::new();
        fetch.remote_callbacks(callbacks);

        let repo = RepoBuilder::new()
            .fetch_options(fetch)
            .clone(url, Path::new(CLONE_DIR))
            .map_err(|source| OpenError::Clone {
                url: url.to_string(),
                source,
            })?;
        bar.finish_and_clear();

        Ok(Self { repo })
    }

    /// Walk history from HEAD, newest first, and collect the author
    /// timestamp of every commit whose committer time falls inside
    /// `[start, end)` and whose author matches `filter`.
    ///
    /// libgit2 has no oldest-first walk that also sorts by time, so callers
    /// needing oldest-first reverse the returned sequence.
    pub fn author_timestamps(
        &self,
        filter: &Identity,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>, git2::Error> {
        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(Sort::TIME)?;
        revwalk.push_head()?;

        let mut timestamps = Vec::new();
        for oid_result in revwalk {
            let commit = self.repo.find_commit(oid_result?)?;

            let Some(committed) = from_git_time(&commit.time()) else {
                continue;
            };
            if committed < start || committed >= end {
                continue;
            }

            let author = commit.author();
            if !filter.matches(author.name().unwrap_or(""), author.email().unwrap_or("")) {
                continue;
            }

            if let Some(authored) = from_git_time(&author.when()) {
                timestamps.push(authored);
            }
        }

        Ok(timestamps)
    }

    /// Create one marker commit at `timestamp`, authored and committed by
    /// `author` at that exact instant rather than wall-clock time.
    ///
    /// The marker is a zero-byte file named by the RFC 3339 form of the
    /// timestamp, under a `<year>/<month>` directory in the worktree. The
    /// file gives every synthetic commit distinct, non-empty content (some
    /// engines refuse truly empty commits) and leaves a human-inspectable
    /// trace of what was created.
    ///
    /// Two commits with the same timestamp collide on the marker path: the
    /// second truncates the first's file and commits on top. Known, accepted
    /// limitation.
    pub fn commit_empty(
        &self,
        message: &str,
        author: &Identity,
        timestamp: DateTime<Utc>,
    ) -> Result<Oid, WriteError> {
        let workdir = self.repo.workdir().ok_or(WriteError::BareRepository)?;

        let marker = PathBuf::from(timestamp.year().to_string())
            .join(timestamp.month().to_string())
            .join(format_timestamp(timestamp));
        let marker_abs = workdir.join(&marker);
        if let Some(parent) = marker_abs.parent() {
            std::fs::create_dir_all(parent).map_err(|source| WriteError::Marker {
                path: marker.display().to_string(),
                source,
            })?;
        }
        std::fs::write(&marker_abs, "").map_err(|source| WriteError::Marker {
            path: marker.display().to_string(),
            source,
        })?;

        let commit_err = |source: git2::Error| WriteError::Commit {
            message: message.to_string(),
            source,
        };

        let mut index = self.repo.index().map_err(commit_err)?;
        index.add_path(&marker).map_err(commit_err)?;
        index.write().map_err(commit_err)?;
        let tree_id = index.write_tree().map_err(commit_err)?;
        let tree = self.repo.find_tree(tree_id).map_err(commit_err)?;

        let signature = Signature::new(
            &author.name,
            &author.email,
            &Time::new(timestamp.timestamp(), 0),
        )
        .map_err(commit_err)?;

        // HEAD is unborn in a fresh destination repo; the first marker
        // commit becomes the root.
        let parent = match self.repo.head() {
            Ok(head) => Some(head.peel_to_commit().map_err(commit_err)?),
            Err(_) => None,
        };
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        let oid = self
            .repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
            .map_err(commit_err)?;
        debug!("created commit {oid} at {timestamp}");

        Ok(oid)
    }
}
