//! Activity transfer orchestration
//!
//! Collects the author timestamps of matching commits in the source
//! repository and replays them as empty marker commits in the destination,
//! oldest first.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info};

use crate::git::{self, GitRepo, OpenError, WriteError};

/// A git author or committer.
///
/// Used both as a filter against source commits (where an empty field means
/// "don't constrain on this field") and as the author written into
/// destination commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl Identity {
    /// Field-wise filter match: an empty filter field matches anything, a
    /// non-empty field must be byte-equal.
    pub fn matches(&self, name: &str, email: &str) -> bool {
        if !self.name.is_empty() && self.name != name {
            return false;
        }
        if !self.email.is_empty() && self.email != email {
            return false;
        }
        true
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

/// Which side of the transfer an open failure happened on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Source,
    Dest,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Source => write!(f, "source"),
            Side::Dest => write!(f, "dest"),
        }
    }
}

/// Errors that can occur during a transfer run. All are fatal; nothing is
/// retried.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("error loading {side} repo: {source}")]
    Open {
        side: Side,
        #[source]
        source: OpenError,
    },

    #[error("failed to read source history: {0}")]
    History(#[from] git2::Error),

    #[error("source repository contains zero commits from author '{filter}' between {start} and {end}")]
    NoMatch {
        filter: Identity,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("error saving commit to dest repo: {0}")]
    Write(#[from] WriteError),
}

/// One transfer run: populated once from flags, never mutated.
#[derive(Debug, Clone)]
pub struct Importer {
    pub source_repo: String,
    pub dest_repo: String,
    pub source_author: Identity,
    pub dest_author: Identity,
    /// Inclusive lower bound of the search window.
    pub start: DateTime<Utc>,
    /// Exclusive upper bound of the search window.
    pub end: DateTime<Utc>,
}

impl Importer {
    /// Run the transfer and return the number of commits created in the
    /// destination.
    ///
    /// No rollback: the first write failure aborts the run, and commits
    /// already written stay in the destination history.
    pub fn run(&self) -> Result<usize, ImportError> {
        let source = GitRepo::open(&self.source_repo).map_err(|source| ImportError::Open {
            side: Side::Source,
            source,
        })?;
        let dest = GitRepo::open(&self.dest_repo).map_err(|source| ImportError::Open {
            side: Side::Dest,
            source,
        })?;

        let timestamps = source.author_timestamps(&self.source_author, self.start, self.end)?;
        if timestamps.is_empty() {
            return Err(ImportError::NoMatch {
                filter: self.source_author.clone(),
                start: self.start,
                end: self.end,
            });
        }
        debug!(
            "found {} commits by {} in {}",
            timestamps.len(),
            self.source_author,
            self.source_repo
        );

        // The walk yields newest first; the replay wants oldest first.
        for &timestamp in timestamps.iter().rev() {
            let message = git::format_timestamp(timestamp);
            dest.commit_empty(&message, &self.dest_author, timestamp)?;
        }

        info!(
            "transferred {} commits from {} to {}",
            timestamps.len(),
            self.source_repo,
            self.dest_repo
        );

        Ok(timestamps.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(name: &str, email: &str) -> Identity {
        Identity {
            name: name.to_string(),
            email: email.to_string(),
        }
    }

    #[test]
    fn test_matches_both_fields_set() {
        let f = filter("Ada", "ada@example.com");
        assert!(f.matches("Ada", "ada@example.com"));
        assert!(!f.matches("Ada", "other@example.com"));
        assert!(!f.matches("Grace", "ada@example.com"));
    }

    #[test]
    fn test_matches_empty_field_is_unconstrained() {
        let by_email = filter("", "ada@example.com");
        assert!(by_email.matches("Ada", "ada@example.com"));
        assert!(by_email.matches("Anyone Else", "ada@example.com"));
        assert!(!by_email.matches("Ada", "other@example.com"));

        let by_name = filter("Ada", "");
        assert!(by_name.matches("Ada", "anything@example.com"));
        assert!(!by_name.matches("ada", "ada@example.com")); // case-sensitive
    }

    #[test]
    fn test_no_match_error_names_filter_and_window() {
        let err = ImportError::NoMatch {
            filter: filter("Ada", "ada@example.com"),
            start: chrono::DateTime::UNIX_EPOCH,
            end: chrono::DateTime::UNIX_EPOCH,
        };
        let msg = err.to_string();
        assert!(msg.contains("zero commits"));
        assert!(msg.contains("Ada <ada@example.com>"));
        assert!(msg.contains("1970-01-01"));
    }
}
