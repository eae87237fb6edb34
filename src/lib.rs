//! gh-activity-importer - transfer git commit activity between repositories
//!
//! Finds commits by a git author in one repository and recreates them as
//! empty marker commits by a new author in another repository. The pipeline
//! is linear: open both repositories, walk the source history inside a date
//! window, keep the author timestamps that match the filter, then replay
//! them oldest first in the destination.

pub mod cli;
pub mod git;
pub mod importer;
