//! Version-control text provider.
//!
//! The pipeline only needs raw diff output, the working-tree contents of a file
//! and the contents of a file at some earlier revision.
pub mod git;
pub mod memory;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VcsError {
    #[error("not inside a git repository")]
    NoRepository,

    #[error("{path} does not exist at {revision}")]
    NotFound { path: String, revision: String },

    #[error("git {command} failed: {stderr}")]
    Command { command: String, stderr: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Revision label used for working-tree lookups in errors.
pub const WORKTREE: &str = "worktree";

pub trait VersionControl {
    /// Diff of the current branch against `base`.
    fn diff(&self, base: &str) -> Result<Vec<u8>, VcsError>;

    /// Staged followed by unstaged changes.
    fn uncommitted_diff(&self) -> Result<Vec<u8>, VcsError>;

    /// Contents of `path` as of `revision`.
    fn file_at_revision(&self, path: &str, revision: &str) -> Result<String, VcsError>;

    /// Current working-tree contents of `path`.
    fn current_file(&self, path: &str) -> Result<String, VcsError>;
}
