//! In-memory [`VersionControl`] for tests and for callers that already hold
//! the diff and file contents.
use std::collections::HashMap;

use super::{VcsError, VersionControl, WORKTREE};

#[derive(Debug, Clone, Default)]
pub struct MemoryRepo {
    diff: Vec<u8>,
    worktree: HashMap<String, String>,
    revisions: HashMap<(String, String), String>,
    detached: bool,
}

impl MemoryRepo {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A repository whose diff calls fail with [`VcsError::NoRepository`].
    #[must_use]
    pub fn detached() -> Self {
        Self {
            detached: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_diff(mut self, diff: impl Into<Vec<u8>>) -> Self {
        self.diff = diff.into();
        self
    }

    #[must_use]
    pub fn with_file(mut self, path: impl Into<String>, text: impl Into<String>) -> Self {
        self.worktree.insert(path.into(), text.into());
        self
    }

    #[must_use]
    pub fn with_revision(
        mut self,
        revision: impl Into<String>,
        path: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        self.revisions
            .insert((revision.into(), path.into()), text.into());
        self
    }
}

impl VersionControl for MemoryRepo {
    fn diff(&self, _base: &str) -> Result<Vec<u8>, VcsError> {
        if self.detached {
            return Err(VcsError::NoRepository);
        }
        Ok(self.diff.clone())
    }

    fn uncommitted_diff(&self) -> Result<Vec<u8>, VcsError> {
        self.diff("HEAD")
    }

    fn file_at_revision(&self, path: &str, revision: &str) -> Result<String, VcsError> {
        self.revisions
            .get(&(revision.to_string(), path.to_string()))
            .cloned()
            .ok_or_else(|| VcsError::NotFound {
                path: path.to_string(),
                revision: revision.to_string(),
            })
    }

    fn current_file(&self, path: &str) -> Result<String, VcsError> {
        self.worktree
            .get(path)
            .cloned()
            .ok_or_else(|| VcsError::NotFound {
                path: path.to_string(),
                revision: WORKTREE.to_string(),
            })
    }
}
