//! `git` command-line backend for [`VersionControl`].
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use super::{VcsError, VersionControl, WORKTREE};

/// Runs `git` inside a repository directory.
pub struct GitCli {
    root: PathBuf,
}

impl GitCli {
    #[must_use]
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Open `root`, failing with [`VcsError::NoRepository`] outside a repository.
    pub fn discover<P: AsRef<Path>>(root: P) -> Result<Self, VcsError> {
        let git = Self::new(root);
        if !git.is_repository() {
            return Err(VcsError::NoRepository);
        }
        Ok(git)
    }

    pub fn is_repository(&self) -> bool {
        self.run(&["rev-parse", "--git-dir"]).is_ok()
    }

    fn run(&self, args: &[&str]) -> Result<Vec<u8>, VcsError> {
        debug!("git {}", args.join(" "));
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .output()?;

        if output.status.success() {
            Ok(output.stdout)
        } else {
            Err(VcsError::Command {
                command: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

/// Whether `git show` stderr means the path is absent at that revision.
fn is_missing_path(stderr: &str) -> bool {
    stderr.contains("does not exist")
        || stderr.contains("exists on disk, but not in")
        || stderr.contains("invalid object name")
        || stderr.contains("bad revision")
}

impl VersionControl for GitCli {
    fn diff(&self, base: &str) -> Result<Vec<u8>, VcsError> {
        if !self.is_repository() {
            return Err(VcsError::NoRepository);
        }
        let range = format!("{base}...HEAD");
        match self.run(&["diff", &range]) {
            Ok(out) => Ok(out),
            Err(e) => {
                debug!("Three-dot diff against {base} failed ({e}), using two-dot diff");
                self.run(&["diff", base])
            }
        }
    }

    fn uncommitted_diff(&self) -> Result<Vec<u8>, VcsError> {
        if !self.is_repository() {
            return Err(VcsError::NoRepository);
        }
        let mut out = self.run(&["diff", "--cached"])?;
        out.extend(self.run(&["diff"])?);
        Ok(out)
    }

    fn file_at_revision(&self, path: &str, revision: &str) -> Result<String, VcsError> {
        let object = format!("{revision}:{path}");
        match self.run(&["show", &object]) {
            Ok(out) => Ok(String::from_utf8_lossy(&out).into_owned()),
            Err(VcsError::Command { stderr, .. }) if is_missing_path(&stderr) => {
                Err(VcsError::NotFound {
                    path: path.to_string(),
                    revision: revision.to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }

    fn current_file(&self, path: &str) -> Result<String, VcsError> {
        fs::read_to_string(self.root.join(path)).map_err(|e| match e.kind() {
            ErrorKind::NotFound => VcsError::NotFound {
                path: path.to_string(),
                revision: WORKTREE.to_string(),
            },
            _ => VcsError::Io(e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_current_file_reads_relative_to_root() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("pkg")).unwrap();
        fs::write(dir.path().join("pkg/a.go"), "package pkg\n").unwrap();

        let git = GitCli::new(dir.path());
        assert_eq!(git.current_file("pkg/a.go").unwrap(), "package pkg\n");
    }

    #[test]
    fn test_missing_worktree_file_is_not_found() {
        let dir = tempdir().unwrap();
        let git = GitCli::new(dir.path());
        let err = git.current_file("nope.go").unwrap_err();
        assert!(matches!(err, VcsError::NotFound { ref revision, .. } if revision == WORKTREE));
    }

    #[test]
    fn test_missing_path_messages() {
        assert!(is_missing_path(
            "fatal: path 'a.go' does not exist in 'HEAD'"
        ));
        assert!(is_missing_path(
            "fatal: path 'a.go' exists on disk, but not in 'main'"
        ));
        assert!(!is_missing_path("fatal: unable to access repository"));
    }
}
