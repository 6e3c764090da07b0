use crate::backend::{ContentProvider, FetchError, GitError, RetrievalMode};
use crate::git::GitCli;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Reads files straight from a working tree.
#[derive(Debug, Clone)]
pub struct WorkingCopy {
    root: PathBuf,
}

impl WorkingCopy {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ContentProvider for WorkingCopy {
    fn mode(&self) -> RetrievalMode {
        RetrievalMode::WorkingCopy
    }

    fn fetch(&self, path: &str, _revision: Option<&str>) -> Result<String, FetchError> {
        read_under(&self.root, path)
    }
}

/// Materializes `revision:path` through `git show`.
#[derive(Debug, Clone)]
pub struct VersionControlShow {
    git: GitCli,
    revision: Option<String>,
}

impl VersionControlShow {
    pub fn new(git: GitCli, revision: Option<String>) -> Self {
        Self { git, revision }
    }
}

impl ContentProvider for VersionControlShow {
    fn mode(&self) -> RetrievalMode {
        RetrievalMode::VersionControlShow
    }

    fn fetch(&self, path: &str, revision: Option<&str>) -> Result<String, FetchError> {
        let Some(revision) = revision.or(self.revision.as_deref()) else {
            return Err(FetchError::Retrieval {
                path: path.to_string(),
                reason: "no revision to show".to_string(),
            });
        };
        debug!(%revision, path, "fetching file from history");
        let bytes = self.git.show(revision, path).map_err(|err| {
            let reason = match err {
                GitError::CommandFailed { stderr, .. } => stderr,
                other => other.to_string(),
            };
            FetchError::Retrieval {
                path: path.to_string(),
                reason,
            }
        })?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// `root/path` for a plain relative path; `None` when `path` is absolute or
/// climbs out of `root` with `..`.
pub fn confined(root: &Path, path: &str) -> Option<PathBuf> {
    let relative = Path::new(path);
    let plain = relative
        .components()
        .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));
    (plain && relative.components().next().is_some()).then(|| root.join(relative))
}

pub(crate) fn read_under(root: &Path, path: &str) -> Result<String, FetchError> {
    let Some(full) = confined(root, path) else {
        debug!(path, "path leaves the tree root");
        return Err(FetchError::NotFound {
            path: path.to_string(),
        });
    };
    match std::fs::read(&full) {
        Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        Err(err) if err.kind() == ErrorKind::NotFound => Err(FetchError::NotFound {
            path: path.to_string(),
        }),
        Err(err) => Err(FetchError::Retrieval {
            path: path.to_string(),
            reason: err.to_string(),
        }),
    }
}
