use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GitError {
    #[error("failed to run {program}: {reason}")]
    Launch { program: String, reason: String },
    #[error("git {command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },
    #[error("git {command} produced non-utf8 output")]
    NonUtf8 { command: String },
    #[error("refusing revision {revision:?}")]
    InvalidRevision { revision: String },
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{path}: not found")]
    NotFound { path: String },
    #[error("{path}: {reason}")]
    Retrieval { path: String, reason: String },
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot copy of {source_root} failed: {reason}")]
    Copy { source_root: PathBuf, reason: String },
    #[error("snapshot checkout of {revision} failed: {source}")]
    Checkout {
        revision: String,
        #[source]
        source: GitError,
    },
}

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("command is empty")]
    EmptyCommand,
    #[error("invalid command: {reason}")]
    InvalidCommand { reason: String },
    #[error("failed to start {program}: {reason}")]
    Spawn { program: String, reason: String },
    #[error("{program} exited with {status}")]
    Exited { program: String, status: String },
}

/// Which strategy produces historical file text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RetrievalMode {
    #[serde(alias = "local")]
    WorkingCopy,
    #[serde(alias = "clone")]
    ClonedSnapshot,
    #[default]
    #[serde(alias = "git")]
    VersionControlShow,
}

impl RetrievalMode {
    pub fn needs_revision(self) -> bool {
        !matches!(self, RetrievalMode::WorkingCopy)
    }
}

impl fmt::Display for RetrievalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RetrievalMode::WorkingCopy => "working-copy",
            RetrievalMode::ClonedSnapshot => "cloned-snapshot",
            RetrievalMode::VersionControlShow => "version-control-show",
        };
        f.write_str(name)
    }
}

/// Returns the full text of a file as of some revision.
///
/// `revision` is a hint: strategies that are pinned to one tree ignore it.
pub trait ContentProvider {
    fn mode(&self) -> RetrievalMode;
    fn fetch(&self, path: &str, revision: Option<&str>) -> Result<String, FetchError>;
}

impl<P: ContentProvider + ?Sized> ContentProvider for Box<P> {
    fn mode(&self) -> RetrievalMode {
        (**self).mode()
    }

    fn fetch(&self, path: &str, revision: Option<&str>) -> Result<String, FetchError> {
        (**self).fetch(path, revision)
    }
}
