use gr_core::GrError;
use gr_vcs::{GitError, LaunchError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {reason}")]
    Read { path: PathBuf, reason: String },
    #[error("invalid config {path}: {reason}")]
    Parse { path: PathBuf, reason: String },
    #[error("invalid value {value:?} for {name}")]
    InvalidEnv { name: &'static str, value: String },
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read {path}: {reason}")]
    Read { path: String, reason: String },
    #[error("no ssh host configured; set [ssh] host in the config file or GR_SSH_HOST")]
    MissingHost,
    #[error("gerrit query failed: {reason}")]
    Query { reason: String },
    #[error("commit {revision} has no Change-Id footer")]
    NoChangeId { revision: String },
    #[error(transparent)]
    Git(#[from] GitError),
    #[error("failed to write {path}: {reason}")]
    Save { path: PathBuf, reason: String },
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Core(#[from] GrError),
    #[error("diff tool: {0}")]
    DiffTool(#[from] LaunchError),
    #[error("editor: {0}")]
    Editor(LaunchError),
    #[error("refusing to open {path}: outside the repository")]
    OutsideRepository { path: String },
    #[error(transparent)]
    Prompt(crate::prompt::PromptError),
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl CliError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        CliError::Io {
            context: context.into(),
            source,
        }
    }
}

impl From<gr_core::DumpError> for CliError {
    fn from(err: gr_core::DumpError) -> Self {
        CliError::Core(err.into())
    }
}

impl From<gr_core::ChangeError> for CliError {
    fn from(err: gr_core::ChangeError) -> Self {
        CliError::Core(err.into())
    }
}

impl From<gr_core::SummaryError> for CliError {
    fn from(err: gr_core::SummaryError) -> Self {
        CliError::Core(err.into())
    }
}

impl From<gr_vcs::SnapshotError> for CliError {
    fn from(err: gr_vcs::SnapshotError) -> Self {
        CliError::Core(err.into())
    }
}

impl From<crate::prompt::PromptError> for CliError {
    fn from(err: crate::prompt::PromptError) -> Self {
        match err {
            crate::prompt::PromptError::Io(source) => CliError::io("prompt failed", source),
            crate::prompt::PromptError::Change(err) => err.into(),
            other => CliError::Prompt(other),
        }
    }
}
