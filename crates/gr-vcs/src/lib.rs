pub mod backend;
pub mod detection;
pub mod git;
pub mod provider;
pub mod snapshot;
pub mod viewer;

pub use crate::backend::{
    ContentProvider, FetchError, GitError, LaunchError, RetrievalMode, SnapshotError,
};
pub use crate::git::GitCli;
pub use crate::provider::{VersionControlShow, WorkingCopy, confined};
pub use crate::snapshot::ClonedSnapshot;
pub use crate::viewer::{DiffViewer, ExternalDiffTool, ExternalEditor};
