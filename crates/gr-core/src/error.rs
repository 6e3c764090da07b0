use thiserror::Error;

#[derive(Debug, Error)]
pub enum DumpError {
    #[error("no valid change object found in dump")]
    NoValidRecord,
    #[error("dump contains {count} change objects")]
    AmbiguousInput { count: usize },
}

#[derive(Debug, Error)]
pub enum ChangeError {
    #[error("patch set {requested} not found")]
    UnknownPatchSet { requested: String },
    #[error("no patch sets found in change")]
    NoPatchSets,
    #[error("patch set {number} has no revision")]
    RevisionUnavailable { number: u32 },
    #[error("several patch sets available and none was chosen")]
    SelectionRequired,
}

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("unknown summary format: {name}")]
    UnknownFormat { name: String },
    #[error("json encoding failed: {message}")]
    Encode { message: String },
}

#[derive(Debug, Error)]
pub enum GrError {
    #[error(transparent)]
    Dump(#[from] DumpError),
    #[error(transparent)]
    Change(#[from] ChangeError),
    #[error(transparent)]
    Summary(#[from] SummaryError),
    #[error("snapshot setup failed: {0}")]
    SnapshotSetupFailure(#[from] gr_vcs::SnapshotError),
}
