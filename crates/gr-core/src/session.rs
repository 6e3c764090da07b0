//! Per-file annotation loop: fetch, annotate, write, show.

use crate::annotate::{Annotator, RenderMode};
use crate::model::ChangeRecord;
use gr_vcs::{ContentProvider, DiffViewer, FetchError, LaunchError, confined};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const ANNOTATED_SUFFIX: &str = ".annotated";

#[derive(Debug, Error)]
pub enum SkipReason {
    #[error("not found at the requested revision")]
    NotFound,
    #[error("retrieval failed: {0}")]
    Retrieval(String),
    #[error("could not write annotated copy: {0}")]
    Write(String),
    #[error("no working copy to compare against")]
    NoCounterpart,
    #[error("diff viewer failed: {0}")]
    Launch(#[from] LaunchError),
}

impl From<FetchError> for SkipReason {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::NotFound { .. } => SkipReason::NotFound,
            FetchError::Retrieval { reason, .. } => SkipReason::Retrieval(reason),
        }
    }
}

#[derive(Debug)]
pub struct SkippedFile {
    pub path: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedFile {
    pub path: String,
    pub annotated: PathBuf,
    pub annotations: usize,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub processed: Vec<ProcessedFile>,
    pub skipped: Vec<SkippedFile>,
}

impl RunReport {
    pub fn viewer_launched(&self) -> bool {
        !self.processed.is_empty()
    }

    fn skip(&mut self, path: &str, reason: SkipReason) {
        warn!(path, %reason, "skipping file");
        self.skipped.push(SkippedFile {
            path: path.to_string(),
            reason,
        });
    }
}

/// Settings for one pass over a change's commented files.
#[derive(Debug, Clone)]
pub struct AnnotationRun {
    pub annotator: Annotator,
    pub render: RenderMode,
    pub patch_set: Option<String>,
    pub file_filter: Option<String>,
    /// Revision handed to the provider as a hint.
    pub revision: Option<String>,
    /// Directory receiving `<path>.annotated` files.
    pub scratch: PathBuf,
    /// Root of the working tree shown on the right-hand side.
    pub working_root: PathBuf,
}

impl AnnotationRun {
    pub fn new(scratch: impl Into<PathBuf>, working_root: impl Into<PathBuf>) -> Self {
        Self {
            annotator: Annotator::default(),
            render: RenderMode::default(),
            patch_set: None,
            file_filter: None,
            revision: None,
            scratch: scratch.into(),
            working_root: working_root.into(),
        }
    }

    /// Visits files in comment-mapping order. Per-file failures become skips
    /// and never stop the run.
    pub fn execute(
        &self,
        change: &ChangeRecord,
        provider: &dyn ContentProvider,
        viewer: &dyn DiffViewer,
    ) -> RunReport {
        let mut report = RunReport::default();
        let filter = self.patch_set.as_deref();
        debug!(mode = %provider.mode(), files = change.comments.len(), "starting annotation run");

        for (path, comments) in change.files(self.file_filter.as_deref()) {
            if !comments.iter().any(|c| c.matches_patch_set(filter)) {
                debug!(path, "no comments survive the patch-set filter");
                continue;
            }

            let text = match provider.fetch(path, self.revision.as_deref()) {
                Ok(text) => text,
                Err(err) => {
                    report.skip(path, err.into());
                    continue;
                }
            };

            let document = self.annotator.annotate(&text, comments, filter);
            let annotated = self.scratch_path(path);
            if let Err(err) = write_annotated(&annotated, &document.render(&self.render)) {
                report.skip(path, SkipReason::Write(err.to_string()));
                continue;
            }

            let Some(current) = confined(&self.working_root, path).filter(|p| p.is_file()) else {
                report.skip(path, SkipReason::NoCounterpart);
                continue;
            };
            if let Err(err) = viewer.show(&annotated, &current) {
                report.skip(path, err.into());
                continue;
            }

            info!(path, annotations = document.annotation_count(), "opened diff");
            report.processed.push(ProcessedFile {
                path: path.to_string(),
                annotated,
                annotations: document.annotation_count(),
            });
        }
        report
    }

    /// `scratch/<path>.annotated`, confined to the scratch directory.
    pub fn scratch_path(&self, path: &str) -> PathBuf {
        let relative: PathBuf = Path::new(path)
            .components()
            .filter_map(|component| match component {
                Component::Normal(part) => Some(part),
                _ => None,
            })
            .collect();
        let mut file_name = relative.into_os_string();
        file_name.push(ANNOTATED_SUFFIX);
        self.scratch.join(file_name)
    }
}

fn write_annotated(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)
}
