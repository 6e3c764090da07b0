use crate::cleanup::{self, TempRegistry};
use crate::cli::DiffArgs;
use crate::config::Settings;
use crate::error::CliError;
use crate::prompt;
use crate::source::load_change;
use crate::ui;
use gr_core::{
    AnnotationRun, Annotator, ChangeError, ChangeRecord, PatchSetSelection, RunReport,
    revision_for, select_patch_set,
};
use gr_vcs::snapshot::copy_tree;
use gr_vcs::{
    ClonedSnapshot, ContentProvider, ExternalDiffTool, GitCli, RetrievalMode, VersionControlShow,
    WorkingCopy,
};
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

pub const SCRATCH_PREFIX: &str = "gr-diff-";
pub const SNAPSHOT_PREFIX: &str = "gr-clone-";
pub const PRESERVE_PREFIX: &str = "gr-preserved-";

/// The patch set a run is pinned to, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub mode: RetrievalMode,
    pub filter: Option<String>,
    pub revision: Option<String>,
}

pub fn run(
    args: &DiffArgs,
    mut settings: Settings,
    git: &GitCli,
    cwd: &Path,
) -> Result<(), CliError> {
    apply_flags(args, &mut settings);
    let viewer = ExternalDiffTool::parse(&settings.diff_tool)?;
    let change = load_change(
        &args.source.source(),
        args.source.policy(),
        args.source.save_change.as_deref(),
        &settings.ssh,
        git,
    )?;
    if change.comment_count() == 0 {
        ui::note("no inline comments to show");
        return Ok(());
    }

    let interactive = prompt::is_interactive();
    let target = resolve_target(&change, settings.mode, args.filter.patchset.as_deref(), || {
        if !interactive {
            return Err(ChangeError::SelectionRequired.into());
        }
        let available = &change.patch_sets;
        let chosen = prompt::choose_patch_set(available, &mut io::stdin().lock(), &mut io::stderr())?;
        Ok(chosen.number)
    })?;
    info!(mode = %target.mode, patch_set = ?target.filter, revision = ?target.revision, "diff target");

    let registry = TempRegistry::default();
    let _signals = cleanup::install(registry.clone())
        .map_err(|err| CliError::io("failed to install signal handlers", err))?;

    let scratch = tempfile::Builder::new()
        .prefix(SCRATCH_PREFIX)
        .tempdir()
        .map_err(|err| CliError::io("failed to create scratch directory", err))?;
    debug!(scratch = %scratch.path().display(), "scratch directory");
    registry.track(scratch.path());
    if args.no_cleanup {
        registry.preserve_on_abort(scratch.path(), cwd);
    }

    let repo_root = git.repo().to_path_buf();
    // Held until the end of the run; dropping it removes the snapshot.
    let (provider, snapshot_dir) = open_provider(&target, git, &repo_root, &registry)?;

    let run = AnnotationRun {
        annotator: Annotator::new(settings.fields.clone(), settings.order),
        render: settings.render_mode(),
        patch_set: target.filter.clone(),
        file_filter: args.filter.file.clone(),
        revision: target.revision.clone(),
        scratch: scratch.path().to_path_buf(),
        working_root: repo_root,
    };
    let report = run.execute(&change, provider.as_ref(), &viewer);
    print_report(&report);

    if args.no_cleanup {
        let preserved = preserve(scratch.path(), cwd)?;
        registry.preserved();
        ui::note(format_args!(
            "annotated files preserved in {}",
            preserved.display()
        ));
    }
    if report.viewer_launched() && interactive && !args.no_wait {
        prompt::wait_for_enter(&mut io::stdin().lock(), &mut io::stderr())
            .map_err(|err| CliError::io("prompt failed", err))?;
    }

    if let Some(dir) = snapshot_dir {
        close(dir);
    }
    close(scratch);
    Ok(())
}

/// Provider for `target`. A cloned snapshot also hands back the directory
/// holding it.
fn open_provider(
    target: &Target,
    git: &GitCli,
    repo_root: &Path,
    registry: &TempRegistry,
) -> Result<(Box<dyn ContentProvider>, Option<TempDir>), CliError> {
    match (target.mode, target.revision.as_deref()) {
        (RetrievalMode::ClonedSnapshot, Some(revision)) => {
            let dir = tempfile::Builder::new()
                .prefix(SNAPSHOT_PREFIX)
                .tempdir()
                .map_err(|err| CliError::io("failed to create snapshot directory", err))?;
            registry.track(dir.path());
            ui::note(format_args!("checking out {revision} in a snapshot copy"));
            let snapshot = ClonedSnapshot::prepare(git, repo_root, revision, dir.path())?;
            Ok((Box::new(snapshot), Some(dir)))
        }
        (RetrievalMode::VersionControlShow, Some(revision)) => Ok((
            Box::new(VersionControlShow::new(
                git.clone(),
                Some(revision.to_string()),
            )),
            None,
        )),
        _ => Ok((Box::new(WorkingCopy::new(repo_root)), None)),
    }
}

fn apply_flags(args: &DiffArgs, settings: &mut Settings) {
    if let Some(mode) = args.mode {
        settings.mode = mode.into();
    }
    if let Some(order) = args.order {
        settings.order = order.into();
    }
    if let Some(style) = args.style {
        settings.style = style;
    }
    if let Some(marker) = &args.marker {
        settings.marker.clone_from(marker);
    }
    if let Some(separator) = &args.separator {
        settings.separator.clone_from(separator);
    }
    if let Some(fields) = &args.fields {
        settings.set_fields(fields);
    }
    if let Some(tool) = &args.diff_tool {
        settings.diff_tool.clone_from(tool);
    }
}

/// Pins the run to a patch set and revision.
///
/// Working-copy runs only filter. The other modes need a concrete revision:
/// a missing one makes version-control-show fall back to the working copy
/// and is fatal for a cloned snapshot. `choose` is asked only when several
/// patch sets exist and none was requested.
pub fn resolve_target(
    change: &ChangeRecord,
    mode: RetrievalMode,
    requested: Option<&str>,
    choose: impl FnOnce() -> Result<u32, CliError>,
) -> Result<Target, CliError> {
    if !mode.needs_revision() {
        return Ok(Target {
            mode,
            filter: requested.map(str::to_string),
            revision: None,
        });
    }

    let chosen = match select_patch_set(change, requested) {
        Ok(PatchSetSelection::Selected(ps)) => Some(ps),
        Ok(PatchSetSelection::SelectionRequired(_)) => {
            let number = choose()?;
            let ps = change.patch_set(&number.to_string()).ok_or_else(|| {
                ChangeError::UnknownPatchSet {
                    requested: number.to_string(),
                }
            })?;
            Some(ps)
        }
        Err(ChangeError::NoPatchSets) => None,
        Err(err) => return Err(err.into()),
    };

    let filter = chosen.map(|ps| ps.number.to_string());
    match revision_for(change, filter.as_deref())? {
        Some(revision) => Ok(Target {
            mode,
            filter,
            revision: Some(revision.to_string()),
        }),
        None if mode == RetrievalMode::ClonedSnapshot => Err(match chosen {
            Some(ps) => ChangeError::RevisionUnavailable { number: ps.number },
            None => ChangeError::NoPatchSets,
        }
        .into()),
        None => {
            ui::warning("no revision available; using the working copy instead");
            Ok(Target {
                mode: RetrievalMode::WorkingCopy,
                filter,
                revision: None,
            })
        }
    }
}

fn print_report(report: &RunReport) {
    for skipped in &report.skipped {
        ui::warning(format_args!("skipped {}: {}", skipped.path, skipped.reason));
    }
    let summary = format!(
        "{} file(s) opened, {} skipped",
        report.processed.len(),
        report.skipped.len()
    );
    if report.skipped.is_empty() {
        ui::success(summary);
    } else {
        ui::note(summary);
    }
}

/// Copies the scratch tree to `<cwd>/gr-preserved-<timestamp>`.
pub fn preserve(scratch: &Path, cwd: &Path) -> Result<PathBuf, CliError> {
    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    let destination = cwd.join(format!("{PRESERVE_PREFIX}{stamp}"));
    copy_tree(scratch, &destination).map_err(|err| {
        CliError::io(
            format!("failed to preserve files in {}", destination.display()),
            err,
        )
    })?;
    Ok(destination)
}

fn close(dir: TempDir) {
    let path = dir.path().to_path_buf();
    if let Err(err) = dir.close() {
        ui::warning(format_args!(
            "failed to remove {}: {err}",
            path.display()
        ));
    }
}
