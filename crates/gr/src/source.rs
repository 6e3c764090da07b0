//! Where the change dump comes from: a file, stdin, or a gerrit ssh query.

use crate::config::SshSettings;
use crate::error::{CliError, SourceError};
use crate::ui;
use gr_core::resolve::Object;
use gr_core::{ChangeRecord, SelectionPolicy, select_change};
use gr_vcs::GitCli;
use gr_vcs::git::change_id;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// What a `--commit` lookup asks gerrit for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum CommitQuery {
    /// `change:<Change-Id footer>`
    #[default]
    ChangeId,
    /// `commit:<full sha>`
    Commit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DumpSource {
    File(PathBuf),
    Stdin,
    /// Arbitrary gerrit query, e.g. `change:12345`.
    Query(String),
    /// Query by a local commit, through its Change-Id footer or its sha.
    Commit { revision: String, query: CommitQuery },
}

impl DumpSource {
    pub fn from_path(path: PathBuf) -> Self {
        if path.as_os_str() == "-" {
            DumpSource::Stdin
        } else {
            DumpSource::File(path)
        }
    }

    pub fn read(&self, ssh: &SshSettings, git: &GitCli) -> Result<String, SourceError> {
        match self {
            DumpSource::File(path) => {
                std::fs::read_to_string(path).map_err(|err| SourceError::Read {
                    path: path.display().to_string(),
                    reason: err.to_string(),
                })
            }
            DumpSource::Stdin => {
                let mut text = String::new();
                std::io::stdin()
                    .read_to_string(&mut text)
                    .map_err(|err| SourceError::Read {
                        path: "<stdin>".to_string(),
                        reason: err.to_string(),
                    })?;
                Ok(text)
            }
            DumpSource::Query(query) => run_query(&query_command(ssh, query)?),
            DumpSource::Commit { revision, query } => {
                run_query(&query_command(ssh, &commit_query(git, revision, *query)?)?)
            }
        }
    }
}

/// Gerrit query naming the change behind a local commit.
pub fn commit_query(
    git: &GitCli,
    revision: &str,
    query: CommitQuery,
) -> Result<String, SourceError> {
    match query {
        CommitQuery::ChangeId => {
            let message = git.commit_message(revision)?;
            let id = change_id(&message).ok_or_else(|| SourceError::NoChangeId {
                revision: revision.to_string(),
            })?;
            info!(%revision, change_id = id, "querying change by Change-Id");
            Ok(format!("change:{id}"))
        }
        CommitQuery::Commit => {
            let sha = git.resolve_commit(revision)?;
            info!(%revision, %sha, "querying change by commit");
            Ok(format!("commit:{sha}"))
        }
    }
}

/// `ssh -p PORT [USER@]HOST gerrit query --patch-sets --comments --format=JSON QUERY`
pub fn query_command(ssh: &SshSettings, query: &str) -> Result<Vec<String>, SourceError> {
    let destination = ssh.destination().ok_or(SourceError::MissingHost)?;
    Ok(vec![
        "ssh".to_string(),
        "-p".to_string(),
        ssh.port.to_string(),
        destination,
        "gerrit".to_string(),
        "query".to_string(),
        "--patch-sets".to_string(),
        "--comments".to_string(),
        "--format=JSON".to_string(),
        query.to_string(),
    ])
}

fn run_query(argv: &[String]) -> Result<String, SourceError> {
    let (program, args) = argv.split_first().ok_or_else(|| SourceError::Query {
        reason: "empty command".to_string(),
    })?;
    debug!(?argv, "running gerrit query");
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|err| SourceError::Query {
            reason: format!("failed to run {program}: {err}"),
        })?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(SourceError::Query {
            reason: if stderr.is_empty() {
                output.status.to_string()
            } else {
                stderr
            },
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Reads, selects and normalizes one change, saving the raw record on request.
pub fn load_change(
    source: &DumpSource,
    policy: SelectionPolicy,
    save_to: Option<&Path>,
    ssh: &SshSettings,
    git: &GitCli,
) -> Result<ChangeRecord, CliError> {
    let text = source.read(ssh, git)?;
    let selected = select_change(&text, policy)?;
    if selected.is_ambiguous() {
        ui::warning(format_args!(
            "{} changes in dump; using the first",
            selected.candidates
        ));
    }
    if let Some(path) = save_to {
        save_change(path, &selected.record)?;
        ui::note(format_args!("saved change to {}", path.display()));
    }
    let change = ChangeRecord::from_json(&selected.record);
    if change.dropped_comments > 0 {
        ui::warning(format_args!(
            "ignored {} comment(s) without a file or line",
            change.dropped_comments
        ));
    }
    debug!(
        number = ?change.number,
        patch_sets = change.patch_sets.len(),
        comments = change.comment_count(),
        "loaded change"
    );
    Ok(change)
}

/// Writes the selected raw change as pretty JSON.
pub fn save_change(path: &Path, record: &Object) -> Result<(), SourceError> {
    let save_err = |reason: String| SourceError::Save {
        path: path.to_path_buf(),
        reason,
    };
    let mut text = serde_json::to_string_pretty(record).map_err(|err| save_err(err.to_string()))?;
    text.push('\n');
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|err| save_err(err.to_string()))?;
    }
    std::fs::write(path, text).map_err(|err| save_err(err.to_string()))
}
