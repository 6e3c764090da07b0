use crate::backend::GitError;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::debug;

/// Thin wrapper around the `git` executable, pinned to one repository.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: String,
    repo: PathBuf,
}

impl GitCli {
    pub fn new(repo: impl Into<PathBuf>) -> Self {
        Self::with_program("git", repo)
    }

    pub fn with_program(program: impl Into<String>, repo: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            repo: repo.into(),
        }
    }

    pub fn repo(&self) -> &Path {
        &self.repo
    }

    /// Same executable, different working tree.
    pub fn at(&self, repo: impl Into<PathBuf>) -> Self {
        Self {
            program: self.program.clone(),
            repo: repo.into(),
        }
    }

    /// Contents of `path` at `revision`, without touching the working tree.
    pub fn show(&self, revision: &str, path: &str) -> Result<Vec<u8>, GitError> {
        let object = format!("{}:{path}", checked(revision)?);
        let output = self.run(&["show", "--end-of-options", &object])?;
        Ok(output.stdout)
    }

    pub fn checkout(&self, revision: &str) -> Result<(), GitError> {
        let revision = checked(revision)?;
        self.run(&["checkout", "--force", "--quiet", "--end-of-options", revision])?;
        Ok(())
    }

    /// Full commit id behind `revision`.
    pub fn resolve_commit(&self, revision: &str) -> Result<String, GitError> {
        let commitish = format!("{}^{{commit}}", checked(revision)?);
        self.run_text(&["rev-parse", "--verify", "--quiet", &commitish])
    }

    pub fn commit_message(&self, revision: &str) -> Result<String, GitError> {
        let revision = checked(revision)?;
        self.run_text(&["log", "-1", "--pretty=%B", "--end-of-options", revision])
    }

    fn run_text(&self, args: &[&str]) -> Result<String, GitError> {
        let output = self.run(args)?;
        let text = String::from_utf8(output.stdout).map_err(|_| GitError::NonUtf8 {
            command: args.first().copied().unwrap_or_default().to_string(),
        })?;
        Ok(text.trim().to_string())
    }

    fn run(&self, args: &[&str]) -> Result<Output, GitError> {
        debug!(program = %self.program, repo = %self.repo.display(), ?args, "running git");
        let output = Command::new(&self.program)
            .args(args)
            .current_dir(&self.repo)
            .output()
            .map_err(|e| GitError::Launch {
                program: self.program.clone(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(GitError::CommandFailed {
                command: args.first().copied().unwrap_or_default().to_string(),
                stderr: if stderr.is_empty() {
                    format!("exit status {}", output.status)
                } else {
                    stderr
                },
            });
        }

        Ok(output)
    }
}

/// Revisions come from review dumps; never let one be read as an option.
fn checked(revision: &str) -> Result<&str, GitError> {
    if revision.is_empty() || revision.starts_with('-') {
        return Err(GitError::InvalidRevision {
            revision: revision.to_string(),
        });
    }
    Ok(revision)
}

/// Extracts the `Change-Id: I...` footer from a commit message.
pub fn change_id(message: &str) -> Option<&str> {
    message.lines().rev().find_map(|line| {
        let value = line.trim().strip_prefix("Change-Id:")?.trim();
        let valid = value.len() > 1
            && value.starts_with('I')
            && value[1..].chars().all(|c| c.is_ascii_hexdigit());
        valid.then_some(value)
    })
}
