use crate::backend::{ContentProvider, FetchError, RetrievalMode, SnapshotError};
use crate::git::GitCli;
use crate::provider::read_under;
use std::path::{Path, PathBuf};
use tracing::info;

/// A copy of the working tree checked out at one revision.
///
/// The checkout happens once in [`ClonedSnapshot::prepare`]; every fetch
/// afterwards only reads.
#[derive(Debug)]
pub struct ClonedSnapshot {
    root: PathBuf,
}

impl ClonedSnapshot {
    /// Copies `source_root` into `scratch/clone` and checks out `revision` there.
    pub fn prepare(
        git: &GitCli,
        source_root: &Path,
        revision: &str,
        scratch: &Path,
    ) -> Result<Self, SnapshotError> {
        let root = scratch.join("clone");
        info!(
            source = %source_root.display(),
            clone = %root.display(),
            %revision,
            "preparing snapshot"
        );
        copy_tree(source_root, &root).map_err(|err| SnapshotError::Copy {
            source_root: source_root.to_path_buf(),
            reason: err.to_string(),
        })?;
        git.at(&root)
            .checkout(revision)
            .map_err(|source| SnapshotError::Checkout {
                revision: revision.to_string(),
                source,
            })?;
        Ok(Self { root })
    }
}

impl ContentProvider for ClonedSnapshot {
    fn mode(&self) -> RetrievalMode {
        RetrievalMode::ClonedSnapshot
    }

    fn fetch(&self, path: &str, _revision: Option<&str>) -> Result<String, FetchError> {
        read_under(&self.root, path)
    }
}

/// Recursively copies `from` into `to`, keeping symlinks as symlinks.
pub fn copy_tree(from: &Path, to: &Path) -> std::io::Result<()> {
    copy_tree_inner(from, to, to)
}

fn copy_tree_inner(from: &Path, to: &Path, destination: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(to)?;
    for entry in std::fs::read_dir(from)? {
        let entry = entry?;
        let source = entry.path();
        // The destination may live inside the source tree.
        if source == destination {
            continue;
        }
        let target = to.join(entry.file_name());
        let file_type = entry.file_type()?;
        if file_type.is_symlink() {
            copy_symlink(&source, &target)?;
        } else if file_type.is_dir() {
            copy_tree_inner(&source, &target, destination)?;
        } else {
            std::fs::copy(&source, &target)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(source: &Path, target: &Path) -> std::io::Result<()> {
    let link = std::fs::read_link(source)?;
    std::os::unix::fs::symlink(link, target)
}

#[cfg(not(unix))]
fn copy_symlink(source: &Path, target: &Path) -> std::io::Result<()> {
    if source.is_dir() {
        copy_tree(source, target)
    } else {
        std::fs::copy(source, target).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::testutil::GitTestRepo;

    #[test]
    fn test_prepare_checks_out_revision() {
        let repo = GitTestRepo::new().unwrap();
        repo.write_file("src/a.txt", "v1\n").unwrap();
        let first = repo.commit("first").unwrap();
        repo.write_file("src/a.txt", "v2\n").unwrap();
        repo.commit("second").unwrap();
        let scratch = tempfile::tempdir().unwrap();

        let git = GitCli::new(repo.path());
        let snapshot = ClonedSnapshot::prepare(&git, repo.path(), &first, scratch.path()).unwrap();

        assert_eq!(snapshot.fetch("src/a.txt", None).unwrap(), "v1\n");
        // The source tree is untouched.
        assert_eq!(
            std::fs::read_to_string(repo.path().join("src/a.txt")).unwrap(),
            "v2\n"
        );
    }

    #[test]
    fn test_failed_checkout_is_setup_failure() {
        let source = tempfile::tempdir().unwrap();
        std::fs::write(source.path().join("a.txt"), "a").unwrap();
        let scratch = tempfile::tempdir().unwrap();

        let git = GitCli::with_program("false", source.path());
        let err = ClonedSnapshot::prepare(&git, source.path(), "deadbeef", scratch.path())
            .unwrap_err();
        assert!(matches!(err, SnapshotError::Checkout { ref revision, .. } if revision == "deadbeef"));
    }

    #[test]
    fn test_missing_file_in_snapshot() {
        let repo = GitTestRepo::new().unwrap();
        repo.write_file("a.txt", "a\n").unwrap();
        let head = repo.commit("first").unwrap();
        let scratch = tempfile::tempdir().unwrap();

        let snapshot =
            ClonedSnapshot::prepare(&GitCli::new(repo.path()), repo.path(), &head, scratch.path())
                .unwrap();
        let err = snapshot.fetch("b.txt", None).unwrap_err();
        assert!(matches!(err, FetchError::NotFound { .. }));
    }

    #[test]
    fn test_copy_tree_nested() {
        let from = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(from.path().join("x/y")).unwrap();
        std::fs::write(from.path().join("x/y/z.txt"), "z").unwrap();
        std::fs::write(from.path().join("top.txt"), "t").unwrap();
        let to = tempfile::tempdir().unwrap();
        let dest = to.path().join("copy");

        copy_tree(from.path(), &dest).unwrap();
        assert_eq!(std::fs::read_to_string(dest.join("x/y/z.txt")).unwrap(), "z");
        assert_eq!(std::fs::read_to_string(dest.join("top.txt")).unwrap(), "t");
    }
}
