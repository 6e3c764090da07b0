use std::path::{Path, PathBuf};

/// Walks up from `start` to the nearest directory containing `.git`.
pub fn detect_repo_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(".git").exists())
        .map(Path::to_path_buf)
}
