//! Temporary directories that must go away even when the run is interrupted.

use crate::diff::preserve;
use crate::ui;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::{Handle, Signals};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use tracing::debug;

#[derive(Debug, Default)]
struct Pending {
    dirs: Vec<PathBuf>,
    /// `(scratch, cwd)`: copy the scratch tree out before removing it.
    preserve: Option<(PathBuf, PathBuf)>,
}

/// Directories owned by the current run, shared with the signal thread.
#[derive(Debug, Clone, Default)]
pub struct TempRegistry {
    pending: Arc<Mutex<Pending>>,
}

impl TempRegistry {
    pub fn track(&self, dir: &Path) {
        self.lock().dirs.push(dir.to_path_buf());
    }

    pub fn preserve_on_abort(&self, scratch: &Path, cwd: &Path) {
        self.lock().preserve = Some((scratch.to_path_buf(), cwd.to_path_buf()));
    }

    /// The scratch tree has been preserved already.
    pub fn preserved(&self) {
        self.lock().preserve = None;
    }

    /// Preserves on request, then removes every tracked directory.
    pub fn abort(&self) {
        let pending = std::mem::take(&mut *self.lock());
        if let Some((scratch, cwd)) = pending.preserve {
            match preserve(&scratch, &cwd) {
                Ok(path) => ui::note(format_args!(
                    "annotated files preserved in {}",
                    path.display()
                )),
                Err(err) => ui::warning(err),
            }
        }
        for dir in pending.dirs {
            debug!(dir = %dir.display(), "removing temporary directory");
            match std::fs::remove_dir_all(&dir) {
                Ok(()) => {}
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => ui::warning(format_args!("failed to remove {}: {err}", dir.display())),
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cleans up and exits on SIGINT or SIGTERM until dropped.
pub struct SignalGuard {
    handle: Handle,
    thread: Option<JoinHandle<()>>,
}

pub fn install(registry: TempRegistry) -> std::io::Result<SignalGuard> {
    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    let handle = signals.handle();
    let thread = std::thread::spawn(move || {
        if let Some(signal) = signals.forever().next() {
            eprintln!();
            debug!(signal, "interrupted; removing temporary files");
            registry.abort();
            std::process::exit(128 + signal);
        }
    });
    Ok(SignalGuard {
        handle,
        thread: Some(thread),
    })
}

impl Drop for SignalGuard {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
