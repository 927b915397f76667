//! Per-project build serialization.
//!
//! Two layers guard a project: an async mutex per canonical project
//! directory for builds inside this process, and (on unix) an exclusive
//! `flock` on `<tmp>/agentuity-build-<hash>.lock` for builds started by other
//! processes. Both are released when the [`ProjectLock`] drops, and the
//! in-process entry is forgotten once no build holds or waits for it.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, LazyLock, Mutex},
    time::Duration,
};

use sha2::{Digest, Sha256};
use tokio::sync::OwnedMutexGuard;
use tokio_util::sync::CancellationToken;

use crate::bundler::{Error, Result, error::ErrorExt};

type ProjectMutex = Arc<tokio::sync::Mutex<()>>;

static IN_PROCESS: LazyLock<Mutex<HashMap<PathBuf, ProjectMutex>>> = LazyLock::new(Default::default);

/// Delay between attempts on a lock file held by another process.
pub const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Held for the duration of one build.
pub struct ProjectLock {
    path: PathBuf,
    // Fields drop in order: the file lock is released before the mutex.
    #[cfg(unix)]
    _file: nix::fcntl::Flock<std::fs::File>,
    _in_process: InProcessGuard,
}

impl std::fmt::Debug for ProjectLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectLock").field("path", &self.path).finish()
    }
}

/// Lock file path for a project directory.
pub fn lock_path(project_dir: &Path) -> PathBuf {
    let digest = hex::encode(Sha256::digest(project_dir.to_string_lossy().as_bytes()));
    std::env::temp_dir().join(format!("agentuity-build-{}.lock", &digest[..16]))
}

impl ProjectLock {
    /// Waits until no other build holds `project_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] when `cancel` fires while waiting, or an
    /// I/O error when the lock file cannot be opened or locked.
    pub async fn acquire(project_dir: &Path, cancel: &CancellationToken) -> Result<Self> {
        let canonical = canonical_dir(project_dir);
        let in_process = InProcessGuard::acquire(canonical.clone(), cancel).await?;

        let path = lock_path(&canonical);
        #[cfg(unix)]
        let file = lock_file(&path, cancel).await?;
        log::debug!("acquired build lock {} for {}", path.display(), canonical.display());

        Ok(Self {
            path,
            #[cfg(unix)]
            _file: file,
            _in_process: in_process,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Polls a non-blocking `flock` so a cancelled wait leaves no thread behind.
#[cfg(unix)]
async fn lock_file(path: &Path, cancel: &CancellationToken) -> Result<nix::fcntl::Flock<std::fs::File>> {
    use nix::{errno::Errno, fcntl::{Flock, FlockArg}};

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)
        .fs_context("opening build lock", path)?;
    loop {
        match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
            Ok(locked) => return Ok(locked),
            Err((returned, errno)) if errno == Errno::EWOULDBLOCK => {
                log::trace!("build lock {} is held by another process", path.display());
                file = returned;
                tokio::select! {
                    _ = cancel.cancelled() => return Err(Error::Cancelled),
                    _ = tokio::time::sleep(LOCK_POLL_INTERVAL) => {}
                }
            }
            Err((_, errno)) => {
                return Err(std::io::Error::from(errno)).fs_context("locking build lock", path);
            }
        }
    }
}

/// Membership in the in-process mutex of one project.
struct InProcessGuard {
    key: PathBuf,
    guard: Option<OwnedMutexGuard<()>>,
}

impl InProcessGuard {
    async fn acquire(key: PathBuf, cancel: &CancellationToken) -> Result<Self> {
        let mutex = {
            let mut locks = IN_PROCESS.lock().unwrap_or_else(|e| e.into_inner());
            locks.entry(key.clone()).or_default().clone()
        };

        let guard = tokio::select! {
            _ = cancel.cancelled() => None,
            guard = mutex.lock_owned() => Some(guard),
        };
        match guard {
            Some(guard) => Ok(Self {
                key,
                guard: Some(guard),
            }),
            None => {
                forget_if_unused(&key);
                Err(Error::Cancelled)
            }
        }
    }
}

impl Drop for InProcessGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        forget_if_unused(&self.key);
    }
}

/// Removes the mutex of `key` when the map holds its only reference.
fn forget_if_unused(key: &Path) {
    let mut locks = IN_PROCESS.lock().unwrap_or_else(|e| e.into_inner());
    if locks.get(key).is_some_and(|mutex| Arc::strong_count(mutex) == 1) {
        locks.remove(key);
    }
}

fn canonical_dir(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
