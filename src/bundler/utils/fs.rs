//! File system utilities for bundling.
//!
//! Output directories are regenerated on every build, so removal and
//! creation are both idempotent.

use crate::bundler::error::{ErrorExt, Result};
use std::{io, path::Path};
use tokio::fs;

/// Removes `path` if it exists and creates it again, empty.
pub async fn recreate_dir(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path).await {
        Ok(()) => log::trace!("removed {}", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e).fs_context("removing output directory", path),
    }
    fs::create_dir_all(path)
        .await
        .fs_context("creating output directory", path)
}

/// Writes `contents` to `path`, creating any parent directories as needed.
pub async fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .fs_context("creating parent directory", parent)?;
    }
    fs::write(path, contents).await.fs_context("writing file", path)
}

/// Total size in bytes of the regular files under `path`.
///
/// Symlinks are not followed. Runs on the blocking pool.
pub async fn dir_size(path: &Path) -> Result<u64> {
    let root = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let mut total = 0u64;
        for entry in walkdir::WalkDir::new(&root).follow_links(false) {
            let entry = entry?;
            if entry.file_type().is_file() {
                total += entry.metadata()?.len();
            }
        }
        Ok::<_, crate::bundler::error::Error>(total)
    })
    .await
    .map_err(|e| crate::bundler::error::Error::GenericError(format!("directory size task panicked: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recreate_clears_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join(".agentuity");
        std::fs::create_dir_all(out.join("stale")).unwrap();
        std::fs::write(out.join("stale/index.js"), "old").unwrap();

        recreate_dir(&out).await.unwrap();
        assert!(out.is_dir());
        assert_eq!(std::fs::read_dir(&out).unwrap().count(), 0);

        // Missing directories are created.
        let fresh = dir.path().join("fresh/out");
        recreate_dir(&fresh).await.unwrap();
        assert!(fresh.is_dir());
    }

    #[tokio::test]
    async fn sizes_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        write_file(&dir.path().join("a/b/c.txt"), [0u8; 10]).await.unwrap();
        write_file(&dir.path().join("d.txt"), [0u8; 5]).await.unwrap();
        assert_eq!(dir_size(dir.path()).await.unwrap(), 15);
    }
}
