//! Output directory digest.
//!
//! A bundle is a directory of generated files, so its checksum covers every
//! file's relative path and contents in sorted order. Two builds of the same
//! sources produce the same digest.

use std::path::Path;

use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

use crate::bundler::{Result, error::ErrorExt};

/// Hex-encoded SHA-256 of the directory tree at `dir`.
///
/// Relative paths are hashed with `/` separators so the digest does not
/// depend on the host platform.
///
/// # Errors
///
/// Fails when the tree cannot be walked or a file cannot be read.
pub async fn output_digest(dir: &Path) -> Result<String> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(dir).follow_links(false) {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    files.sort();

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 8192];
    for path in files {
        let rel = path.strip_prefix(dir)?;
        let rel: Vec<_> = rel.components().map(|c| c.as_os_str().to_string_lossy()).collect();
        hasher.update(rel.join("/").as_bytes());
        hasher.update([0u8]);

        let mut file = tokio::fs::File::open(&path)
            .await
            .fs_context("opening file for hashing", &path)?;
        loop {
            let n = file
                .read(&mut buffer)
                .await
                .fs_context("reading file for hash calculation", &path)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn digest_tracks_paths_and_contents() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        for dir in [a.path(), b.path()] {
            std::fs::create_dir_all(dir.join("src")).unwrap();
            std::fs::write(dir.join("index.js"), "export {};").unwrap();
            std::fs::write(dir.join("src/agent.js"), "1").unwrap();
        }
        let first = output_digest(a.path()).await.unwrap();
        assert_eq!(first.len(), 64);
        assert_eq!(first, output_digest(b.path()).await.unwrap());

        std::fs::rename(b.path().join("src/agent.js"), b.path().join("src/other.js")).unwrap();
        assert_ne!(first, output_digest(b.path()).await.unwrap());
    }
}
