//! External tool detection.
//!
//! Global tools are looked up once per process; project-local tools come from
//! `node_modules/.bin` and are checked on every build.

use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};

/// Whether `bun` is on `PATH`. Required for the source-map support install.
pub static HAS_BUN: LazyLock<bool> = LazyLock::new(|| match which::which("bun") {
    Ok(path) => {
        log::debug!("found bun at: {}", path.display());
        true
    }
    Err(e) => {
        log::debug!("bun not found in PATH: {e}");
        false
    }
});

/// Executable installed by a dependency under `node_modules/.bin`.
pub fn local_bin(project_dir: &Path, name: &str) -> Option<PathBuf> {
    let bin = project_dir.join("node_modules").join(".bin");
    let candidates = if cfg!(windows) {
        vec![bin.join(format!("{name}.cmd")), bin.join(name)]
    } else {
        vec![bin.join(name)]
    };
    candidates.into_iter().find(|p| p.is_file())
}
