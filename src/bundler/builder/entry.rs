//! Entry point discovery for JavaScript projects.

use std::path::{Path, PathBuf};

use crate::bundler::Result;

const ROOT_ENTRIES: [&str; 2] = ["index.js", "index.ts"];
const AGENT_ENTRIES: [&str; 2] = ["index.ts", "index.js"];

/// Compiled `bundler.ignore` patterns, matched against project-relative paths.
#[derive(Debug, Default)]
pub struct IgnoreSet(Vec<glob::Pattern>);

impl IgnoreSet {
    /// # Errors
    ///
    /// Returns a generic error naming the first invalid pattern.
    pub fn new(patterns: &[String]) -> Result<Self> {
        patterns
            .iter()
            .map(|p| {
                glob::Pattern::new(p)
                    .map_err(|e| crate::bundler::Error::GenericError(format!("invalid ignore pattern {p:?}: {e}")))
            })
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }

    /// True when `rel` (forward-slash separated) or one of its parent
    /// directories matches a pattern.
    pub fn is_ignored(&self, rel: &str) -> bool {
        let options = glob::MatchOptions {
            require_literal_separator: true,
            ..Default::default()
        };
        let mut candidate = rel;
        loop {
            if self.0.iter().any(|p| p.matches_with(candidate, options)) {
                return true;
            }
            match candidate.rfind('/') {
                Some(i) => candidate = &candidate[..i],
                None => return false,
            }
        }
    }
}

fn relative(project_dir: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(project_dir).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Collects the bundle entry points of a project.
///
/// The root `index.js` or `index.ts` comes first (`index.js` wins when both
/// exist), followed by every `index.ts`/`index.js` under `agents_dir` in
/// path order. Dependency trees and ignored paths are skipped.
///
/// # Errors
///
/// Fails when the agents directory cannot be walked or no entry point exists.
pub fn discover(project_dir: &Path, agents_dir: &str, ignore: &IgnoreSet) -> Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    if let Some(root) = ROOT_ENTRIES
        .iter()
        .map(|name| project_dir.join(name))
        .find(|p| p.is_file())
    {
        entries.push(root);
    }

    let agents_root = project_dir.join(agents_dir);
    if agents_root.is_dir() {
        let walker = walkdir::WalkDir::new(&agents_root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.file_name() != "node_modules" && !ignore.is_ignored(&relative(project_dir, e.path())));
        for entry in walker {
            let entry = entry?;
            if entry.file_type().is_file()
                && AGENT_ENTRIES.iter().any(|name| entry.file_name() == *name)
            {
                entries.push(entry.into_path());
            }
        }
    } else {
        log::debug!("agents directory {} does not exist", agents_root.display());
    }

    if entries.is_empty() {
        crate::bail!("no index.ts files found in {}", agents_root.display());
    }
    log::debug!("found {} entry points", entries.len());
    Ok(entries)
}
