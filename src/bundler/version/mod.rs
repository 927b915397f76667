//! SDK version gate.
//!
//! Before a build is bundled, the installed SDK version is compared with a
//! compiled-in list of [`BreakingChange`] records. The first record that
//! applies either blocks the build or, when it carries a migration and the
//! user agrees, rewrites project files and stops so the build is re-run.

pub mod catalog;
mod gate;
pub mod sdk;

use std::{fmt, sync::Arc};

pub use gate::check;

use crate::bundler::{BundleContext, Result, Runtime};

/// In-place project migration run when the user accepts it.
pub type Migration = Arc<dyn Fn(&BundleContext) -> Result<()> + Send + Sync>;

/// A known incompatible SDK version range for one runtime.
#[derive(Clone)]
pub struct BreakingChange {
    pub runtime: Runtime,
    /// Semver requirement the installed SDK must satisfy for the record to apply.
    pub constraint: String,
    pub title: String,
    pub message: String,
    pub migration: Option<Migration>,
}

impl fmt::Debug for BreakingChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BreakingChange")
            .field("runtime", &self.runtime)
            .field("constraint", &self.constraint)
            .field("title", &self.title)
            .field("migration", &self.migration.is_some())
            .finish()
    }
}

impl BreakingChange {
    pub fn new(
        runtime: Runtime,
        constraint: impl Into<String>,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            runtime,
            constraint: constraint.into(),
            title: title.into(),
            message: message.into(),
            migration: None,
        }
    }

    pub fn with_migration<F>(mut self, migration: F) -> Self
    where
        F: Fn(&BundleContext) -> Result<()> + Send + Sync + 'static,
    {
        self.migration = Some(Arc::new(migration));
        self
    }

    /// Parsed constraint. Surrounding whitespace is ignored.
    pub fn requirement(&self) -> std::result::Result<semver::VersionReq, semver::Error> {
        semver::VersionReq::parse(self.constraint.trim())
    }

    /// True when this record applies to `runtime` at `version`.
    ///
    /// Pre-release and build identifiers are ignored, so `0.0.80-beta` is
    /// held to the same constraint as `0.0.80`.
    pub fn matches(&self, runtime: Runtime, version: &semver::Version) -> bool {
        let release = semver::Version::new(version.major, version.minor, version.patch);
        self.runtime == runtime && self.requirement().is_ok_and(|req| req.matches(&release))
    }
}

/// Pre-release builds of the SDK (`0.0.120-pre.3`) are never gated.
pub fn is_prerelease(version: &semver::Version) -> bool {
    !version.pre.is_empty() && version.pre.as_str().contains("pre")
}
