//! Per-build context.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use tokio_util::sync::CancellationToken;

use super::Prompter;
use crate::cli::OutputManager;

/// Name of the output directory created inside the project.
pub const OUTPUT_DIR_NAME: &str = ".agentuity";

/// Configuration for a single bundle invocation.
///
/// Created at the start of a build through [`BundleContextBuilder`] and
/// dropped when the build returns. A context is never shared between two
/// concurrent builds.
///
/// [`BundleContextBuilder`]: super::BundleContextBuilder
#[derive(Clone)]
pub struct BundleContext {
    pub(super) project_dir: PathBuf,
    pub(super) output_dir: PathBuf,
    pub(super) production: bool,
    pub(super) install: bool,
    pub(super) ci: bool,
    pub(super) dev_mode: bool,
    pub(super) interactive: bool,
    pub(super) cancel: CancellationToken,
    pub(super) output: OutputManager,
    pub(super) prompter: Arc<dyn Prompter>,
}

impl std::fmt::Debug for BundleContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BundleContext")
            .field("project_dir", &self.project_dir)
            .field("output_dir", &self.output_dir)
            .field("production", &self.production)
            .field("install", &self.install)
            .field("ci", &self.ci)
            .field("dev_mode", &self.dev_mode)
            .field("interactive", &self.interactive)
            .finish_non_exhaustive()
    }
}

impl BundleContext {
    /// Project root containing `agentuity.yaml`.
    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// Directory the bundle and source maps are written to.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Release build: production defines, no typecheck.
    pub fn production(&self) -> bool {
        self.production
    }

    /// Force a dependency install even when the dependency tree exists.
    pub fn install(&self) -> bool {
        self.install
    }

    /// Running under CI: install commands switch to verbose, frozen flags.
    pub fn ci(&self) -> bool {
        self.ci
    }

    /// Invoked from a dev-server loop: build failures are returned, not fatal.
    pub fn dev_mode(&self) -> bool {
        self.dev_mode
    }

    /// A user can answer prompts.
    pub fn interactive(&self) -> bool {
        self.interactive
    }

    /// Cancellation scope inherited by every subprocess of this build.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn output(&self) -> &OutputManager {
        &self.output
    }

    pub fn prompter(&self) -> &dyn Prompter {
        self.prompter.as_ref()
    }
}
