//! Main bundler orchestration and coordination.
//!
//! This module provides the [`Bundler`] orchestrator that sequences one
//! project build: configuration, locking, output preparation and the
//! language-specific routine.

use std::{path::PathBuf, time::Instant};

use crate::{
    bundler::{
        BundleContext, Error, Language, Result, Runtime,
        host::ModuleBundler,
        registry::Registry,
        utils::fs,
    },
    metadata::ProjectConfig,
};

use super::{checksum::output_digest, javascript, lock::ProjectLock, python};

/// Result of a successful build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundledArtifact {
    pub language: Language,
    pub runtime: Runtime,
    pub output_dir: PathBuf,
    /// Bundled entry points. Empty for Python projects.
    pub entry_points: Vec<PathBuf>,
    /// Total size of the output directory in bytes.
    pub size: u64,
    /// SHA-256 over the output directory tree.
    pub checksum: String,
}

/// Main bundler orchestrator.
///
/// Holds the process-wide [`Registry`] and the module bundler used for
/// JavaScript projects. One value can serve any number of builds; builds of
/// the same project are serialized by a per-project lock.
///
/// # Examples
///
/// ```no_run
/// use agentuity_bundler::bundler::{BundleContextBuilder, Bundler, EsbuildHost, Registry};
///
/// # async fn example() -> agentuity_bundler::bundler::Result<()> {
/// let registry = Registry::builtin()?;
/// let bundler = Bundler::new(&registry, EsbuildHost::default());
/// let ctx = BundleContextBuilder::new().project_dir(".").production(true).build()?;
/// let artifact = bundler.bundle(&ctx).await?;
/// println!("{} bytes, sha256 {}", artifact.size, artifact.checksum);
/// # Ok(())
/// # }
/// ```
pub struct Bundler<'r, B> {
    registry: &'r Registry,
    bundler: B,
}

impl<B> std::fmt::Debug for Bundler<'_, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bundler")
            .field("patches", &self.registry.patches().count())
            .field("breaking_changes", &self.registry.breaking_changes().len())
            .finish_non_exhaustive()
    }
}

impl<'r, B: ModuleBundler> Bundler<'r, B> {
    pub fn new(registry: &'r Registry, bundler: B) -> Self {
        Self { registry, bundler }
    }

    /// Builds the project described by `ctx`.
    ///
    /// The language and runtime are validated before anything on disk is
    /// touched. The output directory is then cleared and recreated.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidProject`] when `agentuity.yaml` is missing or incomplete.
    /// * [`Error::UnsupportedLanguage`] / [`Error::UnsupportedRuntime`].
    /// * [`Error::BuildFailed`] once the build errors have been printed.
    /// * Any install, version gate or I/O failure of the language routine.
    pub async fn bundle(&self, ctx: &BundleContext) -> Result<BundledArtifact> {
        let started = Instant::now();
        let config = ProjectConfig::load(ctx.project_dir())?;
        let language = config.language()?;
        let runtime: Runtime = config.runtime_name().parse()?;
        if runtime.language() != language {
            return Err(Error::UnsupportedRuntime(format!(
                "{runtime} cannot build a {language} project"
            )));
        }

        let _lock = ProjectLock::acquire(ctx.project_dir(), ctx.cancellation()).await?;

        log::debug!(
            "bundling project {} to {}",
            ctx.project_dir().display(),
            ctx.output_dir().display()
        );
        fs::recreate_dir(ctx.output_dir()).await?;

        let entry_points = match language {
            Language::JavaScript => {
                javascript::bundle(ctx, &config, self.registry, &self.bundler, runtime).await?
            }
            Language::Python => {
                python::bundle(ctx, &config, self.registry, runtime).await?;
                Vec::new()
            }
        };

        let artifact = BundledArtifact {
            language,
            runtime,
            output_dir: ctx.output_dir().to_path_buf(),
            entry_points,
            size: fs::dir_size(ctx.output_dir()).await?,
            checksum: output_digest(ctx.output_dir()).await?,
        };
        log::debug!(
            "bundled {} ({} bytes) in {:?}",
            artifact.output_dir.display(),
            artifact.size,
            started.elapsed()
        );
        Ok(artifact)
    }

    pub fn registry(&self) -> &Registry {
        self.registry
    }

    pub fn module_bundler(&self) -> &B {
        &self.bundler
    }
}
