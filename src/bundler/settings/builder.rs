//! Builder for constructing a [`BundleContext`].

use super::{BundleContext, OUTPUT_DIR_NAME, Prompter, TerminalPrompter};
use crate::cli::OutputManager;
use path_absolutize::Absolutize;
use std::{
    io::IsTerminal,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio_util::sync::CancellationToken;

/// Builder for constructing [`BundleContext`].
///
/// # Examples
///
/// ```no_run
/// use agentuity_bundler::bundler::BundleContextBuilder;
///
/// # fn example() -> agentuity_bundler::bundler::Result<()> {
/// let ctx = BundleContextBuilder::new()
///     .project_dir("./my-agent")
///     .production(true)
///     .ci(true)
///     .build()?;
/// assert!(ctx.output_dir().ends_with(".agentuity"));
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct BundleContextBuilder {
    project_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    production: bool,
    install: bool,
    ci: bool,
    dev_mode: bool,
    interactive: Option<bool>,
    cancel: Option<CancellationToken>,
    output: Option<OutputManager>,
    prompter: Option<Arc<dyn Prompter>>,
}

impl BundleContextBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets the project root.
    ///
    /// # Required
    ///
    /// This field is required for building.
    pub fn project_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.project_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Overrides the output directory.
    ///
    /// Default: `<project_dir>/.agentuity`
    pub fn output_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.output_dir = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn production(mut self, production: bool) -> Self {
        self.production = production;
        self
    }

    pub fn install(mut self, install: bool) -> Self {
        self.install = install;
        self
    }

    pub fn ci(mut self, ci: bool) -> Self {
        self.ci = ci;
        self
    }

    pub fn dev_mode(mut self, dev_mode: bool) -> Self {
        self.dev_mode = dev_mode;
        self
    }

    /// Forces the interactive flag.
    ///
    /// Default: stdin and stdout are terminals and the build is not in dev mode.
    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = Some(interactive);
        self
    }

    /// Sets the cancellation scope. Default: a fresh token that never fires.
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Sets the output sink. Default: colored stderr.
    pub fn output(mut self, output: OutputManager) -> Self {
        self.output = Some(output);
        self
    }

    /// Sets the prompter. Default: [`TerminalPrompter`].
    pub fn prompter(mut self, prompter: Arc<dyn Prompter>) -> Self {
        self.prompter = Some(prompter);
        self
    }

    /// Builds the context.
    ///
    /// # Errors
    ///
    /// Returns an error if `project_dir` is missing. A relative `project_dir`
    /// is resolved against the current directory.
    pub fn build(self) -> crate::bundler::Result<BundleContext> {
        use crate::bundler::error::Context;

        let project_dir = self.project_dir.context("project_dir is required")?;
        let project_dir = project_dir
            .absolutize()
            .map_err(crate::bundler::Error::IoError)?
            .into_owned();
        let output_dir = self
            .output_dir
            .unwrap_or_else(|| project_dir.join(OUTPUT_DIR_NAME));
        let interactive = self.interactive.unwrap_or_else(|| {
            !self.dev_mode && std::io::stdin().is_terminal() && std::io::stdout().is_terminal()
        });

        Ok(BundleContext {
            project_dir,
            output_dir,
            production: self.production,
            install: self.install,
            ci: self.ci,
            dev_mode: self.dev_mode,
            interactive,
            cancel: self.cancel.unwrap_or_default(),
            output: self.output.unwrap_or_else(|| OutputManager::new(false, false)),
            prompter: self.prompter.unwrap_or_else(|| Arc::new(TerminalPrompter)),
        })
    }
}
