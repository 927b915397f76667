//! Load hook that hands matched dependency files to the injection engine.

use std::path::{Path, PathBuf};

use super::{FILE_NAMESPACE, LoadArgs, LoadResult, Loader, Plugin, PluginBuild};
use crate::bundler::{Result, error::ErrorExt, patch, registry::Registry};

/// Prepended to a Bun project's root `index.ts` so stack traces map back to sources.
pub const SOURCE_MAP_SHIM: &str = "import { SourceMapConsumer } from 'source-map-js';\n\
globalThis.__agentuity_SourceMapConsumer = SourceMapConsumer;";

pub struct InjectPlugin<'r> {
    registry: &'r Registry,
    project_dir: PathBuf,
    shim_source_map: bool,
}

impl<'r> InjectPlugin<'r> {
    pub fn new(registry: &'r Registry, project_dir: impl Into<PathBuf>) -> Self {
        Self {
            registry,
            project_dir: project_dir.into(),
            shim_source_map: false,
        }
    }

    /// Enables the source-map import on the project's root `index.ts`.
    pub fn shim_source_map(mut self, enabled: bool) -> Self {
        self.shim_source_map = enabled;
        self
    }

    /// Union of every registered patch filter, or `None` for an empty catalog.
    pub fn patch_filter(&self) -> Option<String> {
        let parts: Vec<String> = self
            .registry
            .patches()
            .map(|p| format!("(?:{})", p.filter().as_str()))
            .collect();
        (!parts.is_empty()).then(|| parts.join("|"))
    }

    fn root_index_filter(&self) -> String {
        let index = self.project_dir.join("index.ts");
        let index = index.to_string_lossy().replace('\\', "/");
        format!("^{}$", regex::escape(&index))
    }

    fn load_patched(&self, args: &LoadArgs) -> Result<Option<LoadResult>> {
        let path = Path::new(&args.path);
        if !patch::is_script(path) {
            return Ok(None);
        }
        let contents = match std::fs::read_to_string(path) {
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                log::debug!("{} is not UTF-8, passing through", args.path);
                return Ok(None);
            }
            read => read.fs_context("reading dependency source", path)?,
        };
        Ok(patch::transform(self.registry, path, &contents).map(|patched| {
            if !patched.report.applied.is_empty() {
                log::debug!("patched {}: {}", args.path, patched.report.applied.join(", "));
            }
            LoadResult::new(patched.contents, patched.loader)
        }))
    }

    fn load_root_index(&self, args: &LoadArgs) -> Result<Option<LoadResult>> {
        log::debug!("adding source map import to {}", args.path);
        let path = Path::new(&args.path);
        let contents = std::fs::read_to_string(path).fs_context("reading project entry point", path)?;
        Ok(Some(LoadResult::new(format!("{SOURCE_MAP_SHIM}\n{contents}"), Loader::Ts)))
    }
}

impl Plugin for InjectPlugin<'_> {
    fn name(&self) -> &str {
        "inject-agentuity"
    }

    fn setup<'a>(&'a self, build: &mut PluginBuild<'a>) -> Result<()> {
        if self.shim_source_map {
            build.on_load(&self.root_index_filter(), Some(FILE_NAMESPACE), move |args| {
                self.load_root_index(args)
            })?;
        }
        if let Some(filter) = self.patch_filter() {
            build.on_load(&filter, Some(FILE_NAMESPACE), move |args| self.load_patched(args))?;
        }
        Ok(())
    }
}
