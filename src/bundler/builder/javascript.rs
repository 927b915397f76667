//! JavaScript build routine.

use std::path::PathBuf;

use super::{
    defines::{self, BuildMetadata},
    disk,
    entry::{self, IgnoreSet},
    tool_detection::HAS_BUN,
    typecheck,
};
use crate::{
    bundler::{
        BundleContext, Error, Language, Result, Runtime, diagnostics,
        host::{BuildOptions, ModuleBundler},
        install::{self, runner},
        plugins::{Plugin, PluginHost, declarations, inject::InjectPlugin, loaders::AssetImporter},
        registry::Registry,
        version,
    },
    metadata::ProjectConfig,
};

const SOURCE_MAP_PACKAGE: &str = "source-map-js";

/// Installs, gates, type checks and bundles a JavaScript project.
///
/// Returns the entry points that were bundled.
///
/// # Errors
///
/// Any install, gate or bundler failure. Bundler-reported errors are printed
/// with source context and returned as [`Error::BuildFailed`].
pub async fn bundle<B: ModuleBundler>(
    ctx: &BundleContext,
    config: &ProjectConfig,
    registry: &Registry,
    bundler: &B,
    runtime: Runtime,
) -> Result<Vec<PathBuf>> {
    let project_dir = ctx.project_dir();

    if install::needs_install(project_dir, Language::JavaScript, ctx.install()) {
        let plan = install::plan(project_dir, config.runtime_name(), ctx.ci())?;
        ctx.output().progress(&format!("Installing dependencies with {}", plan.command))?;
        let output = install::run(&plan, ctx.cancellation()).await?;
        log::trace!("install output: {}", output.trim());
    }

    if runtime == Runtime::BunJs {
        install_source_map_support(ctx).await?;
    }

    version::check(ctx, registry, Language::JavaScript, runtime)?;

    if declarations::ensure_declarations(project_dir)? {
        ctx.output().verbose("Updated agentuity type declarations")?;
    }

    if !ctx.production() {
        typecheck::run(ctx).await?;
    }

    let ignore = IgnoreSet::new(config.ignore_patterns())?;
    let entry_points = entry::discover(project_dir, config.agents_dir(), &ignore)?;

    let meta = BuildMetadata::collect(ctx, config, runtime)?;
    let mut options = BuildOptions::new(project_dir, ctx.output_dir());
    options.entry_points = entry_points.clone();
    options.define = defines::defines(&meta)?;

    let mut plugins: Vec<Box<dyn Plugin + '_>> = AssetImporter::all();
    plugins.push(Box::new(
        InjectPlugin::new(registry, project_dir).shim_source_map(runtime == Runtime::BunJs),
    ));
    let host = PluginHost::new(&plugins)?;

    let output = bundler.build(&options, &host).await?;
    for warning in &output.warnings {
        log::warn!("{}", warning.text);
    }
    if !output.errors.is_empty() {
        diagnostics::report_build_errors(ctx.output(), project_dir, &output.errors)?;
        return Err(Error::BuildFailed {
            messages: output.errors,
        });
    }

    disk::validate(ctx.output_dir(), config.disk_request(), ctx.dev_mode()).await?;
    Ok(entry_points)
}

/// Adds `source-map-js` to a Bun project without touching its manifest.
async fn install_source_map_support(ctx: &BundleContext) -> Result<()> {
    let marker = ctx
        .project_dir()
        .join("node_modules")
        .join(SOURCE_MAP_PACKAGE)
        .join("package.json");
    if marker.is_file() {
        return Ok(());
    }
    if !*HAS_BUN {
        log::warn!("bun not found, cannot install {SOURCE_MAP_PACKAGE}");
        return Ok(());
    }

    let args: Vec<String> = [
        "add",
        SOURCE_MAP_PACKAGE,
        "--no-save",
        "--silent",
        "--no-progress",
        "--no-summary",
        "--ignore-scripts",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    let command = format!("bun {}", args.join(" "));
    log::debug!("installing {SOURCE_MAP_PACKAGE}: {command}");

    let captured = runner::capture(
        "bun",
        &args,
        ctx.project_dir(),
        ctx.cancellation(),
        runner::INSTALL_TIMEOUT,
    )
    .await?;
    if !captured.status.success() {
        return Err(Error::InstallFailure {
            command,
            exit_code: captured.status.code(),
            output: captured.output,
        });
    }
    Ok(())
}
