//! Command line interface for the agent bundler.
//!
//! This module parses arguments, builds the per-build context and reports
//! the outcome. Exit codes are chosen by the binary from the returned error.

mod args;
mod output;

pub use args::{Args, BundleArgs, Command, RuntimeConfig};
pub use output::{CapturedOutput, OutputManager};

use tokio_util::sync::CancellationToken;

use crate::{
    bundler::{BundleContextBuilder, Bundler, EsbuildHost, Registry},
    error::{BundlerError, CliError, Result},
};

/// Runs the parsed command against `registry`.
pub async fn run(args: Args, registry: &Registry) -> Result<()> {
    let config = RuntimeConfig::from(&args);
    match args.command {
        Command::Bundle(bundle) => run_bundle(&bundle, &config, registry).await,
    }
}

async fn run_bundle(args: &BundleArgs, config: &RuntimeConfig, registry: &Registry) -> Result<()> {
    args.validate()
        .map_err(|reason| CliError::InvalidArguments { reason })?;
    let project_dir = args.project_dir();
    if !project_dir.is_dir() {
        return Err(CliError::ProjectNotFound { path: project_dir }.into());
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("interrupted, cancelling build");
            on_interrupt.cancel();
        }
    });

    let ctx = BundleContextBuilder::new()
        .project_dir(&project_dir)
        .production(args.production)
        .install(args.install)
        .ci(args.ci)
        .dev_mode(args.dev)
        .cancellation(cancel.clone())
        .output(config.output().clone())
        .build()?;

    let bundler = Bundler::new(registry, EsbuildHost::new(&args.bundler_host, cancel));
    let artifact = bundler.bundle(&ctx).await?;

    let output = config.output();
    output.success(&format!(
        "Bundled {} ({} entry points, {} bytes)",
        artifact.output_dir.display(),
        artifact.entry_points.len(),
        artifact.size
    ))?;
    output.verbose(&format!("sha256 {}", artifact.checksum))?;
    Ok(())
}

/// Prints a failed run's error unless the build already reported it.
pub fn report_error(output: &OutputManager, error: &BundlerError) {
    if !error.is_reported() {
        let _ = output.error(&error.to_string());
    }
    for suggestion in error.recovery_suggestions() {
        let _ = output.indent(&suggestion);
    }
}
