//! TypeScript type check run before development bundles.

use std::time::Duration;

use super::tool_detection::local_bin;
use crate::bundler::{
    BundleContext, Error, Result, host::BuildMessage, install::runner,
};

const TYPECHECK_TIMEOUT: Duration = Duration::from_secs(300);

/// Runs the project's own `tsc --noEmit`.
///
/// Skipped with a warning when TypeScript is not installed locally.
///
/// # Errors
///
/// Returns [`Error::BuildFailed`] after printing the compiler output when
/// the check fails.
pub async fn run(ctx: &BundleContext) -> Result<()> {
    let Some(tsc) = local_bin(ctx.project_dir(), "tsc") else {
        log::warn!("no TypeScript compiler found in node_modules/.bin, skipping type check");
        return Ok(());
    };
    let program = tsc.to_string_lossy().into_owned();
    log::debug!("running {program} --noEmit");

    let captured = runner::capture(
        &program,
        &["--noEmit".to_string()],
        ctx.project_dir(),
        ctx.cancellation(),
        TYPECHECK_TIMEOUT,
    )
    .await?;
    if captured.status.success() {
        log::debug!("type check passed");
        return Ok(());
    }

    let output = ctx.output();
    output.warn("TypeScript check failed")?;
    output.raw(&captured.output)?;
    if !captured.output.ends_with('\n') {
        output.raw("\n")?;
    }
    Err(Error::BuildFailed {
        messages: vec![BuildMessage::new("TypeScript check failed")],
    })
}
