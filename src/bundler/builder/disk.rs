//! Deployment disk size check.

use std::path::Path;

use crate::bundler::{Result, utils::fs};

/// Parses a resource quantity such as `250Mi`, `1.5Gi` or `500M` into bytes.
///
/// Binary suffixes (`Ki`, `Mi`, `Gi`, `Ti`) are powers of 1024, decimal ones
/// (`k`/`K`, `M`, `G`, `T`) powers of 1000. A bare number is bytes.
pub fn parse_quantity(raw: &str) -> Result<u64> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(raw.len());
    let (number, suffix) = raw.split_at(split);
    let value: f64 = number
        .parse()
        .map_err(|_| crate::bundler::Error::GenericError(format!("invalid disk quantity: {raw:?}")))?;

    let multiplier: f64 = match suffix {
        "" => 1.0,
        "Ki" => 1024.0,
        "Mi" => 1024f64.powi(2),
        "Gi" => 1024f64.powi(3),
        "Ti" => 1024f64.powi(4),
        "k" | "K" => 1e3,
        "M" => 1e6,
        "G" => 1e9,
        "T" => 1e12,
        other => crate::bail!("invalid disk quantity suffix {other:?} in {raw:?}"),
    };
    Ok((value * multiplier).round() as u64)
}

/// Human form used in size errors: megabytes rounded to the nearest integer.
pub fn format_size(bytes: u64) -> String {
    format!("{}Mi", (bytes as f64 / 1e6).round() as u64)
}

/// Fails when the files under `dir` exceed the requested disk size.
///
/// Dev-mode builds and projects without a disk request are not checked.
pub async fn validate(dir: &Path, request: Option<&str>, dev_mode: bool) -> Result<()> {
    if dev_mode {
        return Ok(());
    }
    let Some(request) = request else {
        log::debug!("no disk size requested, skipping size check of {}", dir.display());
        return Ok(());
    };
    let limit = parse_quantity(request)?;
    let size = fs::dir_size(dir).await?;
    log::debug!(
        "deployment size {} ({size} bytes), requested {request} ({limit} bytes)",
        format_size(size)
    );
    if size > limit {
        crate::bail!(
            "The deployment is larger ({}) than the requested disk size for the deployment ({})",
            format_size(size),
            request.trim()
        );
    }
    Ok(())
}
