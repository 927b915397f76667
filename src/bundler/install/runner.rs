//! Cancellable subprocess execution.

use std::{
    path::Path,
    process::{ExitStatus, Stdio},
    time::{Duration, Instant},
};

use tokio::{
    io::{AsyncRead, AsyncReadExt},
    process::Command,
};
use tokio_util::sync::CancellationToken;

use super::InstallPlan;
use crate::bundler::{Error, Result};

/// Upper bound for a dependency install.
pub const INSTALL_TIMEOUT: Duration = Duration::from_secs(600);

/// Exit status and combined stdout + stderr of a finished child process.
#[derive(Debug)]
pub struct Captured {
    pub status: ExitStatus,
    pub output: String,
}

async fn read_all<R: AsyncRead + Unpin>(stream: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut stream) = stream {
        if let Err(e) = stream.read_to_end(&mut buf).await {
            log::debug!("failed to read child output: {e}");
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Runs `program` in `dir`, capturing its output.
///
/// The child is killed when `cancel` fires or `timeout` elapses.
///
/// # Errors
///
/// * [`Error::Cancelled`] when the cancellation token fires first.
/// * [`Error::IoError`] when the program cannot be spawned or waited on.
/// * [`Error::GenericError`] on timeout.
pub async fn capture(
    program: &str,
    args: &[String],
    dir: &Path,
    cancel: &CancellationToken,
    timeout: Duration,
) -> Result<Captured> {
    let mut child = Command::new(program)
        .args(args)
        .current_dir(dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let work = async {
        let (out, err) = tokio::join!(read_all(stdout), read_all(stderr));
        let status = child.wait().await;
        (status, out, err)
    };

    // Dropping `work` releases the child, which `kill_on_drop` then terminates.
    let (status, out, err) = tokio::select! {
        _ = cancel.cancelled() => {
            log::warn!("{program} cancelled, terminating");
            return Err(Error::Cancelled);
        }
        finished = tokio::time::timeout(timeout, work) => match finished {
            Ok(done) => done,
            Err(_) => crate::bail!("{program} timed out after {}s", timeout.as_secs()),
        },
    };

    let mut output = out;
    if !err.is_empty() {
        if !output.is_empty() && !output.ends_with('\n') {
            output.push('\n');
        }
        output.push_str(&err);
    }
    Ok(Captured {
        status: status?,
        output,
    })
}

/// Executes an install plan.
///
/// Returns the combined output on success.
///
/// # Errors
///
/// Returns [`Error::InstallFailure`] when the command cannot be started,
/// times out or exits unsuccessfully, and [`Error::Cancelled`] when the
/// build's cancellation scope fires.
pub async fn run(plan: &InstallPlan, cancel: &CancellationToken) -> Result<String> {
    let started = Instant::now();
    log::debug!("installing dependencies in {}: {plan}", plan.dir.display());

    let captured = match capture(&plan.command, &plan.args, &plan.dir, cancel, INSTALL_TIMEOUT).await {
        Ok(captured) => captured,
        Err(Error::Cancelled) => return Err(Error::Cancelled),
        Err(e) => {
            return Err(Error::InstallFailure {
                command: plan.to_string(),
                exit_code: None,
                output: e.to_string(),
            });
        }
    };
    log::trace!(
        "install command: {plan} returned: {}, exit code: {:?}",
        captured.output.trim(),
        captured.status.code()
    );

    if !captured.status.success() {
        return Err(Error::InstallFailure {
            command: plan.to_string(),
            exit_code: captured.status.code(),
            output: captured.output,
        });
    }
    log::debug!("installed dependencies in {:?}", started.elapsed());
    Ok(captured.output)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str, dir: &Path) -> InstallPlan {
        InstallPlan {
            command: "sh".into(),
            args: vec!["-c".into(), script.into()],
            dir: dir.to_path_buf(),
        }
    }

    #[tokio::test]
    async fn captures_combined_output() {
        let dir = tempfile::tempdir().unwrap();
        let out = run(&sh("echo installed; echo warn >&2", dir.path()), &CancellationToken::new())
            .await
            .unwrap();
        assert!(out.contains("installed"));
        assert!(out.contains("warn"));
    }

    #[tokio::test]
    async fn non_zero_exit_is_install_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = run(&sh("echo broken lockfile >&2; exit 3", dir.path()), &CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            Error::InstallFailure { exit_code, output, .. } => {
                assert_eq!(exit_code, Some(3));
                assert!(output.contains("broken lockfile"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_program_is_install_failure() {
        let dir = tempfile::tempdir().unwrap();
        let plan = InstallPlan {
            command: "definitely-not-a-package-manager".into(),
            args: vec![],
            dir: dir.path().to_path_buf(),
        };
        assert!(matches!(
            run(&plan, &CancellationToken::new()).await,
            Err(Error::InstallFailure { exit_code: None, .. })
        ));
    }

    #[tokio::test]
    async fn cancellation_aborts_the_child() {
        let dir = tempfile::tempdir().unwrap();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });
        let started = Instant::now();
        let err = run(&sh("sleep 30", dir.path()), &cancel).await.unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
