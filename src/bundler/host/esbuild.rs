//! esbuild, driven through a Node process.
//!
//! The embedded driver script is written to the temp directory and run with
//! the configured host command (`node` by default). It loads `esbuild` from
//! the project and relays every hook call over stdio.

use std::{
    path::{Path, PathBuf},
    process::Stdio,
    time::{Duration, Instant},
};

use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    process::Command,
};
use tokio_util::sync::CancellationToken;

use super::{
    BuildOptions, BuildOutput, ModuleBundler,
    protocol::{self, HostMessage, Step},
};
use crate::bundler::{Error, Result, error::Context, plugins::PluginHost};

const DRIVER_SOURCE: &str = include_str!("assets/esbuild-host.mjs");

/// Upper bound for one bundler run.
pub const BUILD_TIMEOUT: Duration = Duration::from_secs(600);

/// Default host command.
pub const DEFAULT_HOST_COMMAND: &str = "node";

/// Driver script on disk, removed on drop.
struct DriverScript(PathBuf);

impl DriverScript {
    fn write() -> Result<Self> {
        let path = std::env::temp_dir().join(format!("agentuity-esbuild-host-{}.mjs", uuid::Uuid::new_v4()));
        std::fs::write(&path, DRIVER_SOURCE).map_err(|e| Error::Host(format!("cannot write driver script: {e}")))?;
        Ok(Self(path))
    }

    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for DriverScript {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.0) {
            log::trace!("failed to remove {}: {e}", self.0.display());
        }
    }
}

#[derive(Debug, Clone)]
pub struct EsbuildHost {
    command: String,
    cancel: CancellationToken,
}

impl EsbuildHost {
    pub fn new(command: impl Into<String>, cancel: CancellationToken) -> Self {
        Self {
            command: command.into(),
            cancel,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    async fn run(&self, options: &BuildOptions, plugins: &PluginHost<'_>) -> Result<BuildOutput> {
        let program = which::which(&self.command)
            .map_err(|e| Error::Host(format!("cannot find bundler host '{}': {e}", self.command)))?;
        let script = DriverScript::write()?;
        let started = Instant::now();

        let mut child = Command::new(&program)
            .arg(script.path())
            .current_dir(&options.abs_working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Host(format!("failed to start {}: {e}", program.display())))?;

        let mut stdin = child.stdin.take().context("bundler host stdin not captured")?;
        let stdout = child.stdout.take().context("bundler host stdout not captured")?;
        let stderr = child.stderr.take().context("bundler host stderr not captured")?;

        let stderr_lines = tokio::spawn(async move {
            let mut captured = Vec::new();
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                log::trace!("bundler host: {line}");
                captured.push(line);
            }
            captured
        });

        let hooks = plugins.filters();
        log::debug!(
            "starting build of {} entry points with {} hooks",
            options.entry_points.len(),
            hooks.len()
        );
        let build = HostMessage::Build {
            options: options.clone(),
            hooks,
        };
        stdin.write_all(protocol::encode(&build)?.as_bytes()).await?;
        stdin.flush().await?;

        let mut lines = BufReader::new(stdout).lines();
        let conversation = async {
            while let Some(line) = lines.next_line().await? {
                if line.trim().is_empty() {
                    continue;
                }
                match protocol::dispatch(plugins, protocol::decode(&line)?) {
                    Step::Reply(reply) => {
                        stdin.write_all(protocol::encode(&reply)?.as_bytes()).await?;
                        stdin.flush().await?;
                    }
                    Step::Continue => {}
                    Step::Finished(output) => return Ok(Some(output)),
                }
            }
            Ok::<_, Error>(None)
        };

        let finished = tokio::select! {
            _ = self.cancel.cancelled() => {
                log::warn!("bundler cancelled, terminating {}", program.display());
                return Err(Error::Cancelled);
            }
            outcome = tokio::time::timeout(BUILD_TIMEOUT, conversation) => match outcome {
                Ok(result) => result?,
                Err(_) => return Err(Error::Host(format!("build timed out after {}s", BUILD_TIMEOUT.as_secs()))),
            },
        };

        drop(stdin);
        let status = child.wait().await?;
        let stderr = stderr_lines.await.unwrap_or_default();
        log::debug!("finished build in {:?}", started.elapsed());

        finished.ok_or_else(|| {
            Error::Host(format!(
                "bundler host exited ({status}) without a result: {}",
                stderr.join("\n").trim()
            ))
        })
    }
}

impl Default for EsbuildHost {
    fn default() -> Self {
        Self::new(DEFAULT_HOST_COMMAND, CancellationToken::new())
    }
}

impl ModuleBundler for EsbuildHost {
    fn build(
        &self,
        options: &BuildOptions,
        plugins: &PluginHost<'_>,
    ) -> impl std::future::Future<Output = Result<BuildOutput>> + Send {
        self.run(options, plugins)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::bundler::plugins::{FILE_NAMESPACE, LoadResult, Loader, Plugin, PluginBuild};
    use std::os::unix::fs::PermissionsExt;

    struct Fixed;

    impl Plugin for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn setup<'a>(&'a self, build: &mut PluginBuild<'a>) -> Result<()> {
            build.on_load(r"\.txt$", Some(FILE_NAMESPACE), |_| {
                Ok(Some(LoadResult::new("export default 1;", Loader::Js)))
            })
        }
    }

    /// Installs a shell script standing in for the Node driver.
    fn fake_host(dir: &Path, body: &str) -> String {
        let path = dir.join("fake-host");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn relays_hook_calls_until_done() {
        let dir = tempfile::tempdir().unwrap();
        let command = fake_host(
            dir.path(),
            r#"read build
echo '{"type":"log","level":"debug","message":"driver ready"}'
echo '{"type":"load","requestId":0,"hook":0,"args":{"path":"/a.txt","namespace":"file"}}'
read reply
case "$reply" in
  *'"requestId":0'*'export default 1;'*) echo '{"type":"done","errors":[],"warnings":[{"text":"relayed"}]}' ;;
  *) echo '{"type":"done","errors":[{"text":"unexpected reply"}]}' ;;
esac"#,
        );
        let plugins: Vec<Box<dyn Plugin>> = vec![Box::new(Fixed)];
        let host = PluginHost::new(&plugins).unwrap();
        let bundler = EsbuildHost::new(command, CancellationToken::new());

        let output = bundler
            .build(&BuildOptions::new(dir.path(), dir.path().join("out")), &host)
            .await
            .unwrap();
        assert!(output.errors.is_empty(), "{:?}", output.errors);
        assert_eq!(output.warnings[0].text, "relayed");
    }

    #[tokio::test]
    async fn driver_exit_without_result_is_host_error() {
        let dir = tempfile::tempdir().unwrap();
        let command = fake_host(dir.path(), "read build\necho 'esbuild missing' >&2\nexit 1");
        let plugins: Vec<Box<dyn Plugin>> = Vec::new();
        let host = PluginHost::new(&plugins).unwrap();
        let err = EsbuildHost::new(command, CancellationToken::new())
            .build(&BuildOptions::new(dir.path(), dir.path().join("out")), &host)
            .await
            .unwrap_err();
        match err {
            Error::Host(message) => assert!(message.contains("esbuild missing"), "{message}"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_host_command_is_reported() {
        let plugins: Vec<Box<dyn Plugin>> = Vec::new();
        let host = PluginHost::new(&plugins).unwrap();
        let err = EsbuildHost::new("definitely-not-node", CancellationToken::new())
            .build(&BuildOptions::new("/tmp", "/tmp/out"), &host)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Host(_)));
    }
}
