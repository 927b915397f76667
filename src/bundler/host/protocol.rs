//! Newline-delimited JSON spoken with the bundler driver over stdio.
//!
//! The host writes one `build` message announcing the options and every hook
//! filter, then answers each `resolve`/`load` request by id until the driver
//! reports `done`.

use serde::{Deserialize, Serialize};

use super::{BuildMessage, BuildOptions, BuildOutput};
use crate::bundler::{
    Result,
    plugins::{HookFilter, LoadArgs, LoadResult, PluginHost, ResolveArgs, ResolveResult},
};

/// Host → driver.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum HostMessage {
    Build {
        options: BuildOptions,
        hooks: Vec<HookFilter>,
    },
    ResolveResult {
        request_id: u64,
        result: Option<ResolveResult>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    LoadResult {
        request_id: u64,
        result: Option<LoadResult>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

/// Driver → host.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum DriverEvent {
    Resolve {
        request_id: u64,
        hook: usize,
        args: ResolveArgs,
    },
    Load {
        request_id: u64,
        hook: usize,
        args: LoadArgs,
    },
    Log {
        level: String,
        message: String,
    },
    Done {
        #[serde(default)]
        errors: Vec<BuildMessage>,
        #[serde(default)]
        warnings: Vec<BuildMessage>,
    },
}

/// What the host does after one driver event.
#[derive(Debug)]
pub enum Step {
    Reply(HostMessage),
    Continue,
    Finished(BuildOutput),
}

/// Serializes a message as one protocol line.
pub fn encode(message: &HostMessage) -> Result<String> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    Ok(line)
}

pub fn decode(line: &str) -> Result<DriverEvent> {
    Ok(serde_json::from_str(line)?)
}

/// Answers one driver event with the plugin host.
///
/// Hook failures are sent back to the driver, which reports them as build
/// errors attributed to the plugin.
pub fn dispatch(plugins: &PluginHost<'_>, event: DriverEvent) -> Step {
    match event {
        DriverEvent::Resolve { request_id, hook, args } => {
            let (result, error) = split(plugins.call_resolve(hook, &args));
            Step::Reply(HostMessage::ResolveResult {
                request_id,
                result,
                error,
            })
        }
        DriverEvent::Load { request_id, hook, args } => {
            let (result, error) = split(plugins.call_load(hook, &args));
            Step::Reply(HostMessage::LoadResult {
                request_id,
                result,
                error,
            })
        }
        DriverEvent::Log { level, message } => {
            match level.as_str() {
                "error" => log::error!("bundler: {message}"),
                "warn" | "warning" => log::warn!("bundler: {message}"),
                "debug" => log::debug!("bundler: {message}"),
                _ => log::trace!("bundler: {message}"),
            }
            Step::Continue
        }
        DriverEvent::Done { errors, warnings } => Step::Finished(BuildOutput { errors, warnings }),
    }
}

fn split<T>(outcome: Result<Option<T>>) -> (Option<T>, Option<String>) {
    match outcome {
        Ok(result) => (result, None),
        Err(e) => (None, Some(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::plugins::{FILE_NAMESPACE, Loader, Plugin, PluginBuild};

    struct Echo;

    impl Plugin for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn setup<'a>(&'a self, build: &mut PluginBuild<'a>) -> Result<()> {
            build.on_load(r"\.echo$", Some(FILE_NAMESPACE), |args| {
                Ok(Some(LoadResult::new(format!("export default {:?};", args.path), Loader::Js)))
            })?;
            build.on_load(r"\.fail$", None, |_| crate::bail!("cannot load"))
        }
    }

    fn host_plugins() -> Vec<Box<dyn Plugin>> {
        vec![Box::new(Echo)]
    }

    #[test]
    fn load_request_is_answered_by_id() {
        let plugins = host_plugins();
        let host = PluginHost::new(&plugins).unwrap();
        let event = decode(r#"{"type":"load","requestId":9,"hook":0,"args":{"path":"/a.echo","namespace":"file"}}"#)
            .unwrap();
        let Step::Reply(reply) = dispatch(&host, event) else {
            panic!("expected a reply");
        };
        let line = encode(&reply).unwrap();
        assert!(line.ends_with('\n'));
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["type"], "loadResult");
        assert_eq!(value["requestId"], 9);
        assert_eq!(value["result"]["contents"], "export default \"/a.echo\";");
        assert_eq!(value["result"]["loader"], "js");
        assert!(value.get("error").is_none());
    }

    #[test]
    fn hook_errors_are_returned_to_the_driver() {
        let plugins = host_plugins();
        let host = PluginHost::new(&plugins).unwrap();
        let event = decode(r#"{"type":"load","requestId":1,"hook":1,"args":{"path":"/x.fail"}}"#).unwrap();
        let Step::Reply(HostMessage::LoadResult { result, error, .. }) = dispatch(&host, event) else {
            panic!("expected a load reply");
        };
        assert!(result.is_none());
        assert_eq!(error.as_deref(), Some("cannot load"));
    }

    #[test]
    fn build_message_announces_hooks() {
        let plugins = host_plugins();
        let host = PluginHost::new(&plugins).unwrap();
        let line = encode(&HostMessage::Build {
            options: BuildOptions::new("/p", "/p/out"),
            hooks: host.filters(),
        })
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["type"], "build");
        assert_eq!(value["options"]["absWorkingDir"], "/p");
        assert_eq!(value["hooks"][0]["kind"], "load");
        assert_eq!(value["hooks"][0]["namespace"], "file");
    }

    #[test]
    fn done_finishes_with_messages() {
        let plugins = host_plugins();
        let host = PluginHost::new(&plugins).unwrap();
        let event = decode(r#"{"type":"done","errors":[{"text":"boom"}]}"#).unwrap();
        match dispatch(&host, event) {
            Step::Finished(output) => {
                assert_eq!(output.errors, [BuildMessage::new("boom")]);
                assert!(output.warnings.is_empty());
            }
            other => panic!("unexpected step: {other:?}"),
        }
    }
}
