//! Runs patched dependency sources under node when it is installed.

use std::{path::Path, process::Command};

use agentuity_bundler::bundler::{Registry, patch, patch::scanner};

fn node() -> Option<std::path::PathBuf> {
    which::which("node").ok()
}

fn run_node(dir: &Path, source: &str) -> String {
    let script = dir.join("check.cjs");
    std::fs::write(&script, source).unwrap();
    let out = Command::new(node().unwrap()).arg(&script).output().unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    String::from_utf8(out.stdout).unwrap().trim().to_string()
}

#[test]
fn abort_signal_wrapper_accepts_plain_objects() {
    if node().is_none() {
        eprintln!("node not installed, skipping");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let registry = Registry::builtin().unwrap();
    let src = "function isAbortSignal(x) { return false; }\n";
    let patched = patch::transform(
        &registry,
        Path::new("/app/node_modules/node-fetch/lib/index.js"),
        src,
    )
    .unwrap();
    assert!(scanner::check_balance(&patched.contents).is_ok());

    let script = format!(
        "{}\nconsole.log(JSON.stringify([isAbortSignal({{}}), __agentuity_isAbortSignal({{}}), isAbortSignal(1)]));\n",
        patched.contents
    );
    assert_eq!(run_node(dir.path(), &script), "[true,false,false]");
}

#[test]
fn async_wrappers_await_before_after_fragments() {
    if node().is_none() {
        eprintln!("node not installed, skipping");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let registry = Registry::builtin().unwrap();
    let src = "async function generateText(opts) { return { text: 'hi', opts }; }\n";
    let patched = patch::transform(&registry, Path::new("/app/node_modules/ai/dist/index.js"), src).unwrap();
    assert!(patched.contents.contains("result = await result"));
    let script = format!(
        "{}\ngenerateText({{ prompt: 'x' }}).then((r) => console.log(JSON.stringify(r.opts.experimental_telemetry)));\n",
        patched.contents
    );
    assert_eq!(run_node(dir.path(), &script), r#"{"isEnabled":true}"#);
}
