//! Python build routine.
//!
//! Python projects are deployed from source. The build syncs the virtual
//! environment, checks the SDK version and writes `config.json` describing
//! the agents into the output directory.

use std::{path::Path, sync::LazyLock};

use regex::Regex;
use serde::Serialize;

use super::{
    defines::{AgentManifest, CLI_VERSION, agent_manifest},
    disk,
};
use crate::{
    bundler::{
        BundleContext, Language, Result, Runtime, error::ErrorExt, install, registry::Registry,
        utils::fs, version,
    },
    metadata::ProjectConfig,
};

/// Written into the output directory.
pub const CONFIG_FILE: &str = "config.json";

static PYPROJECT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"name\s+=\s+"(.*?)""#).expect("static regex"));
static PYPROJECT_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"version\s+=\s+"(.*?)""#).expect("static regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PythonConfig {
    pub agents: Vec<AgentManifest>,
    pub cli_version: String,
    pub environment: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app: Option<AppInfo>,
}

/// Reads the first `name = "…"` and `version = "…"` assignments.
pub fn app_info(pyproject: &str) -> AppInfo {
    let capture = |re: &Regex| re.captures(pyproject).map(|c| c[1].to_string());
    AppInfo {
        name: capture(&PYPROJECT_NAME),
        version: capture(&PYPROJECT_VERSION),
    }
}

fn read_app_info(project_dir: &Path) -> Result<Option<AppInfo>> {
    let path = project_dir.join("pyproject.toml");
    if !path.is_file() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(&path).fs_context("reading pyproject.toml", &path)?;
    Ok(Some(app_info(&contents)))
}

/// Syncs, gates and describes a Python project.
///
/// # Errors
///
/// Install and gate failures, an oversized virtual environment, or a
/// failure to write `config.json`.
pub async fn bundle(
    ctx: &BundleContext,
    config: &ProjectConfig,
    registry: &Registry,
    runtime: Runtime,
) -> Result<()> {
    let project_dir = ctx.project_dir();

    if install::needs_install(project_dir, Language::Python, ctx.install()) {
        let plan = install::plan(project_dir, config.runtime_name(), ctx.ci())?;
        ctx.output().progress(&format!("Syncing virtual environment with {}", plan.command))?;
        let output = install::run(&plan, ctx.cancellation()).await?;
        log::debug!("installed dependencies: {}", output.trim());
    }

    version::check(ctx, registry, Language::Python, runtime)?;

    disk::validate(&project_dir.join(".venv"), config.disk_request(), ctx.dev_mode()).await?;

    let described = PythonConfig {
        agents: agent_manifest(config, "agent.py", true),
        cli_version: CLI_VERSION.to_string(),
        environment: if ctx.production() { "production" } else { "development" }.to_string(),
        app: read_app_info(project_dir)?,
    };
    let path = ctx.output_dir().join(CONFIG_FILE);
    fs::write_file(&path, serde_json::to_vec(&described)?).await?;
    log::debug!("wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_name_and_version_from_pyproject() {
        let info = app_info(
            "[project]\nname = \"weather-agents\"\nversion = \"0.3.1\"\nrequires-python = \">=3.10\"\n",
        );
        assert_eq!(info.name.as_deref(), Some("weather-agents"));
        assert_eq!(info.version.as_deref(), Some("0.3.1"));

        let partial = app_info("[project]\nname = \"x\"\n");
        assert_eq!(partial.version, None);
        assert_eq!(
            serde_json::to_string(&partial).unwrap(),
            r#"{"name":"x"}"#
        );
    }

    #[test]
    fn config_without_app_omits_the_key() {
        let config = PythonConfig {
            agents: Vec::new(),
            cli_version: "1.0.0".into(),
            environment: "development".into(),
            app: None,
        };
        assert_eq!(
            serde_json::to_string(&config).unwrap(),
            r#"{"agents":[],"cli_version":"1.0.0","environment":"development"}"#
        );
    }
}
