//! Compile-time substitutions baked into the JavaScript bundle.
//!
//! Every value is a JavaScript expression. Strings are emitted as JSON string
//! literals, which are valid JavaScript string literals for any input.

use std::{collections::BTreeMap, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    bundler::{BundleContext, Result, Runtime, error::ErrorExt, version::sdk},
    metadata::{ProjectConfig, safe_agent_dirname},
};

/// Version of this bundler, reported to the runtime as the CLI version.
pub const CLI_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable that names the target environment of development builds.
pub const ENVIRONMENT_VAR: &str = "AGENTUITY_ENVIRONMENT";

/// Agent manifest entry serialized into the bundle and `config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentManifest {
    pub id: String,
    pub name: String,
    pub filename: String,
}

/// Lists the project's agents with the file each one is loaded from.
///
/// `filename` is `<agents dir>/<safe agent name>/<file>`.
pub fn agent_manifest(config: &ProjectConfig, file: &str, python: bool) -> Vec<AgentManifest> {
    let dir = config.agents_dir().trim_end_matches('/');
    config
        .agents
        .iter()
        .map(|agent| AgentManifest {
            id: agent.id.clone(),
            name: agent.name.clone(),
            filename: format!("{dir}/{}/{file}", safe_agent_dirname(&agent.name, python)),
        })
        .collect()
}

#[derive(Debug, Default, Deserialize)]
struct PackageJson {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version: Option<String>,
}

/// Inputs of the defines map, gathered from the project before a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildMetadata {
    pub app_name: String,
    pub app_version: String,
    pub sdk_version: String,
    pub runtime: Runtime,
    pub production: bool,
    /// Value of `AGENTUITY_ENVIRONMENT` when set.
    pub environment: Option<String>,
    pub agents: Vec<AgentManifest>,
}

impl BuildMetadata {
    /// Reads `package.json` and the installed SDK manifest.
    ///
    /// # Errors
    ///
    /// Fails when `package.json` is missing or malformed, or when the SDK
    /// manifest cannot be found.
    pub fn collect(ctx: &BundleContext, config: &ProjectConfig, runtime: Runtime) -> Result<Self> {
        let package = read_package_json(&ctx.project_dir().join("package.json"))?;
        let manifest = sdk::find_js_sdk_manifest(ctx.project_dir()).ok_or_else(|| {
            crate::bundler::Error::SdkVersionUnresolvable {
                reason: format!(
                    "{} is not installed in {} or any parent directory",
                    sdk::JS_SDK_PACKAGE,
                    ctx.project_dir().display()
                ),
            }
        })?;

        Ok(Self {
            app_name: package.name.unwrap_or_default(),
            app_version: package.version.unwrap_or_default(),
            sdk_version: sdk::read_manifest_version(&manifest)?,
            runtime,
            production: ctx.production(),
            environment: std::env::var(ENVIRONMENT_VAR).ok(),
            agents: agent_manifest(config, "index.js", false),
        })
    }
}

fn read_package_json(path: &Path) -> Result<PackageJson> {
    let contents = std::fs::read_to_string(path).fs_context("reading package.json", path)?;
    Ok(serde_json::from_str(&contents)?)
}

fn literal(value: &str) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// Builds the `process.env.*` substitution map.
pub fn defines(meta: &BuildMetadata) -> Result<BTreeMap<String, String>> {
    let mut defines = BTreeMap::new();
    let mut set = |key: &str, value: &str| -> Result<()> {
        defines.insert(format!("process.env.{key}"), literal(value)?);
        Ok(())
    };

    set("AGENTUITY_CLI_VERSION", CLI_VERSION)?;
    set("AGENTUITY_SDK_APP_NAME", &meta.app_name)?;
    set("AGENTUITY_SDK_APP_VERSION", &meta.app_version)?;
    set("AGENTUITY_SDK_VERSION", &meta.sdk_version)?;
    set("AGENTUITY_BUNDLER_RUNTIME", meta.runtime.as_str())?;
    if meta.production {
        set("AGENTUITY_SDK_DEV_MODE", "false")?;
        set("NODE_ENV", "production")?;
    } else {
        set(ENVIRONMENT_VAR, meta.environment.as_deref().unwrap_or("development"))?;
    }
    set("AGENTUITY_CLOUD_AGENTS_JSON", &serde_json::to_string(&meta.agents)?)?;

    log::trace!("defines: {defines:?}");
    Ok(defines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::AgentConfig;

    fn metadata(production: bool) -> BuildMetadata {
        BuildMetadata {
            app_name: "my-agents".into(),
            app_version: "1.2.0".into(),
            sdk_version: "0.0.120".into(),
            runtime: Runtime::BunJs,
            production,
            environment: None,
            agents: vec![AgentManifest {
                id: "agent_1".into(),
                name: "Hello World".into(),
                filename: "src/agents/Hello-World/index.js".into(),
            }],
        }
    }

    #[test]
    fn production_defines() {
        let defines = defines(&metadata(true)).unwrap();
        assert_eq!(defines["process.env.AGENTUITY_SDK_APP_NAME"], "\"my-agents\"");
        assert_eq!(defines["process.env.AGENTUITY_BUNDLER_RUNTIME"], "\"bunjs\"");
        assert_eq!(defines["process.env.AGENTUITY_SDK_DEV_MODE"], "\"false\"");
        assert_eq!(defines["process.env.NODE_ENV"], "\"production\"");
        assert!(!defines.contains_key("process.env.AGENTUITY_ENVIRONMENT"));
        assert_eq!(
            defines["process.env.AGENTUITY_CLI_VERSION"],
            format!("\"{CLI_VERSION}\"")
        );
    }

    #[test]
    fn development_environment_defaults() {
        let mut meta = metadata(false);
        let defines_dev = defines(&meta).unwrap();
        assert_eq!(defines_dev["process.env.AGENTUITY_ENVIRONMENT"], "\"development\"");
        assert!(!defines_dev.contains_key("process.env.NODE_ENV"));
        assert!(!defines_dev.contains_key("process.env.AGENTUITY_SDK_DEV_MODE"));

        meta.environment = Some("staging".into());
        assert_eq!(
            defines(&meta).unwrap()["process.env.AGENTUITY_ENVIRONMENT"],
            "\"staging\""
        );
    }

    #[test]
    fn agents_json_is_a_string_literal() {
        let defines = defines(&metadata(true)).unwrap();
        let literal = &defines["process.env.AGENTUITY_CLOUD_AGENTS_JSON"];
        let inner: String = serde_json::from_str(literal).unwrap();
        let agents: Vec<AgentManifest> = serde_json::from_str(&inner).unwrap();
        assert_eq!(agents, metadata(true).agents);
    }

    #[test]
    fn manifest_uses_safe_directory_names() {
        let config = ProjectConfig {
            agents: vec![AgentConfig {
                id: "a1".into(),
                name: "my agent-1".into(),
                description: None,
            }],
            ..Default::default()
        };
        let js = agent_manifest(&config, "index.js", false);
        assert_eq!(js[0].filename, "src/agents/my-agent-1/index.js");
        let py = agent_manifest(&config, "agent.py", true);
        assert_eq!(py[0].filename, "src/agents/my_agent_1/agent.py");
        assert!(agent_manifest(&ProjectConfig::default(), "index.js", false).is_empty());
    }
}
