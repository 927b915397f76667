//! Project configuration loaded from `agentuity.yaml`.
//!
//! The build pipeline only reads this file; it never writes it back.

use crate::bundler::{Error, Language, Result, error::ErrorExt};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// File name of the project configuration inside the project root.
pub const PROJECT_FILE: &str = "agentuity.yaml";

static UNSAFE_NAME_CHARS: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"[^a-zA-Z0-9_-]").expect("static regex"));

static UNSAFE_PYTHON_NAME_CHARS: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"[^a-zA-Z0-9_]").expect("static regex"));

/// Top-level project configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectConfig {
    /// Cloud project identifier. A project without one cannot be bundled.
    #[serde(default)]
    pub project_id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub bundler: Option<BundlerConfig>,

    #[serde(default)]
    pub agents: Vec<AgentConfig>,

    #[serde(default)]
    pub deployment: Option<DeploymentConfig>,
}

/// `bundler:` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BundlerConfig {
    #[serde(default)]
    pub language: String,

    #[serde(default)]
    pub runtime: String,

    #[serde(default)]
    pub agents: AgentBundlerConfig,

    /// Glob patterns (relative to the project root) excluded from entry-point discovery.
    #[serde(default)]
    pub ignore: Vec<String>,
}

/// `bundler.agents:` section.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentBundlerConfig {
    #[serde(default = "default_agents_dir")]
    pub dir: String,
}

impl Default for AgentBundlerConfig {
    fn default() -> Self {
        Self {
            dir: default_agents_dir(),
        }
    }
}

fn default_agents_dir() -> String {
    "src/agents".to_string()
}

/// One entry of the `agents:` list.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeploymentConfig {
    #[serde(default)]
    pub resources: Option<Resources>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Resources {
    #[serde(default)]
    pub memory: Option<String>,
    #[serde(default)]
    pub cpu: Option<String>,
    /// Requested disk quantity such as `250Mi` or `1Gi`.
    #[serde(default)]
    pub disk: Option<String>,
}

impl ProjectConfig {
    /// Loads and validates `agentuity.yaml` from `project_dir`.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidProject`] when the file is missing, has no
    ///   `project_id`, no `bundler` section or no `bundler.language`.
    /// * [`Error::UnsupportedLanguage`] for an unknown language.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let path = project_dir.join(PROJECT_FILE);
        if !path.exists() {
            return Err(invalid(
                &path,
                "file not found; this directory is not an agentuity project",
            ));
        }
        let contents = std::fs::read_to_string(&path).fs_context("reading project file", &path)?;
        let config: ProjectConfig = serde_yaml::from_str(&contents)?;

        if config.project_id.trim().is_empty() {
            return Err(invalid(&path, "missing project_id value"));
        }
        let bundler = config
            .bundler
            .as_ref()
            .ok_or_else(|| invalid(&path, "missing bundler value"))?;
        if bundler.language.trim().is_empty() {
            return Err(invalid(&path, "missing bundler.language value"));
        }
        bundler.language.parse::<Language>()?;

        log::debug!(
            "loaded project {} ({} agents) from {}",
            config.project_id,
            config.agents.len(),
            path.display()
        );
        Ok(config)
    }

    fn bundler_section(&self) -> &BundlerConfig {
        static EMPTY: LazyLock<BundlerConfig> = LazyLock::new(BundlerConfig::default);
        self.bundler.as_ref().unwrap_or(&EMPTY)
    }

    /// Declared language. Validated by [`ProjectConfig::load`].
    pub fn language(&self) -> Result<Language> {
        self.bundler_section().language.parse()
    }

    /// Declared runtime name, parsed lazily by the install planner.
    pub fn runtime_name(&self) -> &str {
        &self.bundler_section().runtime
    }

    /// Agents directory relative to the project root.
    pub fn agents_dir(&self) -> &str {
        &self.bundler_section().agents.dir
    }

    pub fn ignore_patterns(&self) -> &[String] {
        &self.bundler_section().ignore
    }

    /// Requested deployment disk quantity, if any.
    pub fn disk_request(&self) -> Option<&str> {
        self.deployment
            .as_ref()
            .and_then(|d| d.resources.as_ref())
            .and_then(|r| r.disk.as_deref())
    }
}

fn invalid(path: &Path, reason: &str) -> Error {
    Error::InvalidProject {
        path: PathBuf::from(path),
        reason: reason.to_string(),
    }
}

/// Directory name an agent's sources live under.
///
/// JavaScript agents replace anything outside `[a-zA-Z0-9_-]` with `-`;
/// Python agents must be importable modules, so `-` is replaced too and the
/// replacement character is `_`.
pub fn safe_agent_dirname(name: &str, python: bool) -> String {
    if python {
        UNSAFE_PYTHON_NAME_CHARS.replace_all(name, "_").into_owned()
    } else {
        UNSAFE_NAME_CHARS.replace_all(name, "-").into_owned()
    }
}
