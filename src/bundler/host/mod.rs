//! External module bundler seam.
//!
//! The pipeline never bundles by itself. It hands a [`ModuleBundler`] the
//! entry points, the defines map and a [`PluginHost`] whose hooks the
//! bundler calls back into for every module it resolves or loads.

pub mod esbuild;
pub mod protocol;

use std::{collections::BTreeMap, future::Future, path::PathBuf};

use serde::{Deserialize, Serialize};

pub use esbuild::EsbuildHost;

use crate::bundler::{Result, plugins::PluginHost};

/// Header written at the top of every generated bundle.
pub const GENERATED_HEADER: &str = "/* DO NOT EDIT - GENERATED CODE */\n";

/// Dynamic `require` shim for Node built-ins inside an ESM bundle.
pub const REQUIRE_SHIM: &str = include_str!("assets/require-shim.js");

/// Source position of a bundler message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub file: String,
    /// 1-based.
    pub line: usize,
    /// 0-based, in bytes.
    #[serde(default)]
    pub column: usize,
    #[serde(default)]
    pub line_text: String,
}

/// One error or warning reported by the bundler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildMessage {
    pub text: String,
    #[serde(default)]
    pub location: Option<Location>,
}

impl BuildMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            location: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOutput {
    #[serde(default)]
    pub errors: Vec<BuildMessage>,
    #[serde(default)]
    pub warnings: Vec<BuildMessage>,
}

/// Options of one bundler invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildOptions {
    pub entry_points: Vec<PathBuf>,
    pub outdir: PathBuf,
    pub abs_working_dir: PathBuf,
    /// Expression substitutions, e.g. `process.env.NODE_ENV` → `'production'`.
    pub define: BTreeMap<String, String>,
    pub banner: String,
    pub external: Vec<String>,
    pub format: String,
    pub platform: String,
    pub target: String,
    pub sourcemap: String,
    pub sources_content: bool,
    pub tree_shaking: bool,
    pub drop: Vec<String>,
    pub legal_comments: String,
}

impl BuildOptions {
    /// Defaults for an agent bundle: ESM for node 22 with linked source maps.
    pub fn new(abs_working_dir: impl Into<PathBuf>, outdir: impl Into<PathBuf>) -> Self {
        Self {
            entry_points: Vec::new(),
            outdir: outdir.into(),
            abs_working_dir: abs_working_dir.into(),
            define: BTreeMap::new(),
            banner: format!("{GENERATED_HEADER}\n{REQUIRE_SHIM}"),
            external: vec!["bun".to_string()],
            format: "esm".to_string(),
            platform: "node".to_string(),
            target: "node22".to_string(),
            sourcemap: "linked".to_string(),
            sources_content: true,
            tree_shaking: true,
            drop: vec!["debugger".to_string()],
            legal_comments: "none".to_string(),
        }
    }
}

/// Something that can bundle a module graph while calling plugin hooks.
pub trait ModuleBundler: Send + Sync {
    /// Runs one build. Bundler-reported problems come back in [`BuildOutput`];
    /// `Err` is reserved for failures of the bundler itself.
    fn build(
        &self,
        options: &BuildOptions,
        plugins: &PluginHost<'_>,
    ) -> impl Future<Output = Result<BuildOutput>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banner_carries_header_and_shim() {
        let options = BuildOptions::new("/p", "/p/.agentuity");
        assert!(options.banner.starts_with(GENERATED_HEADER));
        assert!(options.banner.contains("globalThis.__require"));
        assert_eq!(options.external, ["bun"]);
    }

    #[test]
    fn messages_accept_bundler_json() {
        let msg: BuildMessage = serde_json::from_str(
            r#"{"text":"Expected \";\"","location":{"file":"src/a.ts","line":3,"column":7,"lineText":"let x = "}}"#,
        )
        .unwrap();
        let location = msg.location.unwrap();
        assert_eq!(location.line, 3);
        assert_eq!(location.line_text, "let x = ");
    }
}
