//! Asset importers: data, binary and text files become synthetic modules.
//!
//! Each importer resolves matching project files into its own namespace, so
//! the load hook only ever sees files it resolved. Files inside a dependency
//! tree are never claimed and fall through to the bundler's defaults.

use std::path::{Path, PathBuf};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use path_absolutize::Absolutize;

use super::{FILE_NAMESPACE, LoadArgs, LoadResult, Loader, Plugin, PluginBuild, ResolveArgs, ResolveResult};
use crate::bundler::{Result, error::ErrorExt};

/// How an asset's bytes become a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    /// YAML parsed into its JSON value.
    Yaml,
    Json,
    /// Raw bytes exported as a `Uint8Array`.
    Binary,
    /// UTF-8 text exported as a string.
    Text,
}

/// One asset importer.
#[derive(Debug, Clone)]
pub struct AssetImporter {
    kind: AssetKind,
}

impl AssetImporter {
    pub fn new(kind: AssetKind) -> Self {
        Self { kind }
    }

    /// Importers for every supported asset category.
    pub fn all<'a>() -> Vec<Box<dyn Plugin + 'a>> {
        [AssetKind::Yaml, AssetKind::Json, AssetKind::Binary, AssetKind::Text]
            .into_iter()
            .map(|kind| Box::new(Self::new(kind)) as Box<dyn Plugin + 'a>)
            .collect()
    }

    fn namespace(&self) -> &'static str {
        match self.kind {
            AssetKind::Yaml => "yaml",
            AssetKind::Json => "json",
            AssetKind::Binary => "binary",
            AssetKind::Text => "text",
        }
    }

    /// Extension filter shared by the resolve and load hooks.
    pub fn filter(&self) -> &'static str {
        match self.kind {
            AssetKind::Yaml => r"\.ya?ml$",
            AssetKind::Json => r"\.json$",
            AssetKind::Binary => r"\.(gif|png|jpg|jpeg|svg|webp|pdf)$",
            AssetKind::Text => r"\.(txt|md|csv|xml|sql)$",
        }
    }

    fn resolve(&self, args: &ResolveArgs) -> Result<Option<ResolveResult>> {
        let path = resolve_path(args)?;
        if is_dependency_path(&path) {
            return Ok(None);
        }
        Ok(Some(ResolveResult {
            path: path.to_string_lossy().into_owned(),
            namespace: Some(self.namespace().to_string()),
            external: false,
        }))
    }

    fn load(&self, args: &LoadArgs) -> Result<Option<LoadResult>> {
        let path = Path::new(&args.path);
        let module = match self.kind {
            AssetKind::Yaml => {
                let contents = std::fs::read_to_string(path).fs_context("reading yaml import", path)?;
                let value: serde_json::Value = serde_yaml::from_str(&contents)?;
                format!("export default {}", serde_json::to_string(&value)?)
            }
            AssetKind::Json => {
                let contents = std::fs::read_to_string(path).fs_context("reading json import", path)?;
                let value: serde_json::Value = serde_json::from_str(&contents)?;
                format!("export default {}", serde_json::to_string(&value)?)
            }
            AssetKind::Binary => {
                let bytes = std::fs::read(path).fs_context("reading binary import", path)?;
                let encoded = serde_json::to_string(&STANDARD.encode(bytes))?;
                format!("export default new Uint8Array(Buffer.from({encoded}, \"base64\"));")
            }
            AssetKind::Text => {
                let contents = std::fs::read_to_string(path).fs_context("reading text import", path)?;
                format!("export default {}", serde_json::to_string(&contents)?)
            }
        };
        log::debug!("bundling {} file from {}", self.namespace(), args.path);
        Ok(Some(LoadResult::new(module, Loader::Js)))
    }
}

impl Plugin for AssetImporter {
    fn name(&self) -> &str {
        self.namespace()
    }

    fn setup<'a>(&'a self, build: &mut PluginBuild<'a>) -> Result<()> {
        build.on_resolve(self.filter(), Some(FILE_NAMESPACE), move |args| self.resolve(args))?;
        build.on_load(self.filter(), Some(self.namespace()), move |args| self.load(args))
    }
}

/// Absolute, lexically normalized path of an import.
fn resolve_path(args: &ResolveArgs) -> Result<PathBuf> {
    let path = Path::new(&args.path);
    let absolute = if args.resolve_dir.is_empty() {
        path.absolutize()?
    } else {
        path.absolutize_from(Path::new(&args.resolve_dir))?
    };
    Ok(absolute.into_owned())
}

/// True for paths inside a `node_modules` tree.
pub fn is_dependency_path(path: &Path) -> bool {
    path.to_string_lossy().replace('\\', "/").contains("/node_modules/")
}
