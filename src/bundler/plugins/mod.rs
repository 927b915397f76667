//! Resolve/load hooks run while the external bundler walks the module graph.
//!
//! The model follows esbuild's plugin API: a [`Plugin`] registers hooks on a
//! [`PluginBuild`] during setup, each hook filtered by a path regex and an
//! optional namespace. A [`PluginHost`] owns the registered hooks and answers
//! the bundler's callbacks. A hook that returns `None` defers to the next
//! matching hook, then to the bundler's default behavior.

pub mod declarations;
pub mod inject;
pub mod loaders;

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::bundler::Result;

/// Namespace esbuild uses for files on disk.
pub const FILE_NAMESPACE: &str = "file";

/// How the bundler should interpret returned contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Loader {
    Js,
    Ts,
    Jsx,
    Tsx,
    Json,
    Text,
}

impl Loader {
    /// Loader for a script file extension: typed for `.ts`, `.mts`, `.cts`.
    pub fn for_script(ext: &str) -> Self {
        match ext {
            "ts" | "mts" | "cts" => Loader::Ts,
            _ => Loader::Js,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveArgs {
    pub path: String,
    #[serde(default)]
    pub importer: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub resolve_dir: String,
    #[serde(default)]
    pub kind: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveResult {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default)]
    pub external: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadArgs {
    pub path: String,
    #[serde(default)]
    pub namespace: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadResult {
    pub contents: String,
    pub loader: Loader,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolve_dir: Option<String>,
}

impl LoadResult {
    pub fn new(contents: impl Into<String>, loader: Loader) -> Self {
        Self {
            contents: contents.into(),
            loader,
            resolve_dir: None,
        }
    }
}

pub type ResolveCallback<'a> = Box<dyn Fn(&ResolveArgs) -> Result<Option<ResolveResult>> + Send + Sync + 'a>;
pub type LoadCallback<'a> = Box<dyn Fn(&LoadArgs) -> Result<Option<LoadResult>> + Send + Sync + 'a>;

/// Whether a hook answers resolve or load callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookKind {
    Resolve,
    Load,
}

/// Filter of one registered hook, as announced to the bundler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookFilter {
    pub id: usize,
    pub kind: HookKind,
    pub plugin: String,
    pub filter: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

struct Hook<C> {
    plugin: String,
    filter: Regex,
    namespace: Option<String>,
    callback: C,
}

impl<C> Hook<C> {
    fn applies(&self, path: &str, namespace: &str) -> bool {
        let ns_ok = match &self.namespace {
            Some(ns) => ns == namespace || (namespace.is_empty() && ns == FILE_NAMESPACE),
            None => true,
        };
        ns_ok && self.filter.is_match(path)
    }
}

/// A unit of resolve/load behavior.
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    /// Registers the plugin's hooks. Callbacks may borrow the plugin.
    fn setup<'a>(&'a self, build: &mut PluginBuild<'a>) -> Result<()>;
}

/// Collects hooks while plugins are set up.
pub struct PluginBuild<'a> {
    current: String,
    resolve: Vec<Hook<ResolveCallback<'a>>>,
    load: Vec<Hook<LoadCallback<'a>>>,
}

impl<'a> PluginBuild<'a> {
    pub fn on_resolve<F>(&mut self, filter: &str, namespace: Option<&str>, callback: F) -> Result<()>
    where
        F: Fn(&ResolveArgs) -> Result<Option<ResolveResult>> + Send + Sync + 'a,
    {
        self.resolve.push(Hook {
            plugin: self.current.clone(),
            filter: Regex::new(filter)?,
            namespace: namespace.map(str::to_string),
            callback: Box::new(callback),
        });
        Ok(())
    }

    pub fn on_load<F>(&mut self, filter: &str, namespace: Option<&str>, callback: F) -> Result<()>
    where
        F: Fn(&LoadArgs) -> Result<Option<LoadResult>> + Send + Sync + 'a,
    {
        self.load.push(Hook {
            plugin: self.current.clone(),
            filter: Regex::new(filter)?,
            namespace: namespace.map(str::to_string),
            callback: Box::new(callback),
        });
        Ok(())
    }
}

/// Registered hooks of every plugin, in registration order.
pub struct PluginHost<'a> {
    resolve: Vec<Hook<ResolveCallback<'a>>>,
    load: Vec<Hook<LoadCallback<'a>>>,
}

impl fmt::Debug for PluginHost<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginHost")
            .field("resolve_hooks", &self.resolve.len())
            .field("load_hooks", &self.load.len())
            .finish()
    }
}

impl<'a> PluginHost<'a> {
    /// Runs every plugin's setup in order.
    pub fn new(plugins: &'a [Box<dyn Plugin + 'a>]) -> Result<Self> {
        let mut build = PluginBuild {
            current: String::new(),
            resolve: Vec::new(),
            load: Vec::new(),
        };
        for plugin in plugins {
            build.current = plugin.name().to_string();
            plugin.setup(&mut build)?;
            log::trace!("plugin {} registered", plugin.name());
        }
        Ok(Self {
            resolve: build.resolve,
            load: build.load,
        })
    }

    /// Filters of all hooks. Resolve and load ids are independent sequences.
    pub fn filters(&self) -> Vec<HookFilter> {
        let resolve = self.resolve.iter().enumerate().map(|(id, h)| HookFilter {
            id,
            kind: HookKind::Resolve,
            plugin: h.plugin.clone(),
            filter: h.filter.as_str().to_string(),
            namespace: h.namespace.clone(),
        });
        let load = self.load.iter().enumerate().map(|(id, h)| HookFilter {
            id,
            kind: HookKind::Load,
            plugin: h.plugin.clone(),
            filter: h.filter.as_str().to_string(),
            namespace: h.namespace.clone(),
        });
        resolve.chain(load).collect()
    }

    /// Invokes one resolve hook by id.
    pub fn call_resolve(&self, id: usize, args: &ResolveArgs) -> Result<Option<ResolveResult>> {
        match self.resolve.get(id) {
            Some(hook) => (hook.callback)(args),
            None => crate::bail!("unknown resolve hook {id}"),
        }
    }

    /// Invokes one load hook by id.
    pub fn call_load(&self, id: usize, args: &LoadArgs) -> Result<Option<LoadResult>> {
        match self.load.get(id) {
            Some(hook) => (hook.callback)(args),
            None => crate::bail!("unknown load hook {id}"),
        }
    }

    /// First answer among the resolve hooks matching `args`.
    pub fn resolve(&self, args: &ResolveArgs) -> Result<Option<ResolveResult>> {
        for hook in self.resolve.iter().filter(|h| h.applies(&args.path, &args.namespace)) {
            if let Some(result) = (hook.callback)(args)? {
                return Ok(Some(result));
            }
        }
        Ok(None)
    }

    /// First answer among the load hooks matching `args`.
    pub fn load(&self, args: &LoadArgs) -> Result<Option<LoadResult>> {
        for hook in self.load.iter().filter(|h| h.applies(&args.path, &args.namespace)) {
            if let Some(result) = (hook.callback)(args)? {
                log::trace!("{} loaded {}", hook.plugin, args.path);
                return Ok(Some(result));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Upper;

    impl Plugin for Upper {
        fn name(&self) -> &str {
            "upper"
        }

        fn setup<'a>(&'a self, build: &mut PluginBuild<'a>) -> Result<()> {
            build.on_load(r"\.up$", Some(FILE_NAMESPACE), |args| {
                Ok(Some(LoadResult::new(args.path.to_uppercase(), Loader::Text)))
            })?;
            build.on_load(r".*", None, |_| Ok(None))
        }
    }

    fn plugins() -> Vec<Box<dyn Plugin>> {
        vec![Box::new(Upper)]
    }

    #[test]
    fn first_matching_hook_answers() {
        let plugins = plugins();
        let host = PluginHost::new(&plugins).unwrap();
        let loaded = host
            .load(&LoadArgs {
                path: "/a/b.up".into(),
                namespace: "file".into(),
            })
            .unwrap()
            .unwrap();
        assert_eq!(loaded.contents, "/A/B.UP");
        assert!(
            host.load(&LoadArgs {
                path: "/a/b.js".into(),
                namespace: "file".into(),
            })
            .unwrap()
            .is_none()
        );
    }

    #[test]
    fn namespace_must_match() {
        let plugins = plugins();
        let host = PluginHost::new(&plugins).unwrap();
        let other_ns = LoadArgs {
            path: "/a/b.up".into(),
            namespace: "yaml".into(),
        };
        assert!(host.load(&other_ns).unwrap().is_none());
    }

    #[test]
    fn filters_are_announced_with_ids() {
        let plugins = plugins();
        let host = PluginHost::new(&plugins).unwrap();
        let filters = host.filters();
        assert_eq!(filters.len(), 2);
        assert_eq!(filters[0].filter, r"\.up$");
        assert_eq!(filters[1].id, 1);
        assert!(host.call_load(7, &LoadArgs::default()).is_err());
    }

    #[test]
    fn loader_tracks_script_extension() {
        assert_eq!(Loader::for_script("ts"), Loader::Ts);
        assert_eq!(Loader::for_script("mts"), Loader::Ts);
        assert_eq!(Loader::for_script("mjs"), Loader::Js);
        assert_eq!(serde_json::to_string(&Loader::Ts).unwrap(), "\"ts\"");
    }
}
