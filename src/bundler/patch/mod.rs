//! Build-time source patching of third-party dependencies.
//!
//! A [`PatchModule`] names a dependency package and the code to splice into
//! it. The [`engine`] applies matching modules to a file's contents as the
//! bundler loads it; nothing is ever written back to the dependency tree.

pub mod catalog;
pub mod engine;
pub mod scanner;
pub mod snippets;

use std::collections::BTreeMap;

pub use engine::{PatchReport, PatchedSource, SkipReason, apply_module, is_script, transform};

/// Prefix given to renamed originals so the wrapper can take over the public name.
pub const RENAME_PREFIX: &str = "__agentuity_";

/// Code spliced before and/or after a patched target.
///
/// Each fragment must be a balanced statement sequence. Function and method
/// fragments run inside the generated wrapper, where `_args` holds the
/// (rewritable) argument list and `result` the value returned by the original.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchAction {
    pub before: Option<String>,
    pub after: Option<String>,
}

impl PatchAction {
    pub fn before(code: impl Into<String>) -> Self {
        Self {
            before: Some(code.into()),
            after: None,
        }
    }

    pub fn after(code: impl Into<String>) -> Self {
        Self {
            before: None,
            after: Some(code.into()),
        }
    }

    pub fn and_after(mut self, code: impl Into<String>) -> Self {
        self.after = Some(code.into());
        self
    }

    /// Non-empty fragments of this action.
    pub fn fragments(&self) -> impl Iterator<Item = &str> {
        [self.before.as_deref(), self.after.as_deref()]
            .into_iter()
            .flatten()
            .filter(|f| !f.trim().is_empty())
    }
}

/// Transformations for one dependency package.
#[derive(Debug, Clone, Default)]
pub struct PatchModule {
    /// Package id as it appears under `node_modules/`, e.g. `@ai-sdk/openai`.
    pub module: String,
    /// Optional regex narrowing the match to files inside the package.
    pub filename: Option<String>,
    pub functions: BTreeMap<String, PatchAction>,
    /// Class name to method name to action.
    pub classes: BTreeMap<String, BTreeMap<String, PatchAction>>,
    /// Whole-file prepend/append.
    pub body: Option<PatchAction>,
}

impl PatchModule {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            ..Default::default()
        }
    }

    pub fn filename(mut self, pattern: impl Into<String>) -> Self {
        self.filename = Some(pattern.into());
        self
    }

    pub fn function(mut self, name: impl Into<String>, action: PatchAction) -> Self {
        self.functions.insert(name.into(), action);
        self
    }

    pub fn method(
        mut self,
        class: impl Into<String>,
        method: impl Into<String>,
        action: PatchAction,
    ) -> Self {
        self.classes
            .entry(class.into())
            .or_default()
            .insert(method.into(), action);
        self
    }

    pub fn body(mut self, action: PatchAction) -> Self {
        self.body = Some(action);
        self
    }

    /// Regex source matched against forward-slash normalized file paths.
    ///
    /// The package id is matched literally; the filename part is a regex.
    pub fn filter(&self) -> String {
        let module = regex::escape(&self.module);
        match &self.filename {
            Some(filename) => format!("node_modules/{module}/{filename}.*"),
            None => format!("node_modules/{module}/.*"),
        }
    }

    /// Every action of this module with a label naming its target.
    pub fn actions(&self) -> impl Iterator<Item = (String, &PatchAction)> {
        let functions = self.functions.iter().map(|(name, a)| (name.clone(), a));
        let methods = self.classes.iter().flat_map(|(class, methods)| {
            methods
                .iter()
                .map(move |(method, a)| (format!("{class}.{method}"), a))
        });
        let body = self.body.iter().map(|a| ("<body>".to_string(), a));
        functions.chain(methods).chain(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_escapes_package_id() {
        let module = PatchModule::new("@opentelemetry/sdk-trace-base");
        let re = regex::Regex::new(&module.filter()).unwrap();
        assert!(re.is_match("/p/node_modules/@opentelemetry/sdk-trace-base/build/src/Span.js"));
        assert!(!re.is_match("/p/node_modules/@opentelemetry/sdk-trace-node/build/index.js"));
    }

    #[test]
    fn filename_narrows_filter() {
        let module = PatchModule::new("node-fetch").filename("lib/index");
        let re = regex::Regex::new(&module.filter()).unwrap();
        assert!(re.is_match("/p/node_modules/node-fetch/lib/index.mjs"));
        assert!(!re.is_match("/p/node_modules/node-fetch/src/body.js"));
    }

    #[test]
    fn actions_label_targets() {
        let module = PatchModule::new("x")
            .function("f", PatchAction::before("a();"))
            .method("C", "m", PatchAction::after("b();"))
            .body(PatchAction::before("c();"));
        let labels: Vec<_> = module.actions().map(|(l, _)| l).collect();
        assert_eq!(labels, ["f", "C.m", "<body>"]);
    }

    #[test]
    fn empty_fragments_are_ignored() {
        let action = PatchAction::before("  ").and_after("done();");
        assert_eq!(action.fragments().collect::<Vec<_>>(), ["done();"]);
    }
}
