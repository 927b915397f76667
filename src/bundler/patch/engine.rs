//! Rename-and-wrap injection.
//!
//! For a function target, the original declaration is renamed to
//! `__agentuity_<name>` and a wrapper with the public name is appended to the
//! file. The wrapper runs the `before` fragment, calls the original, awaits
//! it when the declaration is `async`, runs the `after` fragment and returns
//! `result`. Class methods get the same treatment, with the wrapper inserted
//! before the class body's closing brace. Body actions wrap the whole file.
//!
//! Targets that cannot be found are skipped and reported; a file with no
//! applicable target is returned byte for byte.

use std::{fmt, path::Path};

use super::{
    PatchAction, PatchModule, RENAME_PREFIX,
    scanner::{self, ScanError, Token, TokenKind},
};
use crate::bundler::{plugins::Loader, registry::Registry};

/// Extensions the engine is willing to rewrite.
const SCRIPT_EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "jsx", "ts", "mts", "cts", "tsx"];

/// Modifiers allowed between the start of a class member and its name.
const METHOD_MODIFIERS: &[&str] = &[
    "static", "async", "get", "set", "public", "private", "protected", "override",
];

/// Why a named target was not patched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NotFound,
    /// `function*` declarations and generator methods.
    Generator,
    /// `get`/`set` accessors.
    Accessor,
    /// The file could not be tokenized, so no declaration boundary is trusted.
    Unscannable(ScanError),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotFound => write!(f, "not found"),
            SkipReason::Generator => write!(f, "is a generator"),
            SkipReason::Accessor => write!(f, "is an accessor"),
            SkipReason::Unscannable(e) => write!(f, "source not scannable: {e}"),
        }
    }
}

/// What happened to each target of the modules applied to a file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchReport {
    /// `key:target` labels that were wrapped.
    pub applied: Vec<String>,
    pub skipped: Vec<(String, SkipReason)>,
}

impl PatchReport {
    fn merge(&mut self, other: PatchReport) {
        self.applied.extend(other.applied);
        self.skipped.extend(other.skipped);
    }
}

/// Rewritten file contents handed back to the bundler.
#[derive(Debug, Clone)]
pub struct PatchedSource {
    pub contents: String,
    pub loader: Loader,
    pub report: PatchReport,
}

struct Edit {
    start: usize,
    end: usize,
    text: String,
}

/// True for files the engine can rewrite, judged by extension.
pub fn is_script(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| SCRIPT_EXTENSIONS.contains(&ext))
}

/// Applies every registered module matching `path` to `contents`.
///
/// Returns `None` when no module matches or the file is not a script.
/// Matching modules apply in catalog order, each on the output of the
/// previous one.
pub fn transform(registry: &Registry, path: &Path, contents: &str) -> Option<PatchedSource> {
    if !is_script(path) {
        return None;
    }
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    let normalized = path.to_string_lossy().replace('\\', "/");

    let mut matched = registry.patches_for(&normalized).peekable();
    matched.peek()?;

    let mut current = contents.to_string();
    let mut report = PatchReport::default();
    for entry in matched {
        log::debug!("re-writing {} for {}", normalized, entry.key);
        let (next, module_report) = apply_module(&entry.key, &entry.module, &current);
        for (target, reason) in &module_report.skipped {
            log::debug!("patch {target} {reason} in {normalized}, passing through");
        }
        current = next;
        report.merge(module_report);
    }

    Some(PatchedSource {
        contents: current,
        loader: Loader::for_script(ext),
        report,
    })
}

/// Applies one module's functions, class methods and body action.
pub fn apply_module(key: &str, module: &PatchModule, contents: &str) -> (String, PatchReport) {
    let mut report = PatchReport::default();
    let label = |target: &str| format!("{key}:{target}");

    let has_targets = !module.functions.is_empty() || !module.classes.is_empty();
    let mut output = if has_targets {
        match scanner::tokenize(contents) {
            Ok(tokens) => patch_declarations(key, module, contents, &tokens, &mut report),
            Err(e) => {
                for (target, _) in module.actions().filter(|(t, _)| t != "<body>") {
                    report
                        .skipped
                        .push((label(&target), SkipReason::Unscannable(e.clone())));
                }
                contents.to_string()
            }
        }
    } else {
        contents.to_string()
    };

    if let Some(body) = &module.body {
        if let Some(before) = body.before.as_deref().filter(|s| !s.is_empty()) {
            output = format!("{before}\n{output}");
        }
        if let Some(after) = body.after.as_deref().filter(|s| !s.is_empty()) {
            output = format!("{output}\n{after}");
        }
        report.applied.push(label("<body>"));
    }

    (output, report)
}

fn patch_declarations(
    key: &str,
    module: &PatchModule,
    src: &str,
    tokens: &[Token],
    report: &mut PatchReport,
) -> String {
    let mut edits = Vec::new();
    let mut suffix = String::new();

    for (name, action) in &module.functions {
        match plan_function(src, tokens, name, action) {
            Ok((mut fn_edits, wrapper)) => {
                edits.append(&mut fn_edits);
                suffix.push_str(&wrapper);
                report.applied.push(format!("{key}:{name}"));
            }
            Err(reason) => report.skipped.push((format!("{key}:{name}"), reason)),
        }
    }

    for (class, methods) in &module.classes {
        let Some((open, close)) = find_class_body(src, tokens, class) else {
            for method in methods.keys() {
                report
                    .skipped
                    .push((format!("{key}:{class}.{method}"), SkipReason::NotFound));
            }
            continue;
        };
        let mut wrappers = String::new();
        for (method, action) in methods {
            match plan_method(src, tokens, open, close, method, action) {
                Ok((rename, wrapper)) => {
                    edits.push(rename);
                    wrappers.push_str(&wrapper);
                    report.applied.push(format!("{key}:{class}.{method}"));
                }
                Err(reason) => report
                    .skipped
                    .push((format!("{key}:{class}.{method}"), reason)),
            }
        }
        if !wrappers.is_empty() {
            let at = tokens[close].start;
            edits.push(Edit {
                start: at,
                end: at,
                text: wrappers,
            });
        }
    }

    if edits.is_empty() {
        return src.to_string();
    }

    let mut output = src.to_string();
    edits.sort_by(|a, b| b.start.cmp(&a.start));
    for edit in edits {
        output.replace_range(edit.start..edit.end, &edit.text);
    }
    if !suffix.is_empty() {
        output.push('\n');
        output.push_str(&suffix);
    }
    output
}

fn line_start(src: &str, offset: usize) -> usize {
    src[..offset].rfind('\n').map_or(0, |i| i + 1)
}

/// Walks back from `idx` over tokens on the same line as `tokens[idx]` whose
/// text is in `allowed`, returning the index of the first one.
fn declaration_prefix(src: &str, tokens: &[Token], idx: usize, allowed: &[&str]) -> usize {
    let start = line_start(src, tokens[idx].start);
    let mut first = idx;
    while first > 0 {
        let prev = &tokens[first - 1];
        let is_modifier = (prev.kind == TokenKind::Ident && allowed.contains(&prev.text(src)))
            || prev.is_punct(src, '*');
        if prev.start < start || !is_modifier {
            break;
        }
        first -= 1;
    }
    first
}

fn prefix_has(src: &str, tokens: &[Token], from: usize, to: usize, word: &str) -> bool {
    tokens[from..to].iter().any(|t| t.is_ident(src, word))
}

fn splice(fragment: Option<&str>, out: &mut String) {
    if let Some(code) = fragment.filter(|c| !c.is_empty()) {
        out.push_str(code);
        out.push('\n');
    }
}

fn plan_function(
    src: &str,
    tokens: &[Token],
    name: &str,
    action: &PatchAction,
) -> Result<(Vec<Edit>, String), SkipReason> {
    let mut generator = false;
    let keyword = (0..tokens.len().saturating_sub(1))
        .find(|&i| {
            if !tokens[i].is_ident(src, "function") {
                return false;
            }
            if tokens[i + 1].is_punct(src, '*') && tokens.get(i + 2).is_some_and(|t| t.is_ident(src, name)) {
                generator = true;
                return false;
            }
            tokens[i + 1].is_ident(src, name)
                && tokens
                    .get(i + 2)
                    .is_some_and(|t| t.is_punct(src, '(') || t.is_punct(src, '<'))
        })
        .ok_or(if generator {
            SkipReason::Generator
        } else {
            SkipReason::NotFound
        })?;
    let name_idx = keyword + 1;

    let first = declaration_prefix(src, tokens, keyword, &["async", "export", "default"]);
    let is_async = prefix_has(src, tokens, first, keyword, "async");
    let mut edits = Vec::new();

    let export = if tokens[first].is_ident(src, "export") {
        let after_export = if tokens[first + 1].is_ident(src, "default") {
            first + 2
        } else {
            first + 1
        };
        edits.push(Edit {
            start: tokens[first].start,
            end: tokens[after_export].start,
            text: String::new(),
        });
        src[tokens[first].start..tokens[after_export].start].to_string()
    } else {
        String::new()
    };

    let renamed = format!("{RENAME_PREFIX}{name}");
    edits.push(Edit {
        start: tokens[name_idx].start,
        end: tokens[name_idx].end,
        text: renamed.clone(),
    });

    let mut wrapper = String::new();
    wrapper.push_str(&export);
    if is_async {
        wrapper.push_str("async ");
    }
    wrapper.push_str(&format!("function {name}(...args) {{\n"));
    wrapper.push_str("\tlet _args = args;\n");
    splice(action.before.as_deref(), &mut wrapper);
    wrapper.push_str(&format!("\tlet result = {renamed}.apply(this, _args);\n"));
    if is_async {
        wrapper.push_str("\tresult = await result;\n");
    }
    splice(action.after.as_deref(), &mut wrapper);
    wrapper.push_str("\treturn result;\n}\n");

    Ok((edits, wrapper))
}

/// Finds `class NAME ... {` and returns the indices of its body braces.
fn find_class_body(src: &str, tokens: &[Token], class: &str) -> Option<(usize, usize)> {
    let class_idx = tokens.windows(2).enumerate().position(|(i, w)| {
        w[0].is_ident(src, "class")
            && w[1].is_ident(src, class)
            && !(i > 0 && tokens[i - 1].is_punct(src, '.'))
    })?;

    let mut depth = 0usize;
    let mut open = None;
    for (idx, token) in tokens.iter().enumerate().skip(class_idx + 2) {
        if token.is_punct(src, '(') || token.is_punct(src, '[') {
            depth += 1;
        } else if token.is_punct(src, ')') || token.is_punct(src, ']') {
            depth = depth.saturating_sub(1);
        } else if depth == 0 && token.is_punct(src, '{') {
            open = Some(idx);
            break;
        }
    }
    let open = open?;
    let close = scanner::matching_close(src, tokens, open)?;
    Some((open, close))
}

fn plan_method(
    src: &str,
    tokens: &[Token],
    open: usize,
    close: usize,
    method: &str,
    action: &PatchAction,
) -> Result<(Edit, String), SkipReason> {
    let mut depth = 0usize;
    let mut found = None;
    for idx in open + 1..close {
        let token = &tokens[idx];
        if token.kind == TokenKind::Punct {
            match src.as_bytes()[token.start] {
                b'(' | b'[' | b'{' => depth += 1,
                b')' | b']' | b'}' => depth = depth.saturating_sub(1),
                _ => {}
            }
            continue;
        }
        if depth != 0 || !token.is_ident(src, method) {
            continue;
        }
        let prev = &tokens[idx - 1];
        if prev.is_punct(src, '.') || prev.is_punct(src, '=') {
            continue;
        }
        if !tokens[idx + 1].is_punct(src, '(') {
            continue;
        }
        let Some(params_close) = scanner::matching_close(src, tokens, idx + 1) else {
            continue;
        };
        match tokens.get(params_close + 1) {
            Some(t) if t.is_punct(src, '{') || t.is_punct(src, ':') => {
                found = Some(idx);
                break;
            }
            _ => continue,
        }
    }
    let name_idx = found.ok_or(SkipReason::NotFound)?;

    let first = declaration_prefix(src, tokens, name_idx, METHOD_MODIFIERS).max(open + 1);
    if tokens[first..name_idx].iter().any(|t| t.is_punct(src, '*')) {
        return Err(SkipReason::Generator);
    }
    if prefix_has(src, tokens, first, name_idx, "get") || prefix_has(src, tokens, first, name_idx, "set") {
        return Err(SkipReason::Accessor);
    }
    let is_async = prefix_has(src, tokens, first, name_idx, "async");
    let is_static = prefix_has(src, tokens, first, name_idx, "static");

    let renamed = format!("{RENAME_PREFIX}{method}");
    let rename = Edit {
        start: tokens[name_idx].start,
        end: tokens[name_idx].end,
        text: renamed.clone(),
    };

    let mut wrapper = String::from("\n\t");
    if is_static {
        wrapper.push_str("static ");
    }
    if is_async {
        wrapper.push_str("async ");
    }
    wrapper.push_str(&format!("{method}(...args) {{\n"));
    wrapper.push_str("\t\tlet _args = args;\n");
    splice(action.before.as_deref(), &mut wrapper);
    wrapper.push_str(&format!("\t\tlet result = this.{renamed}(..._args);\n"));
    if is_async {
        wrapper.push_str("\t\tresult = await result;\n");
    }
    splice(action.after.as_deref(), &mut wrapper);
    wrapper.push_str("\t\treturn result;\n\t}\n");

    Ok((rename, wrapper))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::patch::scanner::check_balance;

    fn fetch_module() -> PatchModule {
        PatchModule::new("node-fetch").function(
            "isAbortSignal",
            PatchAction::after("if (typeof _args[0] === 'object') { return true; }"),
        )
    }

    #[test]
    fn wraps_function_and_renames_original() {
        let src = "const x = 1;\nfunction isAbortSignal(x) { return false; }\n";
        let (out, report) = apply_module("node-fetch", &fetch_module(), src);
        assert!(out.contains("function __agentuity_isAbortSignal(x) { return false; }"));
        assert!(out.contains("function isAbortSignal(...args) {"));
        assert!(out.contains("__agentuity_isAbortSignal.apply(this, _args)"));
        assert_eq!(report.applied, ["node-fetch:isAbortSignal"]);
        check_balance(&out).unwrap();
    }

    #[test]
    fn later_declaration_is_found_after_a_non_declaration_match() {
        let src = "type Guard = typeof function isAbortSignal;\nfunction isAbortSignal(x) { return false; }\n";
        let (out, report) = apply_module("node-fetch", &fetch_module(), src);
        assert!(out.starts_with("type Guard = typeof function isAbortSignal;\n"));
        assert!(out.contains("function __agentuity_isAbortSignal(x) { return false; }"));
        assert_eq!(report.applied, ["node-fetch:isAbortSignal"]);
    }

    #[test]
    fn generator_with_same_name_does_not_hide_the_function() {
        let module = PatchModule::new("m").function("run", PatchAction::before("x();"));
        let src = "function* run() { yield 1; }\nfunction run() { return 2; }\n";
        let (out, report) = apply_module("m", &module, src);
        assert!(out.starts_with("function* run() { yield 1; }\nfunction __agentuity_run() { return 2; }"));
        assert_eq!(report.applied, ["m:run"]);
    }

    #[test]
    fn patching_is_deterministic() {
        let src = "function isAbortSignal(x) { return false; }\n";
        let first = apply_module("k", &fetch_module(), src).0;
        let second = apply_module("k", &fetch_module(), src).0;
        assert_eq!(first, second);
        assert_eq!(first.matches("function isAbortSignal(").count(), 1);
    }

    #[test]
    fn async_wrapper_awaits_before_after_fragment() {
        let module = PatchModule::new("ai").function(
            "generateText",
            PatchAction::after("console.log(result);"),
        );
        let src = "export async function generateText(opts) { return opts; }\n";
        let (out, _) = apply_module("ai", &module, src);
        let await_at = out.find("result = await result;").unwrap();
        let after_at = out.find("console.log(result);").unwrap();
        assert!(await_at < after_at);
        assert!(out.contains("export async function generateText(...args)"));
        assert!(out.starts_with("async function __agentuity_generateText(opts)"));
    }

    #[test]
    fn sync_wrapper_does_not_await() {
        let src = "  function isAbortSignal(x) { return false; }\n";
        let (out, _) = apply_module("k", &fetch_module(), src);
        assert!(!out.contains("await"));
        assert!(!out.contains("async"));
    }

    #[test]
    fn async_on_previous_line_is_not_a_marker() {
        let src = "const async = 1;\nfunction isAbortSignal(x) { return false; }\n";
        let (out, _) = apply_module("k", &fetch_module(), src);
        assert!(!out.contains("await"));
    }

    #[test]
    fn missing_target_is_byte_identical() {
        let src = "function somethingElse() {}\n// function isAbortSignal(x)\nconst s = 'function isAbortSignal(';\n";
        let (out, report) = apply_module("k", &fetch_module(), src);
        assert_eq!(out, src);
        assert_eq!(report.skipped, [("k:isAbortSignal".to_string(), SkipReason::NotFound)]);
        assert!(report.applied.is_empty());
    }

    #[test]
    fn generators_are_skipped() {
        let module = PatchModule::new("m").function("gen", PatchAction::before("x();"));
        let src = "function* gen() { yield 1; }\n";
        let (out, report) = apply_module("m", &module, src);
        assert_eq!(out, src);
        assert_eq!(report.skipped[0].1, SkipReason::Generator);
    }

    #[test]
    fn unscannable_source_skips_declarations_but_keeps_body() {
        let module = PatchModule::new("m")
            .function("f", PatchAction::before("x();"))
            .body(PatchAction::before("guard();"));
        let src = "function f() { const s = 'oops; }\n";
        let (out, report) = apply_module("m", &module, src);
        assert_eq!(out, format!("guard();\n{src}"));
        assert!(matches!(report.skipped[0].1, SkipReason::Unscannable(_)));
    }

    #[test]
    fn body_action_wraps_file() {
        let module = PatchModule::new("openai")
            .body(PatchAction::before("setup();").and_after("teardown();"));
        let (out, _) = apply_module("openai", &module, "module();");
        assert_eq!(out, "setup();\nmodule();\nteardown();");
    }

    #[test]
    fn class_method_is_wrapped_inside_class() {
        let module = PatchModule::new("@opentelemetry/sdk-trace-base").method(
            "Span",
            "setAttribute",
            PatchAction::before("const key = args[0];"),
        );
        let src = r#"class Span {
    constructor() { this.attributes = {}; }
    setAttribute(key, value) {
        this.attributes[key] = value;
        return this;
    }
    other() { return this.setAttribute('a', '}'); }
}
export { Span };
"#;
        let (out, report) = apply_module("otel", &module, src);
        assert_eq!(report.applied, ["otel:Span.setAttribute"]);
        assert!(out.contains("__agentuity_setAttribute(key, value) {"));
        assert!(out.contains("this.setAttribute('a', '}')"));
        assert!(out.contains("let result = this.__agentuity_setAttribute(..._args);"));
        let wrapper_at = out.find("setAttribute(...args)").unwrap();
        let export_at = out.find("export { Span }").unwrap();
        assert!(wrapper_at < export_at);
        check_balance(&out).unwrap();
    }

    #[test]
    fn static_async_methods_keep_modifiers() {
        let module = PatchModule::new("m").method("Client", "connect", PatchAction::default());
        let src = "class Client extends Base {\n  static async connect(url) { return url; }\n}\n";
        let (out, _) = apply_module("m", &module, src);
        assert!(out.contains("static async __agentuity_connect(url)"));
        assert!(out.contains("\tstatic async connect(...args) {"));
        assert!(out.contains("result = await result;"));
    }

    #[test]
    fn accessors_are_skipped() {
        let module = PatchModule::new("m").method("A", "value", PatchAction::default());
        let src = "class A {\n  get value() { return 1; }\n}\n";
        let (out, report) = apply_module("m", &module, src);
        assert_eq!(out, src);
        assert_eq!(report.skipped[0].1, SkipReason::Accessor);
    }
}
