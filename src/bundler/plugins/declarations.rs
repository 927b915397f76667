//! Ambient TypeScript declarations for the asset importers.
//!
//! The declaration files carry a `// agentuity-types-hash:<sha256>` first
//! line. A file whose header already names the current hash is left alone,
//! so repeated builds do not touch `node_modules`.

use std::{
    fs,
    io::Read,
    path::{Path, PathBuf},
};

use sha2::{Digest, Sha256};

use crate::bundler::{Result, error::ErrorExt};

const HASH_PREFIX: &str = "// agentuity-types-hash:";
const FILE_TYPES_IMPORT: &str = "import './file_types';";

const ASSET_MODULES: &[(&str, &str)] = &[
    ("yml", "any"),
    ("yaml", "any"),
    ("json", "any"),
    ("png", "Uint8Array"),
    ("gif", "Uint8Array"),
    ("jpg", "Uint8Array"),
    ("jpeg", "Uint8Array"),
    ("svg", "Uint8Array"),
    ("webp", "Uint8Array"),
    ("pdf", "Uint8Array"),
    ("txt", "string"),
    ("md", "string"),
    ("csv", "string"),
    ("xml", "string"),
    ("sql", "string"),
];

/// `declare module '*.ext'` blocks for every imported asset extension.
pub fn declaration() -> String {
    let mut out = String::from("\n");
    for (ext, ty) in ASSET_MODULES {
        out.push_str(&format!(
            "declare module '*.{ext}' {{\n  const value: {ty};\n  export default value;\n}}\n\n"
        ));
    }
    out.truncate(out.len() - 1);
    out
}

pub fn declaration_hash(declaration: &str) -> String {
    hex::encode(Sha256::digest(declaration.as_bytes()))
}

/// True unless `path` starts with a hash header naming `expected_hash`.
pub fn needs_update(path: &Path, expected_hash: &str) -> bool {
    let Ok(file) = fs::File::open(path) else {
        return true;
    };
    let mut head = Vec::with_capacity(100);
    if file.take(100).read_to_end(&mut head).is_err() || head.is_empty() {
        return true;
    }
    let head = String::from_utf8_lossy(&head);
    let first = head.lines().next().unwrap_or_default().trim();
    first.strip_prefix(HASH_PREFIX) != Some(expected_hash)
}

fn types_path(project_dir: &Path) -> PathBuf {
    project_dir.join("node_modules/@types/agentuity/index.d.ts")
}

fn sdk_dist(project_dir: &Path) -> PathBuf {
    project_dir.join("node_modules/@agentuity/sdk/dist")
}

/// Writes the ambient declarations and hooks them into the SDK's typings.
///
/// Returns `true` when any file was written.
///
/// # Errors
///
/// Fails when a declaration file cannot be written. A failure to patch the
/// SDK's `index.d.ts` is only logged.
pub fn ensure_declarations(project_dir: &Path) -> Result<bool> {
    let declaration = declaration();
    let hash = declaration_hash(&declaration);
    let contents = format!("{HASH_PREFIX}{hash}\n{declaration}");

    let mut written = false;
    for path in [types_path(project_dir), sdk_dist(project_dir).join("file_types.d.ts")] {
        if !needs_update(&path, &hash) {
            continue;
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).fs_context("creating declaration directory", parent)?;
        }
        fs::write(&path, &contents).fs_context("writing declaration file", &path)?;
        log::debug!("updated declaration file at {}", path.display());
        written = true;
    }
    if !written {
        log::debug!("declaration files are up to date");
        return Ok(false);
    }

    let index = sdk_dist(project_dir).join("index.d.ts");
    if let Ok(current) = fs::read_to_string(&index)
        && let Some(updated) = insert_file_types_import(&current)
    {
        match fs::write(&index, updated) {
            Ok(()) => log::debug!("patched SDK index.d.ts to include file_types import"),
            Err(e) => log::debug!("failed to patch SDK index.d.ts: {e}"),
        }
    }
    Ok(true)
}

fn is_export(line: &str) -> bool {
    line.trim_start().starts_with("export ")
}

/// Adds `import './file_types';` to an SDK `index.d.ts`.
///
/// The import goes after the first export re-exporting a relative module,
/// otherwise before the first non-export line, otherwise at the end.
/// Returns `None` when the import is already present.
pub fn insert_file_types_import(contents: &str) -> Option<String> {
    if contents.contains("import './file_types'") || contents.contains("import \"./file_types\"") {
        return None;
    }
    let mut lines: Vec<&str> = contents.split('\n').collect();
    let relative_export = lines
        .iter()
        .position(|l| is_export(l) && (l.contains("from './") || l.contains("from \"./")));
    let at = match relative_export {
        Some(i) => i + 1,
        None => lines.iter().position(|l| !is_export(l)).unwrap_or(lines.len()),
    };
    lines.insert(at, FILE_TYPES_IMPORT);
    Some(lines.join("\n"))
}
