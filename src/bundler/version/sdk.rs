//! Installed SDK version resolution.

use std::path::{Path, PathBuf};

use semver::Version;
use serde::Deserialize;

use crate::bundler::{Error, Language, Result, error::ErrorExt};

/// Package name of the JavaScript SDK.
pub const JS_SDK_PACKAGE: &str = "@agentuity/sdk";
/// Package name of the Python SDK inside `uv.lock`.
pub const PY_SDK_PACKAGE: &str = "agentuity";

#[derive(Debug, Deserialize)]
struct PackageManifest {
    #[serde(default)]
    version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UvLock {
    #[serde(default, rename = "package")]
    packages: Vec<UvPackage>,
}

#[derive(Debug, Deserialize)]
struct UvPackage {
    name: String,
    #[serde(default)]
    version: Option<String>,
}

fn unresolvable(reason: impl Into<String>) -> Error {
    Error::SdkVersionUnresolvable {
        reason: reason.into(),
    }
}

/// Walks up from `start` to the first `node_modules/@agentuity/sdk/package.json`.
pub fn find_js_sdk_manifest(start: &Path) -> Option<PathBuf> {
    start.ancestors().find_map(|dir| {
        let candidate = dir
            .join("node_modules")
            .join("@agentuity")
            .join("sdk")
            .join("package.json");
        if candidate.is_file() {
            log::debug!("found {JS_SDK_PACKAGE} manifest at {}", candidate.display());
            Some(candidate)
        } else {
            log::trace!("no {JS_SDK_PACKAGE} manifest under {}", dir.display());
            None
        }
    })
}

/// Reads the `version` field of a `package.json`.
pub fn read_manifest_version(manifest: &Path) -> Result<String> {
    let contents = std::fs::read_to_string(manifest).fs_context("reading package manifest", manifest)?;
    let parsed: PackageManifest = serde_json::from_str(&contents)?;
    parsed
        .version
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| unresolvable(format!("{} has no version field", manifest.display())))
}

/// Parses a version, padding `1` and `1.2` to three components.
pub fn parse_lenient(raw: &str) -> Result<Version> {
    let raw = raw.trim().trim_start_matches('v');
    if let Ok(version) = Version::parse(raw) {
        return Ok(version);
    }
    let (core, rest) = match raw.find(['-', '+']) {
        Some(i) => raw.split_at(i),
        None => (raw, ""),
    };
    let mut parts: Vec<&str> = core.split('.').collect();
    while parts.len() < 3 {
        parts.push("0");
    }
    Version::parse(&format!("{}{rest}", parts.join("."))).map_err(Error::from)
}

fn js_sdk_version(project_dir: &Path) -> Result<Version> {
    let manifest = find_js_sdk_manifest(project_dir).ok_or_else(|| {
        unresolvable(format!(
            "{JS_SDK_PACKAGE} is not installed in {} or any parent directory",
            project_dir.display()
        ))
    })?;
    let raw = read_manifest_version(&manifest)?;
    parse_lenient(&raw).map_err(|e| unresolvable(format!("{}: {e}", manifest.display())))
}

fn python_sdk_version(project_dir: &Path) -> Result<Version> {
    let lockfile = project_dir.join("uv.lock");
    if !lockfile.is_file() {
        return Err(unresolvable(format!("uv.lock not found: {}", lockfile.display())));
    }
    let contents = std::fs::read_to_string(&lockfile).fs_context("reading lockfile", &lockfile)?;
    let lock: UvLock = toml::from_str(&contents)?;
    let raw = lock
        .packages
        .into_iter()
        .filter(|p| p.name == PY_SDK_PACKAGE)
        .filter_map(|p| p.version)
        // Local builds carry `+local` metadata and are not published versions.
        .find(|v| !v.contains('+'))
        .ok_or_else(|| unresolvable(format!("{PY_SDK_PACKAGE} package not found in uv.lock")))?;
    parse_lenient(&raw).map_err(|e| unresolvable(format!("uv.lock: {e}")))
}

/// Resolves the installed SDK version for `language`.
///
/// # Errors
///
/// Returns [`Error::SdkVersionUnresolvable`] when the manifest or lockfile
/// entry is missing or carries an unparsable version.
pub fn sdk_version(language: Language, project_dir: &Path) -> Result<Version> {
    match language {
        Language::JavaScript => js_sdk_version(project_dir),
        Language::Python => python_sdk_version(project_dir),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_sdk(root: &Path, version: &str) {
        let dir = root.join("node_modules/@agentuity/sdk");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("package.json"), format!(r#"{{"name":"@agentuity/sdk","version":"{version}"}}"#)).unwrap();
    }

    #[test]
    fn resolves_js_version_from_ancestor() {
        let root = tempfile::tempdir().unwrap();
        write_sdk(root.path(), "0.0.120");
        let project = root.path().join("apps/agent");
        fs::create_dir_all(&project).unwrap();
        let version = sdk_version(Language::JavaScript, &project).unwrap();
        assert_eq!(version, Version::new(0, 0, 120));
    }

    #[test]
    fn missing_js_manifest_is_unresolvable() {
        let root = tempfile::tempdir().unwrap();
        assert!(matches!(
            sdk_version(Language::JavaScript, root.path()),
            Err(Error::SdkVersionUnresolvable { .. })
        ));
    }

    #[test]
    fn python_version_skips_local_builds() {
        let root = tempfile::tempdir().unwrap();
        fs::write(
            root.path().join("uv.lock"),
            r#"version = 1

[[package]]
name = "agentuity"
version = "0.0.90+local"

[[package]]
name = "httpx"
version = "0.27.0"

[[package]]
name = "agentuity"
version = "0.0.83"
"#,
        )
        .unwrap();
        let version = sdk_version(Language::Python, root.path()).unwrap();
        assert_eq!(version, Version::new(0, 0, 83));
    }

    #[test]
    fn lenient_parsing_pads_components() {
        assert_eq!(parse_lenient("1.2").unwrap(), Version::new(1, 2, 0));
        assert_eq!(parse_lenient("v3").unwrap(), Version::new(3, 0, 0));
        assert_eq!(parse_lenient("0.1-pre.1").unwrap().pre.as_str(), "pre.1");
        assert!(parse_lenient("not-a-version").is_err());
    }
}
