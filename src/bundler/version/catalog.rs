//! Built-in breaking-change records, in evaluation order.

use super::BreakingChange;
use crate::bundler::{
    BundleContext, Result, Runtime,
    error::ErrorExt,
    registry::{Registry, RegistryError},
};

const JS_TITLE: &str = "🚫 JS SDK Breaking Change 🚫";
const PY_TITLE: &str = "🚫 Python SDK Breaking Changes 🚫";

const ASYNC_REQUEST_JS: &str = "The JS SDK type signatures for AgentRequest have changed to be async functions. \
Please see the v0.0.106 Changelog for how to update your code.\n\n\
https://agentuity.dev/Changelog/sdk-js#v00106\n\n";

const ASYNC_REQUEST_PY: &str = "The Python SDK type signatures for AgentRequest have changed to be async functions. \
Please see the v0.0.82 Changelog for how to update your code.\n\n\
https://agentuity.dev/Changelog/sdk-py#v0082\n\n\
Please run `uv add agentuity -U`, fix your types and ensure your code passes type checking and then re-run this command again.";

const SDK_KEY_RENAME: &str = "The environment variable and code reference for your Agentuity API key has changed \
from AGENTUITY_API_KEY to AGENTUITY_SDK_KEY. Update all occurrences in your .env files and codebase. ";

/// Replaces every `from` with `to` in the listed project files that exist.
pub fn rename_env_key(
    files: &'static [&'static str],
    from: &'static str,
    to: &'static str,
) -> impl Fn(&BundleContext) -> Result<()> + Send + Sync + 'static {
    move |ctx| {
        for name in files {
            let path = ctx.project_dir().join(name);
            if !path.is_file() {
                continue;
            }
            let contents = std::fs::read_to_string(&path).fs_context("reading file to migrate", &path)?;
            let updated = contents.replace(from, to);
            if updated != contents {
                std::fs::write(&path, updated).fs_context("writing migrated file", &path)?;
                log::info!("migrated {} ({from} -> {to})", path.display());
            }
        }
        Ok(())
    }
}

pub fn register_all(registry: &mut Registry) -> std::result::Result<(), RegistryError> {
    let js_key_files: &'static [&'static str] = &["index.ts", ".env"];
    let py_key_files: &'static [&'static str] = &["server.py", ".env"];

    let records = [
        BreakingChange::new(
            Runtime::BunJs,
            "<0.0.106",
            JS_TITLE,
            format!(
                "{ASYNC_REQUEST_JS}Please bun update @agentuity/sdk --latest, fix your types and ensure your code passes type checking and then re-run this command again."
            ),
        ),
        BreakingChange::new(
            Runtime::NodeJs,
            "<0.0.106",
            JS_TITLE,
            format!(
                "{ASYNC_REQUEST_JS}Please npm upgrade @agentuity/sdk, fix your types and ensure your code passes type checking and then re-run this command again."
            ),
        ),
        BreakingChange::new(Runtime::Uv, "<0.0.82", PY_TITLE, ASYNC_REQUEST_PY),
        BreakingChange::new(
            Runtime::BunJs,
            "<0.0.115",
            JS_TITLE,
            format!(
                "{SDK_KEY_RENAME}See the v0.0.115 Changelog for details.\n\nhttps://agentuity.dev/Changelog/sdk-js#v00115\n\n\
                 After migrating, please run bun update @agentuity/sdk --latest and then re-run this command again."
            ),
        )
        .with_migration(rename_env_key(js_key_files, "AGENTUITY_API_KEY", "AGENTUITY_SDK_KEY")),
        BreakingChange::new(
            Runtime::NodeJs,
            "<0.0.115 ",
            JS_TITLE,
            format!(
                "{SDK_KEY_RENAME}See the v0.0.115 Changelog for details.\n\nhttps://agentuity.dev/Changelog/sdk-js#v00115\n\n\
                 After migrating, please run npm upgrade @agentuity/sdk and then re-run this command again."
            ),
        )
        .with_migration(rename_env_key(js_key_files, "AGENTUITY_API_KEY", "AGENTUITY_SDK_KEY")),
        BreakingChange::new(
            Runtime::Uv,
            "<0.0.84",
            PY_TITLE,
            format!(
                "{SDK_KEY_RENAME}See the v0.0.84 Changelog for details.\n\nhttps://agentuity.dev/Changelog/sdk-py#v0084\n\n\
                 After migrating, please run `uv add agentuity -U` and then re-run this command again."
            ),
        )
        .with_migration(rename_env_key(py_key_files, "AGENTUITY_API_KEY", "AGENTUITY_SDK_KEY")),
    ];

    for record in records {
        registry.register_breaking_change(record)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::BundleContextBuilder;
    use semver::Version;
    use std::fs;

    #[test]
    fn records_are_in_evaluation_order() {
        let mut registry = Registry::new();
        register_all(&mut registry).unwrap();
        let changes = registry.breaking_changes();
        let node: Vec<_> = changes
            .iter()
            .filter(|c| c.matches(Runtime::NodeJs, &Version::new(0, 0, 100)))
            .collect();
        assert_eq!(node.len(), 2);
        assert!(node[0].migration.is_none());
        assert!(node[1].migration.is_some());
        assert!(changes.iter().filter(|c| c.runtime == Runtime::Pnpm).count() == 0);
    }

    #[test]
    fn migration_renames_key_in_listed_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".env"), "AGENTUITY_API_KEY=abc\n").unwrap();
        fs::write(dir.path().join("index.ts"), "process.env.AGENTUITY_API_KEY;\n").unwrap();
        fs::write(dir.path().join("other.ts"), "AGENTUITY_API_KEY\n").unwrap();
        let ctx = BundleContextBuilder::new()
            .project_dir(dir.path())
            .interactive(false)
            .build()
            .unwrap();

        rename_env_key(&["index.ts", ".env", "missing.ts"], "AGENTUITY_API_KEY", "AGENTUITY_SDK_KEY")(&ctx).unwrap();

        assert_eq!(fs::read_to_string(dir.path().join(".env")).unwrap(), "AGENTUITY_SDK_KEY=abc\n");
        assert_eq!(
            fs::read_to_string(dir.path().join("index.ts")).unwrap(),
            "process.env.AGENTUITY_SDK_KEY;\n"
        );
        assert_eq!(fs::read_to_string(dir.path().join("other.ts")).unwrap(), "AGENTUITY_API_KEY\n");
    }
}
