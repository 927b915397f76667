use semver::Version;

use super::{BreakingChange, is_prerelease, sdk};
use crate::bundler::{BundleContext, Error, Language, Result, Runtime, registry::Registry};

/// Checks the installed SDK against the registry's breaking-change records.
///
/// Only the first record matching `runtime` and the installed version is
/// honoured. Returns `Ok(())` when nothing matches or the SDK is a pre-release.
///
/// # Errors
///
/// * [`Error::SdkVersionUnresolvable`] when the SDK version cannot be read.
/// * [`Error::BreakingChangeBlock`] when a record matches and no migration ran.
/// * [`Error::MigrationApplied`] after an accepted migration; the caller must
///   stop and re-run the build.
pub fn check(
    ctx: &BundleContext,
    registry: &Registry,
    language: Language,
    runtime: Runtime,
) -> Result<()> {
    log::trace!("checking for breaking changes in {language}, runtime: {runtime}");
    let version = sdk::sdk_version(language, ctx.project_dir())?;
    check_version(ctx, registry.breaking_changes(), runtime, &version)
}

pub(super) fn check_version(
    ctx: &BundleContext,
    changes: &[BreakingChange],
    runtime: Runtime,
    version: &Version,
) -> Result<()> {
    if is_prerelease(version) {
        log::debug!("SDK {version} is a pre-release, skipping breaking change checks");
        return Ok(());
    }

    let Some(change) = changes.iter().find(|c| c.matches(runtime, version)) else {
        log::debug!("SDK {version} has no known breaking changes for {runtime}");
        return Ok(());
    };
    log::debug!(
        "SDK {version} matches breaking change '{}' ({})",
        change.title,
        change.constraint.trim()
    );

    let block = || Error::BreakingChangeBlock {
        title: change.title.clone(),
        message: change.message.clone(),
    };

    match (&change.migration, ctx.interactive()) {
        (Some(migration), true) => {
            ctx.output().banner(&change.title, &change.message)?;
            if ctx
                .prompter()
                .confirm("Would you like to migrate your project now?", true)
            {
                migration(ctx)?;
                ctx.output().success("Project migrated")?;
                Err(Error::MigrationApplied {
                    title: change.title.clone(),
                })
            } else {
                Err(block())
            }
        }
        (None, true) => {
            ctx.output().banner(&change.title, &change.message)?;
            Err(block())
        }
        (_, false) => {
            log::error!("{}", change.message);
            Err(block())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::{BundleContextBuilder, FixedAnswer, version::catalog};
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    fn context(interactive: bool, answer: bool) -> BundleContext {
        let (output, _) = crate::cli::OutputManager::buffered();
        BundleContextBuilder::new()
            .project_dir("/nonexistent/project")
            .interactive(interactive)
            .output(output)
            .prompter(Arc::new(FixedAnswer(answer)))
            .build()
            .unwrap()
    }

    fn builtin() -> Vec<BreakingChange> {
        let mut registry = Registry::new();
        catalog::register_all(&mut registry).unwrap();
        registry.breaking_changes().to_vec()
    }

    #[test]
    fn old_node_sdk_is_blocked_non_interactively() {
        let ctx = context(false, true);
        let err = check_version(&ctx, &builtin(), Runtime::NodeJs, &Version::new(0, 0, 80)).unwrap_err();
        assert!(matches!(err, Error::BreakingChangeBlock { .. }));
        assert!(err.to_string().starts_with("migration required: "));
        assert!(err.to_string().contains("AgentRequest"));
    }

    #[test]
    fn beta_and_rc_builds_are_still_gated() {
        let ctx = context(false, true);
        for raw in ["0.0.80-beta", "0.0.80-rc.1", "0.0.80-alpha.2"] {
            let err = check_version(&ctx, &builtin(), Runtime::NodeJs, &Version::parse(raw).unwrap()).unwrap_err();
            assert!(matches!(err, Error::BreakingChangeBlock { .. }), "{raw}");
        }
    }

    #[test]
    fn pre_tag_after_other_identifiers_bypasses_the_gate() {
        let ctx = context(false, false);
        let version = Version::parse("0.0.80-canary.pre1").unwrap();
        assert!(check_version(&ctx, &builtin(), Runtime::NodeJs, &version).is_ok());
    }

    #[test]
    fn current_sdk_passes() {
        let ctx = context(false, false);
        assert!(check_version(&ctx, &builtin(), Runtime::BunJs, &Version::new(0, 0, 130)).is_ok());
    }

    #[test]
    fn prerelease_bypasses_every_record() {
        let ctx = context(false, false);
        let version = Version::parse("0.0.50-pre.2").unwrap();
        assert!(check_version(&ctx, &builtin(), Runtime::NodeJs, &version).is_ok());
    }

    #[test]
    fn only_the_first_matching_record_runs() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let (f, s) = (first.clone(), second.clone());
        let changes = vec![
            BreakingChange::new(Runtime::Uv, "<1.0.0", "Other runtime", "ignored"),
            BreakingChange::new(Runtime::NodeJs, "<0.2.0", "First", "first").with_migration(move |_| {
                f.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
            BreakingChange::new(Runtime::NodeJs, "<0.3.0", "Second", "second").with_migration(move |_| {
                s.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        ];
        let ctx = context(true, true);
        let err = check_version(&ctx, &changes, Runtime::NodeJs, &Version::new(0, 1, 0)).unwrap_err();
        assert!(matches!(err, Error::MigrationApplied { ref title } if title == "First"));
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn declined_migration_blocks() {
        let ran = Arc::new(AtomicUsize::new(0));
        let r = ran.clone();
        let changes = vec![BreakingChange::new(Runtime::BunJs, "<0.0.115", "Key rename", "rename").with_migration(
            move |_| {
                r.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
        )];
        let ctx = context(true, false);
        let err = check_version(&ctx, &changes, Runtime::BunJs, &Version::new(0, 0, 110)).unwrap_err();
        assert!(matches!(err, Error::BreakingChangeBlock { .. }));
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn interactive_record_without_migration_shows_banner() {
        let (output, captured) = crate::cli::OutputManager::buffered();
        let ctx = BundleContextBuilder::new()
            .project_dir("/nonexistent/project")
            .interactive(true)
            .output(output)
            .prompter(Arc::new(FixedAnswer(true)))
            .build()
            .unwrap();
        let err = check_version(&ctx, &builtin(), Runtime::Uv, &Version::new(0, 0, 81)).unwrap_err();
        assert!(matches!(err, Error::BreakingChangeBlock { .. }));
        assert!(captured.contents().contains("Python SDK Breaking Changes"));
    }

    #[test]
    fn unresolvable_sdk_is_fatal() {
        let ctx = context(false, false);
        let registry = Registry::new();
        assert!(matches!(
            check(&ctx, &registry, Language::JavaScript, Runtime::NodeJs),
            Err(Error::SdkVersionUnresolvable { .. })
        ));
    }
}
