//! Patch and breaking-change catalogs.
//!
//! A [`Registry`] is built once at process start (normally through
//! [`Registry::builtin`]) and then only read. Builds borrow it.

use std::collections::BTreeMap;

use regex::Regex;
use thiserror::Error;

use crate::bundler::{
    patch::{self, PatchModule, scanner::ScanError},
    version::{self, BreakingChange},
};

/// Rejected catalog registrations.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("patch '{0}' is already registered")]
    DuplicatePatch(String),

    #[error("patch '{key}' has an unbalanced fragment for {target}: {source}")]
    UnbalancedFragment {
        key: String,
        target: String,
        #[source]
        source: ScanError,
    },

    #[error("patch '{key}' has an invalid file filter: {source}")]
    InvalidFilter {
        key: String,
        #[source]
        source: regex::Error,
    },

    #[error("breaking change '{title}' has an invalid version constraint: {source}")]
    InvalidConstraint {
        title: String,
        #[source]
        source: semver::Error,
    },
}

/// A patch module together with its catalog key and compiled path filter.
#[derive(Debug)]
pub struct RegisteredPatch {
    pub key: String,
    pub module: PatchModule,
    filter: Regex,
}

impl RegisteredPatch {
    pub fn filter(&self) -> &Regex {
        &self.filter
    }

    pub fn matches(&self, path: &str) -> bool {
        self.filter.is_match(path)
    }
}

#[derive(Debug, Default)]
pub struct Registry {
    patches: BTreeMap<String, RegisteredPatch>,
    breaking_changes: Vec<BreakingChange>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the compiled-in patch and breaking-change catalogs.
    pub fn builtin() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        patch::catalog::register_all(&mut registry)?;
        version::catalog::register_all(&mut registry)?;
        log::debug!(
            "registry ready: {} patch modules, {} breaking changes",
            registry.patches.len(),
            registry.breaking_changes.len()
        );
        Ok(registry)
    }

    /// Adds a patch module under `key`.
    ///
    /// # Errors
    ///
    /// * [`RegistryError::DuplicatePatch`] if `key` is taken.
    /// * [`RegistryError::UnbalancedFragment`] if any fragment fails the balance check.
    /// * [`RegistryError::InvalidFilter`] if the filename pattern is not a valid regex.
    pub fn register_patch(
        &mut self,
        key: impl Into<String>,
        module: PatchModule,
    ) -> Result<(), RegistryError> {
        let key = key.into();
        if self.patches.contains_key(&key) {
            return Err(RegistryError::DuplicatePatch(key));
        }
        for (target, action) in module.actions() {
            for fragment in action.fragments() {
                patch::scanner::check_balance(fragment).map_err(|source| {
                    RegistryError::UnbalancedFragment {
                        key: key.clone(),
                        target: target.clone(),
                        source,
                    }
                })?;
            }
        }
        let filter = Regex::new(&module.filter()).map_err(|source| RegistryError::InvalidFilter {
            key: key.clone(),
            source,
        })?;
        self.patches.insert(
            key.clone(),
            RegisteredPatch {
                key,
                module,
                filter,
            },
        );
        Ok(())
    }

    /// Appends a breaking-change record. Records are evaluated in insertion order.
    pub fn register_breaking_change(&mut self, change: BreakingChange) -> Result<(), RegistryError> {
        change
            .requirement()
            .map_err(|source| RegistryError::InvalidConstraint {
                title: change.title.clone(),
                source,
            })?;
        self.breaking_changes.push(change);
        Ok(())
    }

    /// Patch modules in key order.
    pub fn patches(&self) -> impl Iterator<Item = &RegisteredPatch> {
        self.patches.values()
    }

    /// Patch modules whose filter matches `path`, in key order.
    pub fn patches_for<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a RegisteredPatch> + 'a {
        self.patches.values().filter(move |p| p.matches(path))
    }

    pub fn patch(&self, key: &str) -> Option<&RegisteredPatch> {
        self.patches.get(key)
    }

    pub fn breaking_changes(&self) -> &[BreakingChange] {
        &self.breaking_changes
    }
}
