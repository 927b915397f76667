//! Bundle orchestration and coordination.
//!
//! This module provides the main [`Bundler`] orchestrator and the
//! language-specific routines it dispatches to.
//!
//! # Overview
//!
//! A build:
//! 1. Loads `agentuity.yaml` and validates language and runtime
//! 2. Takes the per-project lock and recreates the output directory
//! 3. Installs dependencies when needed and runs the version gate
//! 4. Bundles JavaScript through a [`ModuleBundler`] with the loader and
//!    injection plugins, or describes a Python project in `config.json`
//! 5. Returns a [`BundledArtifact`] with the output size and checksum
//!
//! # Module Organization
//!
//! - [`checksum`] - SHA-256 digest of the output directory
//! - [`defines`] - compile-time substitutions and the agent manifest
//! - [`disk`] - deployment disk size check
//! - [`entry`] - entry point discovery
//! - [`javascript`] / [`python`] - language routines
//! - [`lock`] - per-project build lock
//! - [`orchestrator`] - the [`Bundler`] itself
//! - [`tool_detection`] - external tool availability checking
//! - [`typecheck`] - `tsc --noEmit` before development bundles
//!
//! [`ModuleBundler`]: crate::bundler::host::ModuleBundler

pub mod checksum;
pub mod defines;
pub mod disk;
pub mod entry;
pub mod javascript;
pub mod lock;
mod orchestrator;
pub mod python;
pub mod tool_detection;
pub mod typecheck;

pub use orchestrator::{BundledArtifact, Bundler};
