//! Agent project build pipeline.
//!
//! The pipeline plans and runs dependency installs, gates builds on the
//! installed SDK version, and bundles JavaScript projects through an external
//! module bundler while patching selected dependencies at load time.
//!
//! # Module Organization
//!
//! - [`builder`] - the [`Bundler`] orchestrator and language routines
//! - [`diagnostics`] - build error presentation
//! - [`host`] - the module bundler seam and the esbuild host
//! - [`install`] - install planning and execution
//! - [`patch`] - the dependency injection engine and its catalog
//! - [`plugins`] - resolve/load plugins run by the module bundler
//! - [`registry`] - patch and breaking-change catalogs
//! - [`settings`] - per-build context
//! - [`version`] - the SDK version gate

pub mod builder;
pub mod diagnostics;
pub mod error;
pub mod host;
pub mod install;
pub mod patch;
pub mod plugins;
pub mod registry;
pub mod settings;
pub mod utils;
pub mod version;

pub use builder::{BundledArtifact, Bundler};
pub use error::{Error, Result};
pub use host::{BuildMessage, BuildOptions, BuildOutput, EsbuildHost, ModuleBundler};
pub use registry::Registry;
pub use settings::{
    BundleContext, BundleContextBuilder, FixedAnswer, Language, OUTPUT_DIR_NAME, Prompter, Runtime,
    TerminalPrompter,
};
