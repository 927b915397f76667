//! Build pipeline for agent projects.
//!
//! This library plans and runs dependency installs, blocks builds against
//! SDK versions with known breaking changes, and bundles JavaScript agents
//! with esbuild while rewriting selected dependencies at load time so their
//! API calls go through the gateway.
//!
//! It can be used both as a CLI tool and as a library dependency.

pub mod bundler;
pub mod cli;
pub mod error;
pub mod metadata;

// Re-export commonly used types
pub use error::{BundlerError, CliError, Result};
