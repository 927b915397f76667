//! Configuration structures for a bundle invocation.
//!
//! This module provides the per-build [`BundleContext`], its builder, the
//! language/runtime identifiers and the prompt abstraction used by the
//! version gate.

mod builder;
mod context;
mod prompt;
mod runtime;

pub use builder::BundleContextBuilder;
pub use context::{BundleContext, OUTPUT_DIR_NAME};
pub use prompt::{FixedAnswer, Prompter, TerminalPrompter};
pub use runtime::{Language, Runtime};
