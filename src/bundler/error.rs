//! Error taxonomy for the build pipeline.
//!
//! Every fatal condition bubbles up to the orchestrator as one of these
//! variants. Patch targets that cannot be found are deliberately absent: the
//! injection engine logs them and passes the file through.

use std::{
    fmt::Display,
    io,
    path::{Path, PathBuf},
};

use thiserror::Error;

use crate::bundler::{host::BuildMessage, registry::RegistryError};

/// Result alias used throughout the bundler module.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while planning, gating or running a build.
#[derive(Debug, Error)]
pub enum Error {
    /// Free-form failure, usually produced by [`bail!`](crate::bail).
    #[error("{0}")]
    GenericError(String),

    /// I/O failure annotated with the operation and the path involved.
    #[error("{context} ({}): {source}", .path.display())]
    Fs {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid version: {0}")]
    Semver(#[from] semver::Error),

    #[error("invalid filter: {0}")]
    Regex(#[from] regex::Error),

    #[error("path error: {0}")]
    StripPrefix(#[from] std::path::StripPrefixError),

    #[error("directory walk failed: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// Catalog registration rejected an entry.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The project declares a runtime the planner has no table entry for.
    #[error("unsupported runtime: {0}")]
    UnsupportedRuntime(String),

    /// The project declares a language without a build routine.
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// `agentuity.yaml` is missing required values or cannot be read.
    #[error("invalid project configuration in {}: {reason}", .path.display())]
    InvalidProject { path: PathBuf, reason: String },

    /// The dependency install subprocess exited unsuccessfully.
    #[error("failed to install dependencies ({}): {output}", describe_exit(.exit_code))]
    InstallFailure {
        command: String,
        exit_code: Option<i32>,
        output: String,
    },

    /// The bundler reported one or more errors.
    #[error("build failed with {} error(s)", .messages.len())]
    BuildFailed { messages: Vec<BuildMessage> },

    /// A breaking-change record matched and no migration was accepted.
    #[error("migration required: {title}. {message}")]
    BreakingChangeBlock { title: String, message: String },

    /// A migration callback rewrote project files; the build must be re-run.
    #[error("migration applied for {title}. Re-run the build to validate the migrated project")]
    MigrationApplied { title: String },

    /// The installed SDK version could not be read from its manifest.
    #[error("cannot resolve the installed SDK version: {reason}")]
    SdkVersionUnresolvable { reason: String },

    /// The external bundler process misbehaved (spawn failure, protocol error).
    #[error("bundler host error: {0}")]
    Host(String),

    /// The cancellation scope fired while a subprocess was running.
    #[error("build cancelled")]
    Cancelled,
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}

impl Error {
    /// Returns true for errors that a dev-server loop can retry on the next change.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::BuildFailed { .. })
    }
}

/// Attaches filesystem context to I/O results.
pub trait ErrorExt<T> {
    /// Wraps an I/O error with the operation being performed and its path.
    fn fs_context(self, context: &'static str, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, io::Error> {
    fn fs_context(self, context: &'static str, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|source| Error::Fs {
            context,
            path: path.as_ref().to_path_buf(),
            source,
        })
    }
}

/// Converts options and foreign results into [`Error::GenericError`].
pub trait Context<T> {
    fn context<C: Display>(self, context: C) -> Result<T>;
}

impl<T> Context<T> for Option<T> {
    fn context<C: Display>(self, context: C) -> Result<T> {
        self.ok_or_else(|| Error::GenericError(context.to_string()))
    }
}

impl<T, E: Display> Context<T> for std::result::Result<T, E> {
    fn context<C: Display>(self, context: C) -> Result<T> {
        self.map_err(|e| Error::GenericError(format!("{context}: {e}")))
    }
}

/// Returns early with a formatted [`Error::GenericError`].
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::bundler::Error::GenericError(format!($($arg)*)))
    };
}
