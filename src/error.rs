//! Crate-level error types for the command line surface.
//!
//! Pipeline failures arrive as [`crate::bundler::Error`] and are wrapped
//! here together with argument and I/O errors. Only the binary turns an
//! error into a process exit code.

use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, BundlerError>;

/// Exit code reserved for builds whose bundler reported errors.
pub const BUILD_FAILED_EXIT_CODE: i32 = 2;

/// Main error type of the command line surface
#[derive(Error, Debug)]
pub enum BundlerError {
    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Build pipeline errors
    #[error("{0}")]
    Bundler(#[from] crate::bundler::Error),

    /// Generic errors from anyhow
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// The project directory does not exist
    #[error("project directory not found: {}", .path.display())]
    ProjectNotFound {
        /// Directory that was given
        path: std::path::PathBuf,
    },
}

impl BundlerError {
    /// Process exit code for this error.
    ///
    /// Build failures use [`BUILD_FAILED_EXIT_CODE`]; everything else is `1`.
    pub fn exit_code(&self) -> i32 {
        match self {
            BundlerError::Bundler(crate::bundler::Error::BuildFailed { .. }) => BUILD_FAILED_EXIT_CODE,
            _ => 1,
        }
    }

    /// True when the build errors have already been printed with context.
    pub fn is_reported(&self) -> bool {
        matches!(self, BundlerError::Bundler(crate::bundler::Error::BuildFailed { .. }))
    }

    /// Actionable hints shown after the error message.
    pub fn recovery_suggestions(&self) -> Vec<String> {
        use crate::bundler::Error as E;
        match self {
            BundlerError::Bundler(E::InvalidProject { .. }) | BundlerError::Cli(CliError::ProjectNotFound { .. }) => {
                vec!["Run the command from an agentuity project or pass --dir".to_string()]
            }
            BundlerError::Bundler(E::InstallFailure { .. }) => {
                vec!["Re-run with --install after fixing the dependency error above".to_string()]
            }
            BundlerError::Bundler(E::MigrationApplied { .. }) => {
                vec!["Run the build again to validate the migrated project".to_string()]
            }
            BundlerError::Bundler(E::Host(_)) => {
                vec!["Make sure node and esbuild are installed, or set --bundler-host".to_string()]
            }
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::{BuildMessage, Error};

    #[test]
    fn build_failures_use_the_reserved_exit_code() {
        let failed = BundlerError::from(Error::BuildFailed {
            messages: vec![BuildMessage::new("boom")],
        });
        assert_eq!(failed.exit_code(), BUILD_FAILED_EXIT_CODE);
        assert!(failed.is_reported());

        let blocked = BundlerError::from(Error::BreakingChangeBlock {
            title: "t".into(),
            message: "m".into(),
        });
        assert_eq!(blocked.exit_code(), 1);
        assert!(!blocked.is_reported());
        assert_eq!(BundlerError::from(anyhow::anyhow!("x")).exit_code(), 1);
    }
}
