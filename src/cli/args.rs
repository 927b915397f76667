//! Command line argument parsing and validation.
//!
//! This module provides CLI argument parsing using clap, with environment
//! variable fallbacks for the settings a wrapping tool usually injects.

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use crate::bundler::host::esbuild::DEFAULT_HOST_COMMAND;

/// Build pipeline for agent projects
#[derive(Parser, Debug)]
#[command(
    name = "agentuity-bundle",
    version,
    about = "Build pipeline for agent projects",
    long_about = "Installs dependencies, checks the installed SDK for known breaking changes and bundles an agent project into .agentuity/.

Usage:
  agentuity-bundle bundle
  agentuity-bundle bundle --dir ./my-agent --production --ci
  agentuity-bundle bundle --install --log-level debug

Exit code 0 = bundle written, 2 = the bundler reported build errors, 1 = any other failure."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Log level (error, warn, info, debug, trace). Overrides RUST_LOG.
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<log::LevelFilter>,

    /// Print verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Bundle the project for deployment
    Bundle(BundleArgs),
}

#[derive(ClapArgs, Debug, Clone)]
pub struct BundleArgs {
    /// Force a dependency install even when dependencies are present
    #[arg(long)]
    pub install: bool,

    /// Build with production defines and skip the type check
    #[arg(long)]
    pub production: bool,

    /// Use CI install flags (frozen lockfiles, verbose output)
    #[arg(long)]
    pub ci: bool,

    /// Dev-server mode: skip the disk size check and never prompt
    #[arg(long, hide = true)]
    pub dev: bool,

    /// Project root containing agentuity.yaml
    #[arg(long, env = "AGENTUITY_PROJECT_DIR", value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Command used to run the esbuild host script
    #[arg(long, env = "AGENTUITY_BUNDLER_HOST", default_value = DEFAULT_HOST_COMMAND, value_name = "CMD")]
    pub bundler_host: String,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl BundleArgs {
    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.bundler_host.trim().is_empty() {
            return Err("--bundler-host cannot be empty".to_string());
        }
        if let Some(dir) = &self.dir
            && dir.as_os_str().is_empty()
        {
            return Err("--dir cannot be empty".to_string());
        }
        Ok(())
    }

    /// Project directory, defaulting to the current directory.
    pub fn project_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Output manager for colored terminal output
    output: super::OutputManager,
}

impl From<&Args> for RuntimeConfig {
    fn from(args: &Args) -> Self {
        Self {
            output: super::OutputManager::new(args.verbose, args.quiet),
        }
    }
}

impl RuntimeConfig {
    /// Get a reference to the output manager
    pub fn output(&self) -> &super::OutputManager {
        &self.output
    }
}
