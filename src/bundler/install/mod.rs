//! Dependency installation.
//!
//! [`planner`] turns the project layout into an [`InstallPlan`] without
//! touching anything; [`runner`] executes a plan as a cancellable child
//! process.

pub mod planner;
pub mod runner;

pub use planner::{InstallPlan, Workspace, find_workspace, needs_install, plan};
pub use runner::run;
