//! Install command selection.
//!
//! The plan is a total function of `(runtime, lockfile, ci, workspace)`:
//!
//! | runtime | lockfile probe           | command                                         |
//! |---------|--------------------------|-------------------------------------------------|
//! | nodejs  | `yarn.lock`              | `yarn install --frozen-lockfile`                |
//! | nodejs  | `package-lock.json`/none | `npm install --no-audit --no-fund --omit=dev --ignore-scripts` |
//! | bunjs   | `bun.lockb` › `bun.lock` | `bun install --production --ignore-scripts` + quiet flags |
//! | pnpm    | `pnpm-lock.yaml`         | `pnpm install --prod --ignore-scripts --silent` |
//! | uv      | `uv.lock`                | `uv sync --no-dev --frozen --quiet --no-progress` |

use std::{
    fmt,
    path::{Path, PathBuf},
};

use serde_json::Value;

use crate::bundler::{Language, Result, Runtime};

/// Marker files that make a directory a JavaScript workspace root.
const PNPM_WORKSPACE_FILE: &str = "pnpm-workspace.yaml";

/// Command to run, with its arguments and working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPlan {
    pub command: String,
    pub args: Vec<String>,
    /// Directory the command runs in: the project itself or its workspace root.
    pub dir: PathBuf,
}

impl fmt::Display for InstallPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// A monorepo root that owns the project's dependency tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    pub root: PathBuf,
    /// Project directory relative to `root`, forward-slash separated.
    pub member: String,
}

fn lockfiles(runtime: Runtime) -> &'static [&'static str] {
    match runtime {
        Runtime::NodeJs => &["yarn.lock", "package-lock.json"],
        Runtime::BunJs => &["bun.lockb", "bun.lock"],
        Runtime::Pnpm => &["pnpm-lock.yaml"],
        Runtime::Uv => &["uv.lock"],
    }
}

fn probe(dir: &Path, runtime: Runtime) -> Option<&'static str> {
    lockfiles(runtime)
        .iter()
        .copied()
        .find(|name| dir.join(name).is_file())
}

fn declares_workspaces(dir: &Path) -> bool {
    if dir.join(PNPM_WORKSPACE_FILE).is_file() {
        return true;
    }
    std::fs::read_to_string(dir.join("package.json"))
        .ok()
        .and_then(|s| serde_json::from_str::<Value>(&s).ok())
        .is_some_and(|pkg| pkg.get("workspaces").is_some())
}

/// Finds the closest ancestor of `project_dir` that is a workspace root.
pub fn find_workspace(project_dir: &Path) -> Option<Workspace> {
    project_dir.ancestors().skip(1).find_map(|dir| {
        if !declares_workspaces(dir) {
            return None;
        }
        let member = project_dir
            .strip_prefix(dir)
            .ok()?
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        Some(Workspace {
            root: dir.to_path_buf(),
            member,
        })
    })
}

/// True when dependencies must be installed before bundling.
pub fn needs_install(project_dir: &Path, language: Language, force: bool) -> bool {
    if force {
        return true;
    }
    match language {
        Language::JavaScript => !project_dir.join("node_modules").is_dir(),
        Language::Python => !project_dir.join(".venv").join("lib").is_dir(),
    }
}

fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

/// Computes the install command for `runtime_name` in `project_dir`.
///
/// # Errors
///
/// Returns [`Error::UnsupportedRuntime`](crate::bundler::Error::UnsupportedRuntime)
/// for a runtime outside the table.
pub fn plan(project_dir: &Path, runtime_name: &str, ci: bool) -> Result<InstallPlan> {
    let runtime: Runtime = runtime_name.parse()?;

    let mut dir = project_dir.to_path_buf();
    let mut lockfile = probe(project_dir, runtime);
    let mut workspace = None;
    if lockfile.is_none() && runtime.language() == Language::JavaScript {
        if let Some(ws) = find_workspace(project_dir) {
            if let Some(found) = probe(&ws.root, runtime) {
                log::debug!(
                    "using {found} from workspace root {} for member {}",
                    ws.root.display(),
                    ws.member
                );
                lockfile = Some(found);
                dir = ws.root.clone();
                workspace = Some(ws);
            }
        }
    }

    let (command, mut args) = match (runtime, lockfile) {
        (Runtime::NodeJs, Some("yarn.lock")) => ("yarn", strings(&["install", "--frozen-lockfile"])),
        (Runtime::NodeJs, _) => (
            "npm",
            strings(&["install", "--no-audit", "--no-fund", "--omit=dev", "--ignore-scripts"]),
        ),
        (Runtime::BunJs, _) => {
            let mut args = strings(&["install", "--production", "--ignore-scripts"]);
            if ci {
                args.extend(strings(&["--verbose", "--no-cache"]));
                if lockfile.is_some() {
                    args.push("--frozen-lockfile".into());
                }
            } else {
                args.extend(strings(&["--no-progress", "--no-summary", "--silent"]));
            }
            ("bun", args)
        }
        (Runtime::Pnpm, _) => {
            let mut args = strings(&["install", "--prod", "--ignore-scripts"]);
            if ci {
                args.extend(strings(&["--reporter=append-only", "--frozen-lockfile"]));
            } else {
                args.push("--silent".into());
            }
            ("pnpm", args)
        }
        (Runtime::Uv, Some(_)) => ("uv", strings(&["sync", "--no-dev", "--frozen", "--quiet", "--no-progress"])),
        (Runtime::Uv, None) => ("uv", strings(&["sync", "--no-dev", "--quiet", "--no-progress"])),
    };

    if let Some(ws) = &workspace {
        match command {
            "npm" => args.push(format!("--workspace={}", ws.member)),
            "pnpm" | "bun" => {
                args.push("--filter".into());
                args.push(format!("./{}", ws.member));
            }
            _ => {}
        }
    }

    Ok(InstallPlan {
        command: command.to_string(),
        args,
        dir,
    })
}
