//! Language and runtime identifiers declared by a project.

use std::{fmt, str::FromStr};

use crate::bundler::Error;

/// Source language of an agent project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    JavaScript,
    Python,
}

impl Language {
    /// Canonical name used by the breaking-change catalog and log output.
    pub fn as_str(self) -> &'static str {
        match self {
            Language::JavaScript => "javascript",
            Language::Python => "python",
        }
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "js" | "javascript" | "typescript" => Ok(Language::JavaScript),
            "py" | "python" => Ok(Language::Python),
            other => Err(Error::UnsupportedLanguage(other.to_string())),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Package-manager runtime used to install and run the project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Runtime {
    NodeJs,
    BunJs,
    Pnpm,
    Uv,
}

impl Runtime {
    pub fn as_str(self) -> &'static str {
        match self {
            Runtime::NodeJs => "nodejs",
            Runtime::BunJs => "bunjs",
            Runtime::Pnpm => "pnpm",
            Runtime::Uv => "uv",
        }
    }

    /// Language family the runtime belongs to.
    pub fn language(self) -> Language {
        match self {
            Runtime::NodeJs | Runtime::BunJs | Runtime::Pnpm => Language::JavaScript,
            Runtime::Uv => Language::Python,
        }
    }
}

impl FromStr for Runtime {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nodejs" => Ok(Runtime::NodeJs),
            "bunjs" => Ok(Runtime::BunJs),
            "pnpm" => Ok(Runtime::Pnpm),
            "uv" => Ok(Runtime::Uv),
            other => Err(Error::UnsupportedRuntime(other.to_string())),
        }
    }
}

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
