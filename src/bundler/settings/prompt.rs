//! Interactive confirmation prompts.

use std::io::{self, BufRead, Write};

/// Asks the user yes/no questions during a build.
pub trait Prompter: Send + Sync {
    /// Returns the user's answer, or `default_yes` when the reply is empty.
    fn confirm(&self, question: &str, default_yes: bool) -> bool;
}

/// Prompts on stderr and reads the answer from stdin.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn confirm(&self, question: &str, default_yes: bool) -> bool {
        let hint = if default_yes { "[Y/n]" } else { "[y/N]" };
        let mut stderr = io::stderr();
        if write!(stderr, "{question} {hint} ").and_then(|_| stderr.flush()).is_err() {
            return false;
        }
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        match answer.trim().to_ascii_lowercase().as_str() {
            "" => default_yes,
            "y" | "yes" => true,
            _ => false,
        }
    }
}

/// Answers every question the same way. Used for scripted sessions and tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

impl Prompter for FixedAnswer {
    fn confirm(&self, question: &str, _default_yes: bool) -> bool {
        log::debug!("auto-answering {:?} with {}", question, self.0);
        self.0
    }
}
