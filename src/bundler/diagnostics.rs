//! Build error presentation with source context.

use std::{fmt::Write as _, io, path::Path};

use crate::{bundler::host::BuildMessage, cli::OutputManager};

/// Lines of source shown on each side of the offending line.
const CONTEXT_LINES: usize = 3;

/// Renders one bundler message as a `file:line:column` pointer followed by
/// the surrounding source lines and a caret under the reported column.
pub fn format_message(project_dir: &Path, message: &BuildMessage) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "error: {}", message.text);

    if let Some(location) = &message.location {
        let file = Path::new(&location.file);
        let display = file.strip_prefix(project_dir).unwrap_or(file);
        if location.column > 0 {
            let _ = writeln!(
                out,
                "  --> {}:{}:{}",
                display.display(),
                location.line,
                location.column
            );
        } else {
            let _ = writeln!(out, "  --> {}:{}", display.display(), location.line);
        }

        let source = std::fs::read_to_string(project_dir.join(file)).ok();
        if let Some(source) = source {
            let lines: Vec<&str> = source.lines().collect();
            let target = location.line.saturating_sub(1);
            let first = target.saturating_sub(CONTEXT_LINES);
            let last = (target + CONTEXT_LINES).min(lines.len().saturating_sub(1));
            let width = (last + 1).to_string().len();
            if first <= last && target < lines.len() {
                for (index, line) in lines.iter().enumerate().take(last + 1).skip(first) {
                    let _ = writeln!(out, "{:>width$} | {line}", index + 1);
                    if index == target && location.column > 0 {
                        let _ = writeln!(out, "{:>width$} | {}^", "", " ".repeat(location.column));
                    }
                }
            }
        }
        out.push('\n');
    }

    out.push_str("note: JavaScript build failed\n");
    out
}

/// Prints the build failure banner and every error message.
pub fn report_build_errors(output: &OutputManager, project_dir: &Path, errors: &[BuildMessage]) -> io::Result<()> {
    output.raw("\n")?;
    output.warn("Build Failed")?;
    output.raw("\n")?;
    for message in errors {
        output.raw(&format_message(project_dir, message))?;
        output.raw("\n")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::host::Location;

    fn located(file: &str, line: usize, column: usize) -> BuildMessage {
        BuildMessage {
            text: "Expected \";\" but found \"}\"".into(),
            location: Some(Location {
                file: file.into(),
                line,
                column,
                line_text: String::new(),
            }),
        }
    }

    #[test]
    fn shows_context_and_caret() {
        let dir = tempfile::tempdir().unwrap();
        let source: String = (1..=10).map(|n| format!("line {n}\n")).collect();
        std::fs::write(dir.path().join("index.ts"), source).unwrap();

        let text = format_message(dir.path(), &located("index.ts", 5, 2));
        assert!(text.starts_with("error: Expected \";\""));
        assert!(text.contains("  --> index.ts:5:2\n"));
        assert!(text.contains("\n2 | line 2\n"));
        assert!(!text.contains("line 1\n"));
        assert!(text.contains("\n5 | line 5\n  |   ^\n"));
        assert!(text.contains("\n8 | line 8\n"));
        assert!(!text.contains("line 9"));
        assert!(text.ends_with("note: JavaScript build failed\n"));
    }

    #[test]
    fn absolute_paths_are_shown_relative() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/a.js"), "let = 1;\n").unwrap();
        let file = dir.path().join("src/a.js");
        let text = format_message(dir.path(), &located(&file.to_string_lossy(), 1, 0));
        assert!(text.contains("  --> src/a.js:1\n"));
        assert!(text.contains("1 | let = 1;\n"));
        assert!(!text.contains('^'));
    }

    #[test]
    fn message_without_location() {
        let text = format_message(Path::new("/p"), &BuildMessage::new("Could not resolve \"x\""));
        assert_eq!(text, "error: Could not resolve \"x\"\nnote: JavaScript build failed\n");
    }
}
