//! Colored terminal output for user-facing messages.
//!
//! Logging goes through the `log` facade; this manager is for the banners,
//! build error listings and success lines a user is meant to read.

use cyrup_termcolor::{Color, ColorChoice, ColorSpec, NoColor, StandardStream, WriteColor};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

type Sink = Arc<Mutex<Box<dyn WriteColor + Send>>>;

/// Output manager shared by the CLI and the build pipeline.
#[derive(Clone)]
pub struct OutputManager {
    sink: Sink,
    verbose: bool,
    quiet: bool,
}

impl std::fmt::Debug for OutputManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputManager")
            .field("verbose", &self.verbose)
            .field("quiet", &self.quiet)
            .finish()
    }
}

/// In-memory capture of everything written through a buffered manager.
#[derive(Clone, Default)]
pub struct CapturedOutput(Arc<Mutex<Vec<u8>>>);

impl CapturedOutput {
    /// Returns everything written so far as lossy UTF-8.
    pub fn contents(&self) -> String {
        let buf = self.0.lock().unwrap_or_else(|e| e.into_inner());
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl Write for CapturedOutput {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut buf = self.0.lock().unwrap_or_else(|e| e.into_inner());
        buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl OutputManager {
    /// Creates a manager writing to stderr, colored when the terminal supports it.
    pub fn new(verbose: bool, quiet: bool) -> Self {
        let stream: Box<dyn WriteColor + Send> = Box::new(StandardStream::stderr(ColorChoice::Auto));
        Self {
            sink: Arc::new(Mutex::new(stream)),
            verbose,
            quiet,
        }
    }

    /// Creates an uncolored manager whose output can be inspected afterwards.
    pub fn buffered() -> (Self, CapturedOutput) {
        let captured = CapturedOutput::default();
        let stream: Box<dyn WriteColor + Send> = Box::new(NoColor::new(captured.clone()));
        let manager = Self {
            sink: Arc::new(Mutex::new(stream)),
            verbose: true,
            quiet: false,
        };
        (manager, captured)
    }

    fn write_colored(&self, color: Option<Color>, bold: bool, message: &str) -> io::Result<()> {
        let mut sink = self.sink.lock().unwrap_or_else(|e| e.into_inner());
        let mut spec = ColorSpec::new();
        spec.set_fg(color).set_bold(bold);
        sink.set_color(&spec)?;
        write!(sink, "{message}")?;
        sink.reset()?;
        writeln!(sink)?;
        sink.flush()
    }

    /// Writes raw text without styling or trailing newline handling.
    pub fn raw(&self, message: &str) -> io::Result<()> {
        let mut sink = self.sink.lock().unwrap_or_else(|e| e.into_inner());
        write!(sink, "{message}")?;
        sink.flush()
    }

    pub fn verbose(&self, message: &str) -> io::Result<()> {
        if self.verbose && !self.quiet {
            self.write_colored(None, false, message)?;
        }
        Ok(())
    }

    pub fn success(&self, message: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        self.write_colored(Some(Color::Green), false, &format!("✓ {message}"))
    }

    pub fn warn(&self, message: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        self.write_colored(Some(Color::Yellow), true, message)
    }

    /// Errors are printed even in quiet mode.
    pub fn error(&self, message: &str) -> io::Result<()> {
        self.write_colored(Some(Color::Red), true, message)
    }

    pub fn progress(&self, message: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        self.write_colored(Some(Color::Cyan), false, message)
    }

    pub fn indent(&self, message: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        self.write_colored(None, false, &format!("  {message}"))
    }

    /// Prints a framed banner used for blocking notices such as breaking changes.
    pub fn banner(&self, title: &str, body: &str) -> io::Result<()> {
        let width = body
            .lines()
            .chain(std::iter::once(title))
            .map(|l| l.chars().count())
            .max()
            .unwrap_or(0)
            .min(100);
        let rule = "─".repeat(width + 2);
        self.write_colored(Some(Color::Red), false, &format!("┌{rule}┐"))?;
        self.write_colored(Some(Color::Red), true, &format!("  {title}"))?;
        self.raw("\n")?;
        for line in body.lines() {
            self.write_colored(None, false, &format!("  {line}"))?;
        }
        self.write_colored(Some(Color::Red), false, &format!("└{rule}┘"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffered_manager_captures_output() {
        let (out, captured) = OutputManager::buffered();
        out.success("bundled").unwrap();
        out.banner("Title", "line one\nline two").unwrap();
        let text = captured.contents();
        assert!(text.contains("✓ bundled"));
        assert!(text.contains("  Title"));
        assert!(text.contains("  line two"));
    }
}
