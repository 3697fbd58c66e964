//! Output formatting for the hvm CLI.
//!
//! Results go to stdout so they can be piped; status, warnings and errors
//! go to stderr.

use crate::style::Style;
use hvm_core::error::{Error, Fix};
use std::io::{self, Write};

/// Verbosity level for output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    /// Includes subprocess output on failure.
    Verbose,
}

/// Output handler for consistent CLI output.
#[derive(Debug, Clone, Default)]
pub struct Output {
    verbosity: Verbosity,
}

impl Output {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_verbosity(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    pub fn is_verbose(&self) -> bool {
        self.verbosity >= Verbosity::Verbose
    }

    /// Print a status message with a right-aligned action word.
    pub fn status(&self, action: &str, message: &str) {
        if self.verbosity >= Verbosity::Normal {
            eprintln!("{:>12} {}", Style::bold(Style::success(action)), message);
        }
    }

    pub fn info(&self, message: &str) {
        if self.verbosity >= Verbosity::Normal {
            eprintln!("{}", message);
        }
    }

    pub fn warn(&self, message: &str) {
        eprintln!("{}: {}", Style::warning("warning"), message);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{}: {}", Style::error("error"), message);
    }

    /// Shown in verbose mode only.
    pub fn verbose(&self, message: &str) {
        if self.verbosity >= Verbosity::Verbose {
            eprintln!("{}", Style::dim(message));
        }
    }

    /// A line of command output on stdout, printed at every verbosity.
    pub fn result(&self, line: &str) {
        println!("{}", line);
    }

    /// One version line of a listing; the active version is marked.
    pub fn version_entry(&self, version: &str, active: bool, note: Option<&str>) {
        let marker = if active {
            Style::success("*").to_string()
        } else {
            " ".to_string()
        };
        let version = if active {
            Style::bold(version).to_string()
        } else {
            version.to_string()
        };
        match note {
            Some(note) => println!("{} {} {}", marker, version, Style::dim(format!("({})", note))),
            None => println!("{} {}", marker, version),
        }
    }

    /// Print a structured error with context and fixes.
    pub fn print_error(&self, error: &Error) {
        eprintln!();
        eprintln!("{}: {}", Style::error("error"), error);

        match error {
            Error::Config { path: Some(p), .. } | Error::Io { path: Some(p), .. } => {
                eprintln!("  {} {}", Style::dim("-->"), p.display());
            }
            Error::Extract { path, .. } | Error::UnknownArchive { path } => {
                eprintln!("  {} {}", Style::dim("archive:"), path.display());
            }
            Error::PatchFailed { source, .. } => {
                eprintln!("  {} {}", Style::dim("caused by:"), source);
            }
            Error::BuildFailed { source, .. } => {
                eprintln!("  {} {}", Style::dim("caused by:"), source);
                if let Error::CommandFailed { stderr, .. } = source.as_ref() {
                    self.print_stderr(stderr);
                }
            }
            Error::CommandFailed { stderr, .. } => self.print_stderr(stderr),
            Error::UnexpectedListLength { path, .. } => {
                eprintln!("  {} {}", Style::dim("in:"), path.display());
            }
            _ => {}
        }

        let fixes = error.fixes();
        if !fixes.is_empty() {
            eprintln!();
            for fix in fixes {
                self.print_fix(fix);
            }
        }
    }

    fn print_stderr(&self, stderr: &str) {
        let stderr = stderr.trim();
        if stderr.is_empty() {
            return;
        }
        if self.is_verbose() {
            for line in stderr.lines() {
                eprintln!("  {}", Style::dim(line));
            }
        } else if let Some(last) = stderr.lines().last() {
            eprintln!("  {} {}", Style::dim("stderr:"), last);
        }
    }

    pub fn print_fix(&self, fix: &Fix) {
        if let Some(ref cmd) = fix.command {
            eprintln!("{}: Run `{}`", Style::info("fix"), Style::command(cmd));
            if fix.description != *cmd {
                eprintln!("      {}", Style::dim(&fix.description));
            }
        } else {
            eprintln!("{}: {}", Style::info("fix"), fix.description);
        }
    }

    pub fn header(&self, title: &str) {
        if self.verbosity >= Verbosity::Normal {
            eprintln!();
            eprintln!("{}", Style::bold(title));
        }
    }

    pub fn list_item(&self, key: &str, value: &str) {
        if self.verbosity >= Verbosity::Normal {
            eprintln!("  {}: {}", Style::dim(key), value);
        }
    }

    /// Print a success line with a duration.
    pub fn success_summary(&self, action: &str, duration: std::time::Duration) {
        if self.verbosity >= Verbosity::Normal {
            eprintln!(
                "{} {} {}",
                Style::success("✓"),
                action,
                Style::dim(format!("({})", Style::duration(duration)))
            );
        }
    }

    pub fn flush(&self) {
        let _ = io::stdout().flush();
        let _ = io::stderr().flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_order() {
        assert!(Verbosity::Quiet < Verbosity::Normal);
        assert!(Output::with_verbosity(Verbosity::Verbose).is_verbose());
        assert!(!Output::new().is_verbose());
    }
}
