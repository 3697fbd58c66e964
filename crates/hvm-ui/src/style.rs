//! Styling for terminal output.

use console::{StyledObject, style};
use std::fmt::Display;
use std::path::Path;

/// Style helper for consistent terminal output.
pub struct Style;

impl Style {
    pub fn error<D: Display>(text: D) -> StyledObject<D> {
        style(text).red().bold()
    }

    pub fn warning<D: Display>(text: D) -> StyledObject<D> {
        style(text).yellow()
    }

    pub fn success<D: Display>(text: D) -> StyledObject<D> {
        style(text).green()
    }

    pub fn info<D: Display>(text: D) -> StyledObject<D> {
        style(text).cyan()
    }

    /// A command the user can run.
    pub fn command<D: Display>(text: D) -> StyledObject<D> {
        style(text).cyan().bold()
    }

    pub fn dim<D: Display>(text: D) -> StyledObject<D> {
        style(text).dim()
    }

    pub fn bold<D: Display>(text: D) -> StyledObject<D> {
        style(text).bold()
    }

    /// A tool name with its version, e.g. `ghc 9.4.8`.
    pub fn tool_version(tool: impl Display, version: impl Display) -> String {
        format!("{} {}", style(tool).bold(), style(version).cyan())
    }

    pub fn path(path: &Path) -> StyledObject<String> {
        style(path.display().to_string()).underlined()
    }

    /// A duration in human-readable form.
    pub fn duration(duration: std::time::Duration) -> String {
        let secs = duration.as_secs_f64();
        if secs < 1.0 {
            format!("{}ms", duration.as_millis())
        } else if secs < 60.0 {
            format!("{:.1}s", secs)
        } else {
            format!("{:.1}m", secs / 60.0)
        }
    }
}

/// Whether colors should be used, from `NO_COLOR`, `HVM_NO_COLOR`,
/// `CLICOLOR` and whether stderr is a terminal.
pub fn colors_enabled() -> bool {
    !hvm_core::env::no_color() && console::Term::stderr().is_term()
}
