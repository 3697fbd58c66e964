//! Spinner for long-running operations.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

/// A spinner for indeterminate progress.
///
/// Hidden when stderr is not a terminal so piped output stays clean.
pub struct Spinner {
    bar: ProgressBar,
}

fn finished_style() -> ProgressStyle {
    ProgressStyle::with_template("{msg}").unwrap_or_else(|_| ProgressStyle::default_spinner())
}

impl Spinner {
    pub fn new(message: impl Into<String>) -> Self {
        let bar = ProgressBar::new_spinner();
        if !console::Term::stderr().is_term() {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .map(|s| s.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"))
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(style);
        bar.set_message(message.into());
        bar.enable_steady_tick(Duration::from_millis(80));
        Self { bar }
    }

    pub fn set_message(&self, message: impl Into<String>) {
        self.bar.set_message(message.into());
    }

    fn finish_with(self, symbol: console::StyledObject<&str>, message: String) {
        self.bar.set_style(finished_style());
        self.bar.finish_with_message(format!("{} {}", symbol, message));
    }

    pub fn finish_success(self, message: impl Into<String>) {
        self.finish_with(console::style("✓").green(), message.into());
    }

    pub fn finish_error(self, message: impl Into<String>) {
        self.finish_with(console::style("✗").red(), message.into());
    }

    pub fn finish_warning(self, message: impl Into<String>) {
        self.finish_with(console::style("⚠").yellow(), message.into());
    }

    /// Finish and clear the spinner.
    pub fn finish_clear(self) {
        self.bar.finish_and_clear();
    }
}
