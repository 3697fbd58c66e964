//! Logging setup for hvm.
//!
//! This crate provides:
//! - Structured logging setup
//! - Timing measurements for long operations (unpacking, builds)

use hvm_core::EnvVars;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    prelude::*,
};

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `hvm=debug` in verbose mode and
/// `hvm=warn` by default. `HVM_LOG_JSON` switches to JSON lines.
pub fn init(verbose: bool) {
    let default_directive = if verbose { "hvm=debug" } else { "hvm=warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let subscriber = tracing_subscriber::registry().with(filter);

    if std::env::var(EnvVars::HVM_LOG_JSON).is_ok() {
        let json_layer = fmt::layer()
            .json()
            .with_span_events(FmtSpan::CLOSE)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(std::io::stderr);

        subscriber.with(json_layer).init();
    } else {
        let fmt_layer = fmt::layer()
            .with_target(false)
            .with_file(false)
            .without_time()
            .with_writer(std::io::stderr);

        subscriber.with(fmt_layer).init();
    }
}

/// A timing guard that logs duration on drop.
pub struct TimingGuard {
    name: String,
    start: std::time::Instant,
}

impl TimingGuard {
    /// Start timing an operation.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: std::time::Instant::now(),
        }
    }

    /// Time elapsed so far.
    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        tracing::debug!(
            operation = %self.name,
            duration_ms = duration.as_millis() as u64,
            "Operation completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timing_guard_elapsed() {
        let guard = TimingGuard::new("unpack");
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(guard.elapsed() >= std::time::Duration::from_millis(5));
    }
}
