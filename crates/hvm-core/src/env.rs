//! Environment variable constants for hvm.
//!
//! Single source of truth for the environment variables hvm recognizes.

/// Environment variable names used by hvm.
pub struct EnvVars;

impl EnvVars {
    // ─── Global Settings ─────────────────────────────────────────────────────

    /// Path to the hvm configuration file.
    pub const HVM_CONFIG_FILE: &'static str = "HVM_CONFIG_FILE";

    /// Base directory holding `bin/`, `ghc/`, `hls/` and friends.
    pub const HVM_DIR: &'static str = "HVM_DIR";

    /// Enable verbose output.
    pub const HVM_VERBOSE: &'static str = "HVM_VERBOSE";

    /// Disable colored output.
    pub const HVM_NO_COLOR: &'static str = "HVM_NO_COLOR";

    /// Enable JSON log output.
    pub const HVM_LOG_JSON: &'static str = "HVM_LOG_JSON";

    // ─── Standard Environment Variables ──────────────────────────────────────

    /// Standard NO_COLOR environment variable.
    pub const NO_COLOR: &'static str = "NO_COLOR";

    /// Standard CLICOLOR environment variable.
    pub const CLICOLOR: &'static str = "CLICOLOR";
}

/// Check if colors should be disabled based on environment.
pub fn no_color() -> bool {
    std::env::var(EnvVars::NO_COLOR).is_ok()
        || std::env::var(EnvVars::HVM_NO_COLOR).is_ok()
        || std::env::var(EnvVars::CLICOLOR)
            .map(|v| v == "0")
            .unwrap_or(false)
}
