//! Core types for hvm.
//!
//! Shared by every hvm crate: the version grammar, the tool enumeration,
//! the error type and subprocess execution.

pub mod command;
pub mod env;
pub mod error;
pub mod tool;
pub mod version;

pub use command::{CommandOutput, CommandRunner};
pub use env::EnvVars;
pub use error::{Error, ErrorCode, Fix, Result};
pub use tool::Tool;
pub use version::{Component, TargetVersion, Version, parse_target_version, parse_version};

/// Exit codes for the hvm CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// General error
    GeneralError = 1,
    /// Usage error (bad arguments)
    UsageError = 2,
    /// Configuration error
    ConfigError = 3,
    /// Requested version is not installed
    NotInstalled = 4,
    /// Build or install failure
    BuildError = 5,
}

impl ExitCode {
    /// Pick the exit code for an error.
    pub fn for_error(error: &Error) -> Self {
        match error.code() {
            ErrorCode::ParseError => ExitCode::UsageError,
            ErrorCode::ConfigError => ExitCode::ConfigError,
            ErrorCode::NotInstalled => ExitCode::NotInstalled,
            ErrorCode::BuildFailure | ErrorCode::PatchFailed | ErrorCode::CommandFailed => {
                ExitCode::BuildError
            }
            _ => ExitCode::GeneralError,
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code as u8)
    }
}
