//! Error types for hvm.

use std::path::PathBuf;

/// Result type alias using hvm Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Error codes for categorizing failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Malformed version, target or link text
    ParseError,
    /// Archive suffix not recognized
    UnknownArchive,
    /// Archive recognized but unreadable
    ExtractError,
    /// Tool version not installed
    NotInstalled,
    /// Descent into an unpacked archive found nothing
    TarDirMissing,
    /// A patch did not apply
    PatchFailed,
    /// A build action failed
    BuildFailure,
    /// A distribution layout we don't understand
    UnexpectedLayout,
    /// Tool not found in PATH
    ToolchainMissing,
    /// Invalid configuration
    ConfigError,
    /// I/O error
    IoError,
    /// Command execution failed
    CommandFailed,
}

/// A fix suggestion for an error.
#[derive(Debug, Clone)]
pub struct Fix {
    /// Description of what this fix does
    pub description: String,
    /// Command to run, if applicable
    pub command: Option<String>,
}

impl Fix {
    /// Create a fix with just a description.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            command: None,
        }
    }

    /// Create a fix with a command.
    pub fn with_command(description: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            command: Some(command.into()),
        }
    }
}

/// Structured error type for hvm.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("could not parse {what} from '{input}': {reason}")]
    Parse {
        what: &'static str,
        input: String,
        reason: String,
    },

    #[error("unknown archive format: {}", path.display())]
    UnknownArchive { path: PathBuf },

    #[error("failed to extract {}: {message}", path.display())]
    Extract {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("{tool} {version} is not installed")]
    NotInstalled {
        tool: String,
        version: String,
        fixes: Vec<Fix>,
    },

    #[error("directory '{spec}' does not exist in {}", base.display())]
    TarDirDoesNotExist { base: PathBuf, spec: String },

    #[error("patch {patch} failed to apply")]
    PatchFailed {
        patch: String,
        #[source]
        source: Box<Error>,
    },

    #[error("build failed in {}", build_dir.display())]
    BuildFailed {
        build_dir: PathBuf,
        #[source]
        source: Box<Error>,
        fixes: Vec<Fix>,
    },

    #[error("expected {expected} in {}, found {found}", path.display())]
    UnexpectedListLength {
        path: PathBuf,
        expected: String,
        found: usize,
    },

    #[error("toolchain not found: {tool}")]
    ToolchainMissing {
        tool: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        fixes: Vec<Fix>,
    },

    #[error("configuration error: {message}")]
    Config {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        fixes: Vec<Fix>,
    },

    #[error("I/O error: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: std::io::Error,
    },

    #[error("command failed: {command}")]
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
        fixes: Vec<Fix>,
    },

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Get the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::Parse { .. } => ErrorCode::ParseError,
            Error::UnknownArchive { .. } => ErrorCode::UnknownArchive,
            Error::Extract { .. } => ErrorCode::ExtractError,
            Error::NotInstalled { .. } => ErrorCode::NotInstalled,
            Error::TarDirDoesNotExist { .. } => ErrorCode::TarDirMissing,
            Error::PatchFailed { .. } => ErrorCode::PatchFailed,
            Error::BuildFailed { .. } => ErrorCode::BuildFailure,
            Error::UnexpectedListLength { .. } => ErrorCode::UnexpectedLayout,
            Error::ToolchainMissing { .. } => ErrorCode::ToolchainMissing,
            Error::Config { .. } => ErrorCode::ConfigError,
            Error::Io { .. } => ErrorCode::IoError,
            Error::CommandFailed { .. } => ErrorCode::CommandFailed,
            Error::Other(_) => ErrorCode::IoError,
        }
    }

    /// Get suggested fixes for this error.
    pub fn fixes(&self) -> &[Fix] {
        match self {
            Error::NotInstalled { fixes, .. } => fixes,
            Error::BuildFailed { fixes, .. } => fixes,
            Error::ToolchainMissing { fixes, .. } => fixes,
            Error::Config { fixes, .. } => fixes,
            Error::CommandFailed { fixes, .. } => fixes,
            _ => &[],
        }
    }

    /// Create a parse error.
    pub fn parse(what: &'static str, input: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Parse {
            what,
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Create a not-installed error with the usual install hint.
    pub fn not_installed(tool: impl Into<String>, version: impl Into<String>) -> Self {
        let tool = tool.into();
        let version = version.into();
        let fixes = vec![Fix::with_command(
            format!("Install {} {}", tool, version),
            format!("hvm install {} {} --archive <path>", tool, version),
        )];
        Error::NotInstalled {
            tool,
            version,
            fixes,
        }
    }

    /// Create an I/O error for a path.
    pub fn io(message: impl Into<String>, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            message: message.into(),
            path: Some(path.into()),
            source,
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            path: None,
            source: None,
            fixes: vec![],
        }
    }

    /// Create a config error with a path.
    pub fn config_at(message: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Error::Config {
            message: message.into(),
            path: Some(path.into()),
            source: None,
            fixes: vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_installed_has_fix() {
        let err = Error::not_installed("ghc", "9.4.8");
        assert_eq!(err.code(), ErrorCode::NotInstalled);
        assert_eq!(err.to_string(), "ghc 9.4.8 is not installed");
        assert_eq!(err.fixes().len(), 1);
        assert!(err.fixes()[0].command.as_deref().unwrap().contains("hvm install ghc"));
    }

    #[test]
    fn test_build_failed_keeps_cause() {
        let cause = Error::config("boom");
        let err = Error::BuildFailed {
            build_dir: PathBuf::from("/tmp/build"),
            source: Box::new(cause),
            fixes: vec![],
        };
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "configuration error: boom");
    }
}
