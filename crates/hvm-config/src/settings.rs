//! User settings.
//!
//! # Example
//!
//! ```toml
//! # ~/.config/hvm/config.toml
//! base-dir = "/opt/hvm"
//! keep-dirs = "errors"
//! cache = true
//! downloader = "curl"
//! ```

use directories::{BaseDirs, ProjectDirs};
use hvm_core::EnvVars;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::{BASE_DIR_NAME, CONFIG_FILENAME};

/// Error type for settings operations.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("failed to parse settings: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("failed to serialize settings: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("could not determine home directory")]
    NoHome,
}

impl From<SettingsError> for hvm_core::Error {
    fn from(err: SettingsError) -> Self {
        hvm_core::Error::Config {
            message: err.to_string(),
            path: None,
            source: Some(Box::new(err)),
            fixes: vec![],
        }
    }
}

/// Whether build directories survive a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetentionPolicy {
    /// Keep the build directory after success and failure.
    Always,
    /// Always delete the build directory.
    Never,
    /// Keep the build directory only when the build failed.
    #[default]
    #[serde(rename = "errors")]
    OnErrors,
}

impl RetentionPolicy {
    /// Whether the build directory is kept after a successful build.
    pub fn keeps_on_success(&self) -> bool {
        matches!(self, RetentionPolicy::Always)
    }

    /// Whether the build directory is kept after a failed build.
    pub fn keeps_on_failure(&self) -> bool {
        matches!(self, RetentionPolicy::Always | RetentionPolicy::OnErrors)
    }
}

/// hvm settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Settings {
    /// Base directory; `HVM_DIR` takes precedence, `~/.hvm` is the fallback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_dir: Option<PathBuf>,

    /// Retention policy for build directories.
    #[serde(default)]
    pub keep_dirs: RetentionPolicy,

    /// Keep downloaded archives in `<base>/cache`.
    #[serde(default)]
    pub cache: bool,

    /// Download program, consumed by the download layer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloader: Option<String>,
}

impl Settings {
    /// Parse settings from a TOML string.
    pub fn parse(s: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(s)?)
    }

    /// Parse settings from a file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Serialize the settings to a TOML string.
    pub fn to_string(&self) -> Result<String, SettingsError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write the settings to a file.
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, self.to_string()?)?;
        Ok(())
    }

    /// Resolve the base directory.
    pub fn resolve_base_dir(&self) -> Result<PathBuf, SettingsError> {
        if let Some(dir) = std::env::var_os(EnvVars::HVM_DIR).filter(|d| !d.is_empty()) {
            return Ok(PathBuf::from(dir));
        }
        if let Some(ref dir) = self.base_dir {
            return Ok(dir.clone());
        }
        let dirs = BaseDirs::new().ok_or(SettingsError::NoHome)?;
        Ok(dirs.home_dir().join(BASE_DIR_NAME))
    }
}

/// Path of the default settings file.
///
/// - Linux: `~/.config/hvm/config.toml`
/// - macOS: `~/Library/Application Support/io.raskell.hvm/config.toml`
/// - Windows: `%APPDATA%\raskell\hvm\config\config.toml`
pub fn default_config_file() -> Option<PathBuf> {
    ProjectDirs::from("io", "raskell", "hvm").map(|d| d.config_dir().join(CONFIG_FILENAME))
}

/// Load settings from `path`, or from the default location.
///
/// A missing file yields default settings; a file that exists but does not
/// parse is an error.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, SettingsError> {
    let config_file = match path {
        Some(p) => p.to_path_buf(),
        None => match default_config_file() {
            Some(p) => p,
            None => {
                debug!("Could not determine settings path, using defaults");
                return Ok(Settings::default());
            }
        },
    };

    if !config_file.exists() {
        debug!("Settings file does not exist: {}", config_file.display());
        return Ok(Settings::default());
    }

    debug!("Loading settings from: {}", config_file.display());
    Settings::from_file(&config_file)
}
