//! Settings for hvm.
//!
//! Settings are read from `~/.config/hvm/config.toml` (or the platform
//! equivalent) and passed explicitly to the toolchain engine.

pub mod settings;

pub use settings::{RetentionPolicy, Settings, SettingsError, default_config_file, load_settings};

/// The settings filename.
pub const CONFIG_FILENAME: &str = "config.toml";

/// Default base directory name under the home directory.
pub const BASE_DIR_NAME: &str = ".hvm";
