//! On-disk layout of the base directory.
//!
//! ```text
//! <base>/
//!   bin/                    shared symlinks, versioned cabal/stack binaries
//!   ghc/<targetversion>/    one GHC installation per directory
//!   hls/<version>/          isolated HLS installations
//!   cache/                  kept downloads
//!   tmp/                    build directories
//! ```

use hvm_config::Settings;
use hvm_core::tool::exe_name;
use hvm_core::{Result, TargetVersion, Tool, Version};
use std::path::{Path, PathBuf};

use crate::fsutil;

/// Marker file inside a GHC installation built from source.
pub const SOURCE_BUILT_MARKER: &str = ".ghcup_src_built";

/// Paths under a base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dirs {
    base: PathBuf,
}

impl Dirs {
    /// Layout rooted at `base`.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Layout for the configured base directory.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self::new(settings.resolve_base_dir()?))
    }

    /// The base directory.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Shared directory holding the active symlinks.
    pub fn bin_dir(&self) -> PathBuf {
        self.base.join("bin")
    }

    /// Directory holding per-version installations of `tool`.
    pub fn tool_dir(&self, tool: Tool) -> PathBuf {
        self.base.join(tool.dir_name())
    }

    /// Download cache.
    pub fn cache_dir(&self) -> PathBuf {
        self.base.join("cache")
    }

    /// Scratch space for build directories.
    pub fn tmp_dir(&self) -> PathBuf {
        self.base.join("tmp")
    }

    /// Installation directory of a GHC or isolated HLS version.
    pub fn install_dir(&self, tool: Tool, tv: &TargetVersion) -> PathBuf {
        self.tool_dir(tool).join(tv.to_string())
    }

    /// `bin/` inside an installation directory.
    pub fn install_bin_dir(&self, tool: Tool, tv: &TargetVersion) -> PathBuf {
        self.install_dir(tool, tv).join("bin")
    }

    /// A versioned binary in the shared bin directory, e.g. `bin/cabal-3.10.2.1`.
    pub fn versioned_binary(&self, tool: Tool, version: &Version) -> PathBuf {
        self.bin_dir()
            .join(exe_name(&format!("{}-{}", tool.prefix(), version)))
    }

    /// Create `bin/`, `cache/` and `tmp/`.
    pub fn ensure(&self) -> Result<()> {
        fsutil::create_dir_all(&self.bin_dir())?;
        fsutil::create_dir_all(&self.cache_dir())?;
        fsutil::create_dir_all(&self.tmp_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let dirs = Dirs::new("/home/u/.hvm");
        let tv: TargetVersion = "armv7-linux-9.4.8".parse().unwrap();

        assert_eq!(dirs.bin_dir(), PathBuf::from("/home/u/.hvm/bin"));
        assert_eq!(
            dirs.install_bin_dir(Tool::Ghc, &tv),
            PathBuf::from("/home/u/.hvm/ghc/armv7-linux-9.4.8/bin")
        );
        assert_eq!(
            dirs.install_dir(Tool::Hls, &"2.4.0.0".parse().unwrap()),
            PathBuf::from("/home/u/.hvm/hls/2.4.0.0")
        );

        let cabal = dirs.versioned_binary(Tool::Cabal, &"3.10.2.1".parse().unwrap());
        assert!(cabal.starts_with("/home/u/.hvm/bin"));
        assert!(
            cabal.ends_with("cabal-3.10.2.1") || cabal.ends_with("cabal-3.10.2.1.exe")
        );
    }

    #[test]
    fn test_ensure_creates_dirs() {
        let temp = tempfile::tempdir().unwrap();
        let dirs = Dirs::new(temp.path().join("base"));
        dirs.ensure().unwrap();
        assert!(dirs.bin_dir().is_dir());
        assert!(dirs.tmp_dir().is_dir());
        assert!(dirs.cache_dir().is_dir());
    }
}
