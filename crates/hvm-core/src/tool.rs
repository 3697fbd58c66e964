//! The managed tools and their naming conventions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::version::{TargetVersion, Version};

/// A tool hvm can install and switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    /// The GHC compiler.
    Ghc,
    /// cabal-install.
    Cabal,
    /// haskell-language-server.
    Hls,
    /// Stack.
    Stack,
}

impl Tool {
    /// All managed tools.
    pub const ALL: [Tool; 4] = [Tool::Ghc, Tool::Cabal, Tool::Hls, Tool::Stack];

    /// Short name used on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Tool::Ghc => "ghc",
            Tool::Cabal => "cabal",
            Tool::Hls => "hls",
            Tool::Stack => "stack",
        }
    }

    /// Canonical binary prefix, used for symlink names and pattern matching.
    pub fn prefix(&self) -> &'static str {
        match self {
            Tool::Ghc => "ghc",
            Tool::Cabal => "cabal",
            Tool::Hls => "haskell-language-server-wrapper",
            Tool::Stack => "stack",
        }
    }

    /// Directory under the base directory holding per-version installs.
    pub fn dir_name(&self) -> &'static str {
        self.name()
    }

    /// Whether this tool has cross-compiling variants.
    pub fn supports_target(&self) -> bool {
        matches!(self, Tool::Ghc)
    }

    /// Name of the primary binary link in the shared bin directory.
    pub fn primary_binary(&self, target: Option<&str>) -> String {
        match target {
            Some(t) if self.supports_target() => format!("{}-{}", t, self.prefix()),
            _ => self.prefix().to_string(),
        }
    }

    /// Parse the version out of a symlink target.
    ///
    /// Three layouts are accepted:
    /// 1. `.../<tooldir>/<versiontarget>/bin/...`
    /// 2. a bare `<prefix>-<version>` file name (`<triple>-ghc-<version>` for GHC)
    /// 3. either of the above behind leading path components, which are
    ///    stripped until a bare file name parses
    pub fn parse_link_target(&self, link: &str) -> Result<TargetVersion> {
        let normalized = link.replace('\\', "/");

        if let Some(tv) = self.parse_tool_dir_link(&normalized) {
            return Ok(tv);
        }

        if let Some(tv) = self.parse_versioned_binary(&normalized) {
            return Ok(tv);
        }

        let components: Vec<&str> = normalized.split('/').collect();
        for strip in (1..components.len()).rev() {
            let rest = components[strip..].join("/");
            if let Some(tv) = self.parse_versioned_binary(&rest) {
                return Ok(tv);
            }
        }

        Err(Error::parse(
            "symlink target",
            link,
            format!(
                "expected '{}/<version>/bin/...' or '{}-<version>'",
                self.dir_name(),
                self.prefix()
            ),
        ))
    }

    fn parse_tool_dir_link(&self, link: &str) -> Option<TargetVersion> {
        let segments: Vec<&str> = link.split('/').collect();
        segments.windows(3).find_map(|w| {
            if w[0] == self.dir_name() && w[2] == "bin" && !w[1].is_empty() {
                w[1].parse().ok()
            } else {
                None
            }
        })
    }

    /// Parse `<prefix>-<version>` (with the executable suffix removed).
    ///
    /// The version must start with a digit, so sibling binaries such as
    /// `ghc-pkg-9.4.8` are not read as `ghc` at version `pkg-9.4.8`.
    pub fn parse_versioned_binary(&self, name: &str) -> Option<TargetVersion> {
        let name = strip_exe_suffix(name);
        let marker = format!("{}-", self.prefix());

        if let Some(version) = name.strip_prefix(&marker) {
            return numeric_version(version).map(TargetVersion::new);
        }

        if self.supports_target() {
            let infix = format!("-{}", marker);
            if let Some(idx) = name.find(&infix) {
                let target = &name[..idx];
                let version = &name[idx + infix.len()..];
                if !target.is_empty() && !target.contains('/') {
                    return numeric_version(version)
                        .map(|v| TargetVersion::with_target(v, Some(target.to_string())));
                }
            }
        }

        None
    }
}

fn numeric_version(text: &str) -> Option<Version> {
    if !text.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// Remove the platform executable suffix, if present.
pub fn strip_exe_suffix(name: &str) -> &str {
    let suffix = std::env::consts::EXE_SUFFIX;
    if suffix.is_empty() {
        name
    } else {
        name.strip_suffix(suffix).unwrap_or(name)
    }
}

/// Append the platform executable suffix.
pub fn exe_name(name: &str) -> String {
    format!("{}{}", name, std::env::consts::EXE_SUFFIX)
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Tool {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ghc" => Ok(Tool::Ghc),
            "cabal" => Ok(Tool::Cabal),
            "hls" | "haskell-language-server" => Ok(Tool::Hls),
            "stack" => Ok(Tool::Stack),
            _ => Err(Error::parse("tool", s, "expected ghc, cabal, hls or stack")),
        }
    }
}
