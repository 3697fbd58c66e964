//! Scanning the base directory for installed versions.

use hvm_core::tool::strip_exe_suffix;
use hvm_core::{Error, Result, TargetVersion, Tool, Version};
use regex::Regex;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::fsutil;
use crate::layout::{Dirs, SOURCE_BUILT_MARKER};

/// Legacy HLS servers in `bin/` are named `haskell-language-server-<ghc>~<hls>`.
pub const HLS_SERVER_PREFIX: &str = "haskell-language-server-";

/// One entry of an installed-set listing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum InstalledEntry {
    /// A version the scanner understood.
    Parsed(TargetVersion),
    /// Something in the tool directory that is not a version.
    Unparsed(String),
}

impl InstalledEntry {
    /// The version, if parsed.
    pub fn version(&self) -> Option<&TargetVersion> {
        match self {
            InstalledEntry::Parsed(tv) => Some(tv),
            InstalledEntry::Unparsed(_) => None,
        }
    }
}

impl fmt::Display for InstalledEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstalledEntry::Parsed(tv) => write!(f, "{}", tv),
            InstalledEntry::Unparsed(name) => f.write_str(name),
        }
    }
}

/// Where an installation lives on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Installation {
    /// A per-version directory (GHC, isolated HLS).
    Directory(PathBuf),
    /// A versioned binary in the shared bin directory (Cabal, Stack, legacy HLS).
    Binary(PathBuf),
}

impl Installation {
    pub fn path(&self) -> &Path {
        match self {
            Installation::Directory(p) | Installation::Binary(p) => p,
        }
    }
}

/// List installed versions of `tool`, sorted.
pub fn list_installed(dirs: &Dirs, tool: Tool) -> Result<Vec<InstalledEntry>> {
    let mut entries = match tool {
        Tool::Ghc => parse_dir_entries(&dirs.tool_dir(tool))?,
        Tool::Cabal | Tool::Stack => versioned_bin_entries(dirs, tool)?,
        Tool::Hls => {
            let mut all = parse_dir_entries(&dirs.tool_dir(tool))?;
            all.extend(versioned_bin_entries(dirs, tool)?);
            all
        }
    };

    entries.sort();
    entries.dedup();
    debug!("Found {} installed {} entries", entries.len(), tool);
    Ok(entries)
}

fn parse_dir_entries(dir: &Path) -> Result<Vec<InstalledEntry>> {
    Ok(fsutil::list_dir_names(dir)?
        .into_iter()
        .map(|name| match name.parse::<TargetVersion>() {
            Ok(tv) => InstalledEntry::Parsed(tv),
            Err(_) => InstalledEntry::Unparsed(name),
        })
        .collect())
}

fn versioned_bin_entries(dirs: &Dirs, tool: Tool) -> Result<Vec<InstalledEntry>> {
    let marker = format!("{}-", tool.prefix());

    Ok(fsutil::list_dir_names(&dirs.bin_dir())?
        .iter()
        .map(|name| strip_exe_suffix(name))
        .filter_map(|name| {
            let rest = name.strip_prefix(&marker)?;
            if rest.is_empty() {
                return None;
            }
            Some(match rest.parse::<Version>() {
                Ok(v) => InstalledEntry::Parsed(TargetVersion::new(v)),
                Err(_) => InstalledEntry::Unparsed(name.to_string()),
            })
        })
        .collect())
}

/// Locate the installation of `tool` at `tv`.
pub fn find_installation(dirs: &Dirs, tool: Tool, tv: &TargetVersion) -> Option<Installation> {
    match tool {
        Tool::Ghc => {
            let dir = dirs.install_dir(tool, tv);
            dir.is_dir().then_some(Installation::Directory(dir))
        }
        Tool::Cabal | Tool::Stack => {
            let bin = dirs.versioned_binary(tool, &tv.version);
            bin.is_file().then_some(Installation::Binary(bin))
        }
        Tool::Hls => {
            let dir = dirs.install_dir(tool, tv);
            if dir.is_dir() {
                return Some(Installation::Directory(dir));
            }
            let bin = dirs.versioned_binary(tool, &tv.version);
            bin.is_file().then_some(Installation::Binary(bin))
        }
    }
}

/// Whether `tool` is installed at `tv`.
pub fn is_installed(dirs: &Dirs, tool: Tool, tv: &TargetVersion) -> bool {
    find_installation(dirs, tool, tv).is_some()
}

/// Look up an installation, or fail with [`Error::NotInstalled`].
pub fn require_installation(dirs: &Dirs, tool: Tool, tv: &TargetVersion) -> Result<Installation> {
    find_installation(dirs, tool, tv).ok_or_else(|| Error::not_installed(tool.name(), tv.to_string()))
}

/// Unversioned names of the binaries an installation provides.
///
/// These are the names of the plain links in the shared bin directory.
pub fn tool_files(dirs: &Dirs, tool: Tool, tv: &TargetVersion) -> Result<Vec<String>> {
    let installation = require_installation(dirs, tool, tv)?;

    let mut files = match (tool, &installation) {
        (Tool::Ghc, _) => {
            let version_suffix = format!("-{}", tv.version);
            list_files(&dirs.install_bin_dir(tool, tv))?
                .into_iter()
                .map(|name| {
                    let name = strip_exe_suffix(&name);
                    name.strip_suffix(version_suffix.as_str())
                        .unwrap_or(name)
                        .to_string()
                })
                .collect()
        }
        (Tool::Cabal | Tool::Stack, _) => vec![tool.prefix().to_string()],
        (Tool::Hls, Installation::Binary(_)) => legacy_hls_files(dirs, &tv.version)?,
        (Tool::Hls, Installation::Directory(_)) => {
            let bin = dirs.install_bin_dir(tool, tv);
            let names: Vec<String> = list_files(&bin)?
                .iter()
                .map(|n| strip_exe_suffix(n).to_string())
                .collect();
            match hls_suffix_in(&bin, &names)? {
                Some(suffix) => names
                    .into_iter()
                    .map(|n| n.strip_suffix(suffix.as_str()).map(str::to_string).unwrap_or(n))
                    .collect(),
                None => names,
            }
        }
    };

    files.sort();
    files.dedup();
    Ok(files)
}

/// The wrapper plus the `haskell-language-server-<ghc>` servers of a legacy install.
fn legacy_hls_files(dirs: &Dirs, version: &Version) -> Result<Vec<String>> {
    let server_suffix = format!("~{}", version);
    let mut files = vec![Tool::Hls.prefix().to_string()];

    for name in fsutil::list_dir_names(&dirs.bin_dir())? {
        let name = strip_exe_suffix(&name);
        if let Some(server) = name.strip_suffix(server_suffix.as_str())
            && server.starts_with(HLS_SERVER_PREFIX)
        {
            files.push(server.to_string());
        }
    }
    Ok(files)
}

/// Non-directory entries of `dir`.
fn list_files(dir: &Path) -> Result<Vec<String>> {
    Ok(fsutil::list_dir_names(dir)?
        .into_iter()
        .filter(|name| !dir.join(name).is_dir())
        .collect())
}

/// Version suffix of the binaries in an isolated HLS install, if any.
///
/// Older layouts ship both `haskell-language-server-wrapper` and
/// `haskell-language-server-wrapper-<version>`; the suffix of the longer name
/// is carried by every binary. A single wrapper means an unversioned layout.
pub fn hls_internal_suffix(dirs: &Dirs, tv: &TargetVersion) -> Result<Option<String>> {
    let bin = dirs.install_bin_dir(Tool::Hls, tv);
    if !bin.is_dir() {
        return Err(Error::not_installed(Tool::Hls.name(), tv.to_string()));
    }
    let names: Vec<String> = list_files(&bin)?
        .iter()
        .map(|n| strip_exe_suffix(n).to_string())
        .collect();
    hls_suffix_in(&bin, &names)
}

fn hls_suffix_in(bin: &Path, names: &[String]) -> Result<Option<String>> {
    let prefix = Tool::Hls.prefix();
    let pattern = Regex::new(&format!("^{}(-.*)?$", regex::escape(prefix)))
        .map_err(|e| Error::parse("wrapper pattern", prefix, e.to_string()))?;

    let mut wrappers: Vec<&String> = names.iter().filter(|n| pattern.is_match(n)).collect();
    wrappers.sort_by_key(|n| n.len());

    match wrappers.as_slice() {
        [_] => Ok(None),
        [_, longer] => Ok(Some(longer[prefix.len()..].to_string())),
        other => Err(Error::UnexpectedListLength {
            path: bin.to_path_buf(),
            expected: format!("one or two {} binaries", prefix),
            found: other.len(),
        }),
    }
}

/// Record that a GHC installation was built from source.
pub fn mark_source_built(dirs: &Dirs, tv: &TargetVersion) -> Result<()> {
    let marker = dirs.install_dir(Tool::Ghc, tv).join(SOURCE_BUILT_MARKER);
    fs::write(&marker, b"").map_err(|e| Error::io("failed to write marker", &marker, e))
}

/// Whether a GHC installation was built from source.
pub fn is_source_built(dirs: &Dirs, tv: &TargetVersion) -> bool {
    dirs.install_dir(Tool::Ghc, tv)
        .join(SOURCE_BUILT_MARKER)
        .exists()
}

/// Parsed versions only, logging the entries that could not be parsed.
pub fn installed_versions(dirs: &Dirs, tool: Tool) -> Result<Vec<TargetVersion>> {
    Ok(list_installed(dirs, tool)?
        .into_iter()
        .filter_map(|entry| match entry {
            InstalledEntry::Parsed(tv) => Some(tv),
            InstalledEntry::Unparsed(name) => {
                warn!("Ignoring unrecognized {} entry: {}", tool, name);
                None
            }
        })
        .collect())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use hvm_core::tool::exe_name;
    use tempfile::tempdir;

    pub(crate) fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    pub(crate) fn fake_ghc(dirs: &Dirs, tv: &str) -> TargetVersion {
        let tv: TargetVersion = tv.parse().unwrap();
        let bin = dirs.install_bin_dir(Tool::Ghc, &tv);
        let ghc = Tool::Ghc.primary_binary(tv.target.as_deref());
        for name in [
            ghc.clone(),
            format!("{}-{}", ghc, tv.version),
            "ghci".to_string(),
            format!("ghci-{}", tv.version),
            format!("ghc-pkg-{}", tv.version),
        ] {
            touch(&bin.join(exe_name(&name)));
        }
        tv
    }

    fn tv(s: &str) -> TargetVersion {
        s.parse().unwrap()
    }

    #[test]
    fn test_list_missing_dirs_is_empty() {
        let temp = tempdir().unwrap();
        let dirs = Dirs::new(temp.path());
        for tool in Tool::ALL {
            assert!(list_installed(&dirs, tool).unwrap().is_empty());
        }
    }

    #[test]
    fn test_list_ghc_sorted_with_unparsed() {
        let temp = tempdir().unwrap();
        let dirs = Dirs::new(temp.path());
        fake_ghc(&dirs, "9.4.8");
        fake_ghc(&dirs, "8.10.7");
        fake_ghc(&dirs, "armv7-linux-9.4.8");
        fs::create_dir_all(dirs.tool_dir(Tool::Ghc).join("ghc_backup")).unwrap();

        let entries = list_installed(&dirs, Tool::Ghc).unwrap();
        assert_eq!(
            entries,
            vec![
                InstalledEntry::Parsed(tv("8.10.7")),
                InstalledEntry::Parsed(tv("9.4.8")),
                InstalledEntry::Parsed(tv("armv7-linux-9.4.8")),
                InstalledEntry::Unparsed("ghc_backup".to_string()),
            ]
        );
    }

    #[test]
    fn test_list_cabal_from_bin() {
        let temp = tempdir().unwrap();
        let dirs = Dirs::new(temp.path());
        touch(&dirs.bin_dir().join(exe_name("cabal-3.10.2.1")));
        touch(&dirs.bin_dir().join(exe_name("cabal-3.6.2.0")));
        touch(&dirs.bin_dir().join(exe_name("cabal")));
        touch(&dirs.bin_dir().join(exe_name("cabal-3.10_old")));
        touch(&dirs.bin_dir().join(exe_name("stack-2.15.1")));

        let entries = list_installed(&dirs, Tool::Cabal).unwrap();
        assert_eq!(
            entries,
            vec![
                InstalledEntry::Parsed(tv("3.6.2.0")),
                InstalledEntry::Parsed(tv("3.10.2.1")),
                InstalledEntry::Unparsed("cabal-3.10_old".to_string()),
            ]
        );
        assert!(is_installed(&dirs, Tool::Cabal, &tv("3.10.2.1")));
        assert!(!is_installed(&dirs, Tool::Cabal, &tv("3.8.1.0")));
        assert_eq!(
            installed_versions(&dirs, Tool::Stack).unwrap(),
            vec![tv("2.15.1")]
        );
    }

    #[test]
    fn test_list_hls_union() {
        let temp = tempdir().unwrap();
        let dirs = Dirs::new(temp.path());
        touch(&dirs.install_bin_dir(Tool::Hls, &tv("2.4.0.0")).join("haskell-language-server-wrapper"));
        touch(&dirs.bin_dir().join(exe_name("haskell-language-server-wrapper-1.7.0.0")));

        let versions = installed_versions(&dirs, Tool::Hls).unwrap();
        assert_eq!(versions, vec![tv("1.7.0.0"), tv("2.4.0.0")]);
    }

    #[test]
    fn test_tool_files_ghc() {
        let temp = tempdir().unwrap();
        let dirs = Dirs::new(temp.path());
        let ghc = fake_ghc(&dirs, "9.4.8");

        assert_eq!(
            tool_files(&dirs, Tool::Ghc, &ghc).unwrap(),
            vec!["ghc", "ghc-pkg", "ghci"]
        );
    }

    #[test]
    fn test_tool_files_not_installed() {
        let temp = tempdir().unwrap();
        let dirs = Dirs::new(temp.path());
        assert!(matches!(
            tool_files(&dirs, Tool::Ghc, &tv("9.2.1")),
            Err(Error::NotInstalled { .. })
        ));
    }

    #[test]
    fn test_tool_files_cabal() {
        let temp = tempdir().unwrap();
        let dirs = Dirs::new(temp.path());
        touch(&dirs.bin_dir().join(exe_name("cabal-3.10.2.1")));
        assert_eq!(
            tool_files(&dirs, Tool::Cabal, &tv("3.10.2.1")).unwrap(),
            vec!["cabal"]
        );
    }

    #[test]
    fn test_tool_files_legacy_hls() {
        let temp = tempdir().unwrap();
        let dirs = Dirs::new(temp.path());
        let bin = dirs.bin_dir();
        touch(&bin.join(exe_name("haskell-language-server-wrapper-1.7.0.0")));
        touch(&bin.join(exe_name("haskell-language-server-8.10.7~1.7.0.0")));
        touch(&bin.join(exe_name("haskell-language-server-9.2.4~1.7.0.0")));
        touch(&bin.join(exe_name("haskell-language-server-9.2.4~1.8.0.0")));

        assert_eq!(
            tool_files(&dirs, Tool::Hls, &tv("1.7.0.0")).unwrap(),
            vec![
                "haskell-language-server-8.10.7",
                "haskell-language-server-9.2.4",
                "haskell-language-server-wrapper",
            ]
        );
    }

    #[test]
    fn test_isolated_hls_unversioned_layout() {
        let temp = tempdir().unwrap();
        let dirs = Dirs::new(temp.path());
        let v = tv("2.4.0.0");
        let bin = dirs.install_bin_dir(Tool::Hls, &v);
        touch(&bin.join(exe_name("haskell-language-server-wrapper")));
        touch(&bin.join(exe_name("haskell-language-server-9.4.8")));

        assert_eq!(hls_internal_suffix(&dirs, &v).unwrap(), None);
        assert_eq!(
            tool_files(&dirs, Tool::Hls, &v).unwrap(),
            vec!["haskell-language-server-9.4.8", "haskell-language-server-wrapper"]
        );
    }

    #[test]
    fn test_isolated_hls_versioned_layout() {
        let temp = tempdir().unwrap();
        let dirs = Dirs::new(temp.path());
        let v = tv("1.9.0.0");
        let bin = dirs.install_bin_dir(Tool::Hls, &v);
        touch(&bin.join(exe_name("haskell-language-server-wrapper")));
        touch(&bin.join(exe_name("haskell-language-server-wrapper-1.9.0.0")));
        touch(&bin.join(exe_name("haskell-language-server-9.2.7-1.9.0.0")));

        assert_eq!(
            hls_internal_suffix(&dirs, &v).unwrap().as_deref(),
            Some("-1.9.0.0")
        );
        assert_eq!(
            tool_files(&dirs, Tool::Hls, &v).unwrap(),
            vec!["haskell-language-server-9.2.7", "haskell-language-server-wrapper"]
        );
    }

    #[test]
    fn test_isolated_hls_too_many_wrappers() {
        let temp = tempdir().unwrap();
        let dirs = Dirs::new(temp.path());
        let v = tv("2.0.0.0");
        let bin = dirs.install_bin_dir(Tool::Hls, &v);
        for name in [
            "haskell-language-server-wrapper",
            "haskell-language-server-wrapper-2.0",
            "haskell-language-server-wrapper-2.0.0.0",
        ] {
            touch(&bin.join(exe_name(name)));
        }

        match tool_files(&dirs, Tool::Hls, &v) {
            Err(Error::UnexpectedListLength { found, .. }) => assert_eq!(found, 3),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_source_built_marker() {
        let temp = tempdir().unwrap();
        let dirs = Dirs::new(temp.path());
        let ghc = fake_ghc(&dirs, "9.6.3");

        assert!(!is_source_built(&dirs, &ghc));
        mark_source_built(&dirs, &ghc).unwrap();
        assert!(is_source_built(&dirs, &ghc));
    }
}
