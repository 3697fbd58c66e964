//! Switching the active version through symlinks in the shared bin directory.
//!
//! Plain links (`ghc`, `cabal`, `x86_64-linux-ghc`) select the active
//! version of a tool per target. GHC additionally gets minor links
//! (`ghc-9.4.8`) for every install and major links (`ghc-9.4`) pointing at
//! the latest install of a major.minor series.

use hvm_core::tool::exe_name;
use hvm_core::{Error, Result, TargetVersion, Tool};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::catalog::latest_installed_for_major_minor;
use crate::fsutil;
use crate::installed::{
    HLS_SERVER_PREFIX, Installation, hls_internal_suffix, installed_versions, require_installation,
    tool_files,
};
use crate::layout::Dirs;

/// Relative link target, as seen from the shared bin directory, for `binary`
/// of an installation.
pub fn link_destination(dirs: &Dirs, tool: Tool, tv: &TargetVersion, binary: &str) -> PathBuf {
    let file = exe_name(binary);
    let in_install_dir =
        |t: Tool| PathBuf::from("..").join(t.dir_name()).join(tv.to_string()).join("bin").join(&file);

    match tool {
        Tool::Ghc => in_install_dir(Tool::Ghc),
        Tool::Hls if dirs.install_dir(Tool::Hls, tv).is_dir() => in_install_dir(Tool::Hls),
        Tool::Hls if binary != Tool::Hls.prefix() => {
            PathBuf::from(exe_name(&format!("{}~{}", binary, tv.version)))
        }
        Tool::Hls | Tool::Cabal | Tool::Stack => {
            PathBuf::from(exe_name(&format!("{}-{}", binary, tv.version)))
        }
    }
}

/// Replace `link` with a symlink to `target` via a temporary link and a rename.
fn replace_symlink(target: &Path, link: &Path) -> Result<()> {
    let name = link
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = link.with_file_name(format!(".{}.hvm-tmp", name));

    fsutil::rm_file_if_exists(&tmp)?;
    fsutil::symlink(target, &tmp)?;

    #[cfg(windows)]
    fsutil::rm_file_if_exists(link)?;

    if let Err(e) = fs::rename(&tmp, link) {
        let _ = fs::remove_file(&tmp);
        return Err(Error::io("failed to replace symlink", link, e));
    }

    debug!("Linked {} -> {}", link.display(), target.display());
    Ok(())
}

/// Name of the file inside an isolated HLS install that backs link `name`.
fn isolated_hls_file(dirs: &Dirs, tv: &TargetVersion, name: &str, suffix: Option<&str>) -> String {
    match suffix {
        Some(suffix) => {
            let versioned = format!("{}{}", name, suffix);
            if dirs
                .install_bin_dir(Tool::Hls, tv)
                .join(exe_name(&versioned))
                .exists()
            {
                versioned
            } else {
                name.to_string()
            }
        }
        None => name.to_string(),
    }
}

/// Make `tv` the active version of `tool` for its target.
pub fn set_active(dirs: &Dirs, tool: Tool, tv: &TargetVersion) -> Result<()> {
    let installation = require_installation(dirs, tool, tv)?;
    let files = tool_files(dirs, tool, tv)?;
    let target = tv.target.as_deref();

    // Links of the previous version that the new one does not provide
    if let Some(previous) = get_active_managed(dirs, tool, target)?
        && &previous != tv
        && let Ok(old_files) = tool_files(dirs, tool, &previous)
    {
        for name in old_files.iter().filter(|f| !files.contains(f)) {
            fsutil::rm_file_if_exists(&dirs.bin_dir().join(exe_name(name)))?;
        }
    }

    let suffix = match (tool, &installation) {
        (Tool::Hls, Installation::Directory(_)) => hls_internal_suffix(dirs, tv)?,
        _ => None,
    };

    fsutil::create_dir_all(&dirs.bin_dir())?;
    for name in &files {
        let source = match (tool, &installation) {
            (Tool::Hls, Installation::Directory(_)) => {
                isolated_hls_file(dirs, tv, name, suffix.as_deref())
            }
            _ => name.clone(),
        };
        let link = dirs.bin_dir().join(exe_name(name));
        replace_symlink(&link_destination(dirs, tool, tv, &source), &link)?;
    }

    info!("{} {} is now active", tool, tv);
    Ok(())
}

/// The active version of `tool` for `target` (`None` is the host).
///
/// A missing link is `None`; a broken link is `None` with a warning.
pub fn get_active(dirs: &Dirs, tool: Tool, target: Option<&str>) -> Result<Option<TargetVersion>> {
    let link = dirs.bin_dir().join(exe_name(&tool.primary_binary(target)));

    let meta = match fs::symlink_metadata(&link) {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(Error::io("failed to inspect link", &link, e)),
    };

    if !meta.file_type().is_symlink() {
        warn!("{} is not a symlink, ignoring it", link.display());
        return Ok(None);
    }

    let destination =
        fs::read_link(&link).map_err(|e| Error::io("failed to read symlink", &link, e))?;

    if !link.exists() {
        warn!(
            "Broken symlink {} -> {}",
            link.display(),
            destination.display()
        );
        return Ok(None);
    }

    let tv = tool.parse_link_target(&destination.to_string_lossy())?;
    Ok(Some(tv))
}

/// Like [`get_active`], but a link hvm did not create (its target does not
/// parse) is `None` with a warning instead of an error.
pub fn get_active_managed(
    dirs: &Dirs,
    tool: Tool,
    target: Option<&str>,
) -> Result<Option<TargetVersion>> {
    match get_active(dirs, tool, target) {
        Err(Error::Parse { input, .. }) => {
            warn!(
                "{} link points at {}, which hvm does not manage",
                tool.primary_binary(target),
                input
            );
            Ok(None)
        }
        other => other,
    }
}

/// Remove the `<file>-<version>` links of a GHC install.
pub fn remove_minor(dirs: &Dirs, tool: Tool, tv: &TargetVersion) -> Result<()> {
    let files = tool_files(dirs, tool, tv)?;
    if tool != Tool::Ghc {
        return Ok(());
    }

    for name in files {
        let link = dirs.bin_dir().join(exe_name(&format!("{}-{}", name, tv.version)));
        fsutil::rm_file_if_exists(&link)?;
    }
    Ok(())
}

/// Remove the `<file>-<major>.<minor>` links of a GHC install.
pub fn remove_major(dirs: &Dirs, tool: Tool, tv: &TargetVersion) -> Result<()> {
    let files = tool_files(dirs, tool, tv)?;
    let Some((major, minor)) = tv.version.major_minor() else {
        return Ok(());
    };
    if tool != Tool::Ghc {
        return Ok(());
    }

    for name in files {
        let link = dirs
            .bin_dir()
            .join(exe_name(&format!("{}-{}.{}", name, major, minor)));
        fsutil::rm_file_if_exists(&link)?;
    }
    Ok(())
}

/// Remove the plain links of `tv`, if it is the active version for its target.
pub fn remove_plain(dirs: &Dirs, tool: Tool, tv: &TargetVersion) -> Result<()> {
    let files = tool_files(dirs, tool, tv)?;

    match get_active_managed(dirs, tool, tv.target.as_deref())? {
        Some(active) if &active == tv => {}
        _ => {
            debug!("{} {} is not active, keeping plain links", tool, tv);
            return Ok(());
        }
    }

    for name in files {
        fsutil::rm_file_if_exists(&dirs.bin_dir().join(exe_name(&name)))?;
    }
    // Legacy HLS servers linked by older versions
    if tool == Tool::Hls {
        remove_stray_hls_server_links(dirs)?;
    }
    Ok(())
}

fn remove_stray_hls_server_links(dirs: &Dirs) -> Result<()> {
    let bin = dirs.bin_dir();
    for name in fsutil::list_dir_names(&bin)? {
        let path = bin.join(&name);
        let is_link = fs::symlink_metadata(&path).is_ok_and(|m| m.file_type().is_symlink());
        if is_link && name.starts_with(HLS_SERVER_PREFIX) && !name.contains('~') {
            fsutil::rm_file_if_exists(&path)?;
        }
    }
    Ok(())
}

/// Create `<file>-<version>` links for every binary of a GHC install.
pub fn link_minor(dirs: &Dirs, tv: &TargetVersion) -> Result<()> {
    fsutil::create_dir_all(&dirs.bin_dir())?;
    for name in tool_files(dirs, Tool::Ghc, tv)? {
        let link = dirs.bin_dir().join(exe_name(&format!("{}-{}", name, tv.version)));
        replace_symlink(&link_destination(dirs, Tool::Ghc, tv, &name), &link)?;
    }
    Ok(())
}

/// Point the `<file>-<major>.<minor>` links of `target` at the latest
/// installed GHC of that series, or remove them when none is left.
///
/// Returns the version the links now point at.
pub fn relink_major(
    dirs: &Dirs,
    major: u64,
    minor: u64,
    target: Option<&str>,
) -> Result<Option<TargetVersion>> {
    remove_major_links_for(dirs, major, minor, target)?;

    let installed = installed_versions(dirs, Tool::Ghc)?;
    let Some(latest) = latest_installed_for_major_minor(&installed, major, minor, target) else {
        debug!("No GHC {}.{} left, major links removed", major, minor);
        return Ok(None);
    };

    fsutil::create_dir_all(&dirs.bin_dir())?;
    for name in tool_files(dirs, Tool::Ghc, &latest)? {
        let link = dirs
            .bin_dir()
            .join(exe_name(&format!("{}-{}.{}", name, major, minor)));
        replace_symlink(&link_destination(dirs, Tool::Ghc, &latest, &name), &link)?;
    }
    Ok(Some(latest))
}

/// Remove every link in `bin/` named `*-<major>.<minor>` that points into a
/// GHC install of that series for `target`.
fn remove_major_links_for(dirs: &Dirs, major: u64, minor: u64, target: Option<&str>) -> Result<()> {
    let bin = dirs.bin_dir();
    let suffix = format!("-{}.{}", major, minor);

    for name in fsutil::list_dir_names(&bin)? {
        if !hvm_core::tool::strip_exe_suffix(&name).ends_with(&suffix) {
            continue;
        }
        let path = bin.join(&name);
        let Ok(destination) = fs::read_link(&path) else {
            continue;
        };
        let Ok(tv) = Tool::Ghc.parse_link_target(&destination.to_string_lossy()) else {
            continue;
        };
        if tv.is_for_target(target) && tv.version.major_minor() == Some((major, minor)) {
            fsutil::rm_file_if_exists(&path)?;
        }
    }
    Ok(())
}

/// Remove the plain links of the active version of `tool` for `target`.
///
/// Returns the version that was active.
pub fn unset_active(dirs: &Dirs, tool: Tool, target: Option<&str>) -> Result<Option<TargetVersion>> {
    let Some(active) = get_active(dirs, tool, target)? else {
        return Ok(None);
    };
    remove_plain(dirs, tool, &active)?;
    info!("{} {} is no longer active", tool, active);
    Ok(Some(active))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::installed::tests::{fake_ghc, touch};
    use tempfile::tempdir;

    fn tv(s: &str) -> TargetVersion {
        s.parse().unwrap()
    }

    fn link_of(dirs: &Dirs, name: &str) -> PathBuf {
        fs::read_link(dirs.bin_dir().join(name)).unwrap()
    }

    #[test]
    fn test_link_destination() {
        let dirs = Dirs::new("/base");
        assert_eq!(
            link_destination(&dirs, Tool::Ghc, &tv("9.4.8"), "ghci"),
            PathBuf::from("../ghc/9.4.8/bin/ghci")
        );
        assert_eq!(
            link_destination(&dirs, Tool::Cabal, &tv("3.10.2.1"), "cabal"),
            PathBuf::from("cabal-3.10.2.1")
        );
        assert_eq!(
            link_destination(&dirs, Tool::Hls, &tv("1.7.0.0"), "haskell-language-server-wrapper"),
            PathBuf::from("haskell-language-server-wrapper-1.7.0.0")
        );
        assert_eq!(
            link_destination(&dirs, Tool::Hls, &tv("1.7.0.0"), "haskell-language-server-9.2.4"),
            PathBuf::from("haskell-language-server-9.2.4~1.7.0.0")
        );
    }

    #[test]
    fn test_set_then_get() {
        let temp = tempdir().unwrap();
        let dirs = Dirs::new(temp.path());
        let v948 = fake_ghc(&dirs, "9.4.8");
        let v966 = fake_ghc(&dirs, "9.6.6");

        assert_eq!(get_active(&dirs, Tool::Ghc, None).unwrap(), None);

        set_active(&dirs, Tool::Ghc, &v948).unwrap();
        assert_eq!(get_active(&dirs, Tool::Ghc, None).unwrap(), Some(v948.clone()));
        assert_eq!(link_of(&dirs, "ghci"), PathBuf::from("../ghc/9.4.8/bin/ghci"));

        set_active(&dirs, Tool::Ghc, &v966).unwrap();
        assert_eq!(get_active(&dirs, Tool::Ghc, None).unwrap(), Some(v966));
        assert!(!dirs.bin_dir().join(".ghc.hvm-tmp").exists());
    }

    #[test]
    fn test_set_active_not_installed() {
        let temp = tempdir().unwrap();
        let dirs = Dirs::new(temp.path());
        assert!(matches!(
            set_active(&dirs, Tool::Ghc, &tv("9.8.1")),
            Err(Error::NotInstalled { .. })
        ));
    }

    #[test]
    fn test_cross_target_is_separate() {
        let temp = tempdir().unwrap();
        let dirs = Dirs::new(temp.path());
        let host = fake_ghc(&dirs, "9.4.8");
        let cross = fake_ghc(&dirs, "armv7-linux-9.4.8");

        set_active(&dirs, Tool::Ghc, &host).unwrap();
        set_active(&dirs, Tool::Ghc, &cross).unwrap();

        assert_eq!(get_active(&dirs, Tool::Ghc, None).unwrap(), Some(host));
        assert_eq!(
            get_active(&dirs, Tool::Ghc, Some("armv7-linux")).unwrap(),
            Some(cross)
        );
    }

    #[test]
    fn test_broken_link_is_none() {
        let temp = tempdir().unwrap();
        let dirs = Dirs::new(temp.path());
        let v = fake_ghc(&dirs, "9.2.8");
        set_active(&dirs, Tool::Ghc, &v).unwrap();

        fs::remove_dir_all(dirs.install_dir(Tool::Ghc, &v)).unwrap();
        assert_eq!(get_active(&dirs, Tool::Ghc, None).unwrap(), None);
    }

    #[test]
    fn test_unparsable_link_is_parse_error() {
        let temp = tempdir().unwrap();
        let dirs = Dirs::new(temp.path());
        touch(&dirs.bin_dir().join("somewhere-else"));
        std::os::unix::fs::symlink("somewhere-else", dirs.bin_dir().join("cabal")).unwrap();

        assert!(matches!(
            get_active(&dirs, Tool::Cabal, None),
            Err(Error::Parse { .. })
        ));
    }

    #[test]
    fn test_set_active_replaces_foreign_link() {
        let temp = tempdir().unwrap();
        let dirs = Dirs::new(temp.path().join("base"));
        touch(&dirs.bin_dir().join("cabal-3.10.2.1"));
        let system_cabal = temp.path().join("usr-cabal");
        touch(&system_cabal);
        std::os::unix::fs::symlink(&system_cabal, dirs.bin_dir().join("cabal")).unwrap();

        assert_eq!(get_active_managed(&dirs, Tool::Cabal, None).unwrap(), None);
        // Not ours, and not the version being removed
        remove_plain(&dirs, Tool::Cabal, &tv("3.10.2.1")).unwrap();
        assert_eq!(link_of(&dirs, "cabal"), system_cabal);

        set_active(&dirs, Tool::Cabal, &tv("3.10.2.1")).unwrap();
        assert_eq!(link_of(&dirs, "cabal"), PathBuf::from("cabal-3.10.2.1"));
        assert!(system_cabal.exists());
    }

    #[test]
    fn test_cabal_switching() {
        let temp = tempdir().unwrap();
        let dirs = Dirs::new(temp.path());
        touch(&dirs.bin_dir().join("cabal-3.10.2.1"));
        touch(&dirs.bin_dir().join("cabal-3.6.2.0"));

        set_active(&dirs, Tool::Cabal, &tv("3.6.2.0")).unwrap();
        assert_eq!(link_of(&dirs, "cabal"), PathBuf::from("cabal-3.6.2.0"));
        assert_eq!(
            get_active(&dirs, Tool::Cabal, None).unwrap(),
            Some(tv("3.6.2.0"))
        );

        // Not active: links stay
        remove_plain(&dirs, Tool::Cabal, &tv("3.10.2.1")).unwrap();
        assert!(dirs.bin_dir().join("cabal").exists());

        remove_plain(&dirs, Tool::Cabal, &tv("3.6.2.0")).unwrap();
        assert!(fs::symlink_metadata(dirs.bin_dir().join("cabal")).is_err());
    }

    #[test]
    fn test_isolated_hls_versioned_layout_links() {
        let temp = tempdir().unwrap();
        let dirs = Dirs::new(temp.path());
        let v = tv("1.9.0.0");
        let bin = dirs.install_bin_dir(Tool::Hls, &v);
        touch(&bin.join("haskell-language-server-wrapper"));
        touch(&bin.join("haskell-language-server-wrapper-1.9.0.0"));
        touch(&bin.join("haskell-language-server-9.2.7-1.9.0.0"));

        set_active(&dirs, Tool::Hls, &v).unwrap();
        assert_eq!(
            link_of(&dirs, "haskell-language-server-9.2.7"),
            PathBuf::from("../hls/1.9.0.0/bin/haskell-language-server-9.2.7-1.9.0.0")
        );
        assert_eq!(get_active(&dirs, Tool::Hls, None).unwrap(), Some(v));
    }

    #[test]
    fn test_minor_and_major_links() {
        let temp = tempdir().unwrap();
        let dirs = Dirs::new(temp.path());
        let v947 = fake_ghc(&dirs, "9.4.7");
        let v948 = fake_ghc(&dirs, "9.4.8");

        link_minor(&dirs, &v947).unwrap();
        link_minor(&dirs, &v948).unwrap();
        assert_eq!(link_of(&dirs, "ghc-9.4.7"), PathBuf::from("../ghc/9.4.7/bin/ghc"));

        assert_eq!(relink_major(&dirs, 9, 4, None).unwrap(), Some(v948.clone()));
        assert_eq!(link_of(&dirs, "ghc-9.4"), PathBuf::from("../ghc/9.4.8/bin/ghc"));

        remove_minor(&dirs, Tool::Ghc, &v948).unwrap();
        remove_major(&dirs, Tool::Ghc, &v948).unwrap();
        assert!(fs::symlink_metadata(dirs.bin_dir().join("ghc-9.4.8")).is_err());
        assert!(fs::symlink_metadata(dirs.bin_dir().join("ghc-9.4")).is_err());

        fs::remove_dir_all(dirs.install_dir(Tool::Ghc, &v948)).unwrap();
        assert_eq!(relink_major(&dirs, 9, 4, None).unwrap(), Some(v947));
        assert_eq!(link_of(&dirs, "ghc-9.4"), PathBuf::from("../ghc/9.4.7/bin/ghc"));
    }

    #[test]
    fn test_relink_major_removes_when_none_left() {
        let temp = tempdir().unwrap();
        let dirs = Dirs::new(temp.path());
        let v = fake_ghc(&dirs, "9.2.8");
        relink_major(&dirs, 9, 2, None).unwrap();
        assert!(dirs.bin_dir().join("ghc-9.2").exists());

        fs::remove_dir_all(dirs.install_dir(Tool::Ghc, &v)).unwrap();
        assert_eq!(relink_major(&dirs, 9, 2, None).unwrap(), None);
        assert!(fs::symlink_metadata(dirs.bin_dir().join("ghc-9.2")).is_err());
    }

    #[test]
    fn test_unset_active() {
        let temp = tempdir().unwrap();
        let dirs = Dirs::new(temp.path());
        let v = fake_ghc(&dirs, "9.6.6");
        set_active(&dirs, Tool::Ghc, &v).unwrap();

        assert_eq!(unset_active(&dirs, Tool::Ghc, None).unwrap(), Some(v));
        assert_eq!(get_active(&dirs, Tool::Ghc, None).unwrap(), None);
        assert!(fs::symlink_metadata(dirs.bin_dir().join("ghci")).is_err());
        assert_eq!(unset_active(&dirs, Tool::Ghc, None).unwrap(), None);
    }

    #[test]
    fn test_removals_require_installation() {
        let temp = tempdir().unwrap();
        let dirs = Dirs::new(temp.path());
        let missing = tv("8.10.7");
        for result in [
            remove_minor(&dirs, Tool::Ghc, &missing),
            remove_major(&dirs, Tool::Ghc, &missing),
            remove_plain(&dirs, Tool::Ghc, &missing),
        ] {
            assert!(matches!(result, Err(Error::NotInstalled { .. })));
        }
    }
}
