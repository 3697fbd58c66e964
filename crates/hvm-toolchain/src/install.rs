//! Installing from a local archive and removing installations.

use hvm_config::Settings;
use hvm_core::tool::exe_name;
use hvm_core::{CommandRunner, Error, Result, TargetVersion, Tool};
use hvm_telemetry::TimingGuard;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::archive::{self, ArchiveFormat, DescentSpec};
use crate::build::{GnuPatch, apply_patches, run_build_action, run_make};
use crate::fsutil;
use crate::installed::{HLS_SERVER_PREFIX, Installation, find_installation, require_installation};
use crate::layout::Dirs;
use crate::symlink;

/// What to install and how.
#[derive(Debug, Clone)]
pub struct InstallRequest {
    pub tool: Tool,
    pub version: TargetVersion,
    /// Downloaded archive.
    pub archive: PathBuf,
    /// Where the payload sits inside the archive; defaults to its single
    /// top-level directory.
    pub descent: Option<DescentSpec>,
    /// Patches applied to the unpacked tree before installing.
    pub patch_dir: Option<PathBuf>,
    /// Make the new version active.
    pub set_active: bool,
    /// Reinstall over an existing installation.
    pub force: bool,
}

impl InstallRequest {
    pub fn new(tool: Tool, version: TargetVersion, archive: impl Into<PathBuf>) -> Self {
        Self {
            tool,
            version,
            archive: archive.into(),
            descent: None,
            patch_dir: None,
            set_active: false,
            force: false,
        }
    }

    pub fn with_descent(mut self, descent: DescentSpec) -> Self {
        self.descent = Some(descent);
        self
    }

    pub fn with_patches(mut self, dir: impl Into<PathBuf>) -> Self {
        self.patch_dir = Some(dir.into());
        self
    }

    pub fn activate(mut self, yes: bool) -> Self {
        self.set_active = yes;
        self
    }

    pub fn force(mut self, yes: bool) -> Self {
        self.force = yes;
        self
    }
}

/// Result of an install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub location: PathBuf,
    pub already_installed: bool,
    pub activated: bool,
}

/// Install `request.tool` from a local archive.
pub async fn install_from_archive(
    dirs: &Dirs,
    settings: &Settings,
    request: &InstallRequest,
) -> Result<InstallOutcome> {
    let tool = request.tool;
    let tv = &request.version;
    let _timing = TimingGuard::new(format!("install {} {}", tool, tv));

    if tv.target.is_some() && !tool.supports_target() {
        return Err(Error::parse(
            "target version",
            tv.to_string(),
            format!("{} has no cross-compiling variants", tool),
        ));
    }

    // Fail on unsupported archives before touching the base directory
    ArchiveFormat::classify(&request.archive)?;

    if let Some(existing) = find_installation(dirs, tool, tv) {
        if !request.force {
            info!("{} {} is already installed", tool, tv);
            return Ok(InstallOutcome {
                location: existing.path().to_path_buf(),
                already_installed: true,
                activated: false,
            });
        }
        debug!("Reinstalling {} {}", tool, tv);
        delete_installation(dirs, tool, tv, &existing)?;
    }

    dirs.ensure()?;

    if settings.cache {
        cache_archive(dirs, &request.archive)?;
    }

    let build_dir = dirs.tmp_dir().join(format!("{}-{}", tool, tv));
    fsutil::rm_dir_if_exists(&build_dir)?;

    let install_dir = match tool {
        Tool::Ghc | Tool::Hls => Some(dirs.install_dir(tool, tv)),
        Tool::Cabal | Tool::Stack => None,
    };

    let location = run_build_action(&build_dir, install_dir.as_deref(), settings.keep_dirs, async {
        archive::unpack(&request.archive, &build_dir)?;
        let root = match request.descent {
            Some(ref spec) => archive::descend_into(&build_dir, spec)?,
            None => archive::default_root(&build_dir)?,
        };

        if let Some(ref patches) = request.patch_dir {
            apply_patches(patches, &root, &GnuPatch).await?;
        }

        match (tool, install_dir.as_deref()) {
            (Tool::Ghc, Some(dest)) => {
                install_bindist(&root, dest).await?;
                Ok(dest.to_path_buf())
            }
            (Tool::Hls, Some(dest)) => {
                fsutil::merge_file_tree(&root, dest)?;
                Ok(dest.to_path_buf())
            }
            _ => install_binary(dirs, tool, tv, &root, &build_dir),
        }
    })
    .await?;

    if tool == Tool::Ghc {
        symlink::link_minor(dirs, tv)?;
        if let Some((major, minor)) = tv.version.major_minor() {
            symlink::relink_major(dirs, major, minor, tv.target.as_deref())?;
        }
    }

    if request.set_active {
        symlink::set_active(dirs, tool, tv)?;
    }

    info!("Installed {} {} to {}", tool, tv, location.display());
    Ok(InstallOutcome {
        location,
        already_installed: false,
        activated: request.set_active,
    })
}

/// `./configure --prefix=<dest>` followed by `make install`.
async fn install_bindist(root: &Path, dest: &Path) -> Result<()> {
    let configure = root.join("configure");
    if !configure.is_file() {
        return Err(Error::io(
            "configure script not found, the archive may be incomplete",
            configure,
            io::Error::from(io::ErrorKind::NotFound),
        ));
    }

    fsutil::create_dir_all(dest)?;

    let mut prefix = OsString::from("--prefix=");
    prefix.push(dest);

    CommandRunner::new()
        .with_working_dir(root)
        .run_checked(&configure, [prefix])
        .await?;

    run_make(&["install"], root).await?;
    Ok(())
}

/// Copy a single binary to `bin/<prefix>-<version>`.
///
/// The copy is staged in `build_dir` and renamed into place, so the
/// versioned name only ever refers to a complete, executable file.
fn install_binary(
    dirs: &Dirs,
    tool: Tool,
    tv: &TargetVersion,
    root: &Path,
    build_dir: &Path,
) -> Result<PathBuf> {
    let name = exe_name(tool.prefix());
    let source = [root.join(&name), root.join("bin").join(&name)]
        .into_iter()
        .find(|p| p.is_file())
        .ok_or_else(|| {
            Error::io(
                format!("{} not found in archive", name),
                root,
                io::Error::from(io::ErrorKind::NotFound),
            )
        })?;

    let dest = dirs.versioned_binary(tool, &tv.version);
    let staged = build_dir.join(format!(".{}.staged", name));
    place_file(&source, &staged, &dest)?;
    Ok(dest)
}

/// Copy `source` to `staged`, make it executable, then rename it to `dest`.
fn place_file(source: &Path, staged: &Path, dest: &Path) -> Result<()> {
    fs::copy(source, staged).map_err(|e| Error::io("failed to copy binary", staged, e))?;
    fsutil::set_executable(staged)?;
    if let Err(e) = fs::rename(staged, dest) {
        let _ = fs::remove_file(staged);
        return Err(Error::io("failed to move binary into place", dest, e));
    }
    Ok(())
}

fn cache_archive(dirs: &Dirs, archive: &Path) -> Result<()> {
    let Some(name) = archive.file_name() else {
        return Ok(());
    };
    let cached = dirs.cache_dir().join(name);
    if cached == archive {
        return Ok(());
    }
    fs::copy(archive, &cached).map_err(|e| Error::io("failed to cache archive", &cached, e))?;
    debug!("Cached {}", cached.display());
    Ok(())
}

/// Delete the files of an installation, leaving links alone.
fn delete_installation(
    dirs: &Dirs,
    tool: Tool,
    tv: &TargetVersion,
    installation: &Installation,
) -> Result<()> {
    match installation {
        Installation::Directory(dir) => fsutil::rm_dir_if_exists(dir),
        Installation::Binary(bin) => {
            fsutil::rm_file_if_exists(bin)?;
            if tool == Tool::Hls {
                let server_suffix = format!("~{}", tv.version);
                for name in fsutil::list_dir_names(&dirs.bin_dir())? {
                    let stem = hvm_core::tool::strip_exe_suffix(&name);
                    if stem.starts_with(HLS_SERVER_PREFIX) && stem.ends_with(&server_suffix) {
                        fsutil::rm_file_if_exists(&dirs.bin_dir().join(&name))?;
                    }
                }
            }
            Ok(())
        }
    }
}

/// Remove an installation and every link pointing into it.
pub fn remove_installation(dirs: &Dirs, tool: Tool, tv: &TargetVersion) -> Result<()> {
    let installation = require_installation(dirs, tool, tv)?;

    symlink::remove_minor(dirs, tool, tv)?;
    symlink::remove_plain(dirs, tool, tv)?;
    delete_installation(dirs, tool, tv, &installation)?;

    if tool == Tool::Ghc
        && let Some((major, minor)) = tv.version.major_minor()
    {
        symlink::relink_major(dirs, major, minor, tv.target.as_deref())?;
    }

    info!("Removed {} {}", tool, tv);
    Ok(())
}
