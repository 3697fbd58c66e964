//! Archive extraction.
//!
//! Downloads arrive as tarballs (plain, gzip, xz or bzip2) or zip files.
//! The format is decided by the file name alone; an unknown suffix is a
//! hard error rather than a guess.

use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use hvm_core::{Error, Result};
use regex::{Regex, RegexBuilder};
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use xz2::read::XzDecoder;

use crate::fsutil;

/// Supported archive formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Tar,
    TarGz,
    TarXz,
    TarBz2,
    Zip,
}

const SUFFIXES: &[(&str, ArchiveFormat)] = &[
    (".tar.gz", ArchiveFormat::TarGz),
    (".tgz", ArchiveFormat::TarGz),
    (".tar.xz", ArchiveFormat::TarXz),
    (".txz", ArchiveFormat::TarXz),
    (".tar.bz2", ArchiveFormat::TarBz2),
    (".tbz2", ArchiveFormat::TarBz2),
    (".tbz", ArchiveFormat::TarBz2),
    (".tar", ArchiveFormat::Tar),
    (".zip", ArchiveFormat::Zip),
];

impl ArchiveFormat {
    /// Classify an archive by its file name.
    pub fn classify(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        SUFFIXES
            .iter()
            .find(|(suffix, _)| name.ends_with(suffix))
            .map(|(_, format)| *format)
            .ok_or_else(|| Error::UnknownArchive {
                path: path.to_path_buf(),
            })
    }

    /// Canonical file extension, without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Tar => "tar",
            Self::TarGz => "tar.gz",
            Self::TarXz => "tar.xz",
            Self::TarBz2 => "tar.bz2",
            Self::Zip => "zip",
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

fn extract_error(archive: &Path, message: impl Into<String>, source: Option<io::Error>) -> Error {
    Error::Extract {
        path: archive.to_path_buf(),
        message: message.into(),
        source,
    }
}

fn open_archive(archive: &Path) -> Result<File> {
    File::open(archive).map_err(|e| Error::io("failed to open archive", archive, e))
}

/// Decompressed tar stream for a tar-family format.
fn tar_stream(format: ArchiveFormat, file: File) -> Box<dyn Read> {
    let reader = BufReader::new(file);
    match format {
        ArchiveFormat::TarGz => Box::new(GzDecoder::new(reader)),
        ArchiveFormat::TarXz => Box::new(XzDecoder::new(reader)),
        ArchiveFormat::TarBz2 => Box::new(BzDecoder::new(reader)),
        ArchiveFormat::Tar | ArchiveFormat::Zip => Box::new(reader),
    }
}

/// Unpack `archive` into `dest`, keeping permissions and symlinks.
pub fn unpack(archive: &Path, dest: &Path) -> Result<()> {
    let format = ArchiveFormat::classify(archive)?;
    debug!(
        "Unpacking {} ({}) to {}",
        archive.display(),
        format,
        dest.display()
    );

    fsutil::create_dir_all(dest)?;
    let file = open_archive(archive)?;

    match format {
        ArchiveFormat::Zip => unpack_zip(archive, file, dest),
        _ => {
            let mut tar = tar::Archive::new(tar_stream(format, file));
            tar.set_preserve_permissions(true);
            tar.set_overwrite(true);
            tar.unpack(dest)
                .map_err(|e| extract_error(archive, e.to_string(), Some(e)))
        }
    }
}

fn zip_error(archive: &Path, err: zip::result::ZipError) -> Error {
    extract_error(archive, err.to_string(), None)
}

const S_IFMT: u32 = 0o170000;
const S_IFLNK: u32 = 0o120000;

fn unpack_zip(archive: &Path, file: File, dest: &Path) -> Result<()> {
    let mut zip = zip::ZipArchive::new(file).map_err(|e| zip_error(archive, e))?;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).map_err(|e| zip_error(archive, e))?;
        let relative = entry.enclosed_name().ok_or_else(|| {
            extract_error(
                archive,
                format!("entry escapes the destination: {}", entry.name()),
                None,
            )
        })?;
        let out = dest.join(&relative);
        reject_symlinked_parent(archive, dest, &relative)?;

        if entry.is_dir() {
            fsutil::create_dir_all(&out)?;
            continue;
        }

        if let Some(parent) = out.parent() {
            fsutil::create_dir_all(parent)?;
        }

        let mode = entry.unix_mode();
        if mode.is_some_and(|m| m & S_IFMT == S_IFLNK) {
            let mut target = String::new();
            entry
                .read_to_string(&mut target)
                .map_err(|e| extract_error(archive, e.to_string(), Some(e)))?;
            if !link_stays_inside(&relative, Path::new(&target)) {
                return Err(extract_error(
                    archive,
                    format!("symlink {} points outside the destination: {}", entry.name(), target),
                    None,
                ));
            }
            fsutil::rm_file_if_exists(&out)?;
            fsutil::symlink(Path::new(&target), &out)?;
            continue;
        }

        let mut outfile =
            File::create(&out).map_err(|e| Error::io("failed to create file", &out, e))?;
        io::copy(&mut entry, &mut outfile)
            .map_err(|e| extract_error(archive, e.to_string(), Some(e)))?;

        #[cfg(unix)]
        if let Some(mode) = mode {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&out, fs::Permissions::from_mode(mode & 0o7777))
                .map_err(|e| Error::io("failed to set permissions", &out, e))?;
        }
    }

    Ok(())
}

/// Whether a link at `link` (relative to the destination) pointing at
/// `target` resolves, lexically, to a path inside the destination.
fn link_stays_inside(link: &Path, target: &Path) -> bool {
    let mut depth = link.components().count().saturating_sub(1);
    for component in target.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return false,
            },
            Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    true
}

/// Refuse to write below a directory that an earlier entry made a symlink.
fn reject_symlinked_parent(archive: &Path, dest: &Path, relative: &Path) -> Result<()> {
    let mut current = dest.to_path_buf();
    let Some(parent) = relative.parent() else {
        return Ok(());
    };
    for component in parent.components() {
        current.push(component);
        if fs::symlink_metadata(&current).is_ok_and(|m| m.file_type().is_symlink()) {
            return Err(extract_error(
                archive,
                format!("entry {} is below a symlink", relative.display()),
                None,
            ));
        }
    }
    Ok(())
}

/// List the entries of `archive` without extracting it.
pub fn list_entries(archive: &Path) -> Result<Vec<PathBuf>> {
    let format = ArchiveFormat::classify(archive)?;
    let file = open_archive(archive)?;
    let mut paths = Vec::new();

    match format {
        ArchiveFormat::Zip => {
            let mut zip = zip::ZipArchive::new(file).map_err(|e| zip_error(archive, e))?;
            for i in 0..zip.len() {
                let entry = zip.by_index(i).map_err(|e| zip_error(archive, e))?;
                paths.push(PathBuf::from(entry.name()));
            }
        }
        _ => {
            let mut tar = tar::Archive::new(tar_stream(format, file));
            let entries = tar
                .entries()
                .map_err(|e| extract_error(archive, e.to_string(), Some(e)))?;
            for entry in entries {
                let entry = entry.map_err(|e| extract_error(archive, e.to_string(), Some(e)))?;
                let path = entry
                    .path()
                    .map_err(|e| extract_error(archive, e.to_string(), Some(e)))?;
                paths.push(path.into_owned());
            }
        }
    }

    Ok(paths)
}

/// Where the interesting part of an unpacked archive lives.
#[derive(Debug, Clone)]
pub enum DescentSpec {
    /// A fixed relative path.
    Path(PathBuf),
    /// One case-insensitive pattern per directory level.
    Patterns(Vec<Regex>),
}

impl DescentSpec {
    /// A fixed relative path.
    pub fn path(path: impl Into<PathBuf>) -> Self {
        DescentSpec::Path(path.into())
    }

    /// Build a pattern spec from `/`-separated regexes, e.g. `ghc-.*/bin`.
    pub fn parse_patterns(spec: &str) -> Result<Self> {
        let patterns = spec
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|segment| {
                RegexBuilder::new(segment)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| Error::parse("descent pattern", segment, e.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        if patterns.is_empty() {
            return Err(Error::parse("descent pattern", spec, "no path segments"));
        }
        Ok(DescentSpec::Patterns(patterns))
    }
}

impl fmt::Display for DescentSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DescentSpec::Path(p) => write!(f, "{}", p.display()),
            DescentSpec::Patterns(patterns) => {
                let joined: Vec<&str> = patterns.iter().map(Regex::as_str).collect();
                f.write_str(&joined.join("/"))
            }
        }
    }
}

/// Resolve `spec` inside an unpacked archive rooted at `base`.
///
/// For patterns, each level lists the current directory, keeps the
/// subdirectories whose name matches, sorts them and descends into the first.
pub fn descend_into(base: &Path, spec: &DescentSpec) -> Result<PathBuf> {
    let missing = || Error::TarDirDoesNotExist {
        base: base.to_path_buf(),
        spec: spec.to_string(),
    };

    match spec {
        DescentSpec::Path(relative) => {
            let dir = base.join(relative);
            if dir.is_dir() { Ok(dir) } else { Err(missing()) }
        }
        DescentSpec::Patterns(patterns) => {
            let mut current = base.to_path_buf();
            for pattern in patterns {
                // An unreadable directory has no matches
                let mut candidates: Vec<String> = fs::read_dir(&current)
                    .into_iter()
                    .flatten()
                    .filter_map(|entry| entry.ok())
                    .filter(|entry| entry.file_type().is_ok_and(|ft| ft.is_dir()))
                    .map(|entry| entry.file_name().to_string_lossy().into_owned())
                    .filter(|name| pattern.is_match(name))
                    .collect();
                candidates.sort();

                let first = candidates.into_iter().next().ok_or_else(missing)?;
                debug!("Descending into {} (matched /{}/)", first, pattern.as_str());
                current.push(first);
            }
            Ok(current)
        }
    }
}

/// The single top-level directory of an unpacked archive, or `base` itself.
pub fn default_root(base: &Path) -> Result<PathBuf> {
    let names = fsutil::list_dir_names(base)?;
    if let [only] = names.as_slice() {
        let candidate = base.join(only);
        if candidate.is_dir() {
            return Ok(candidate);
        }
    }
    Ok(base.to_path_buf())
}
