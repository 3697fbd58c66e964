//! Filesystem helpers shared by the toolchain modules.

use hvm_core::{Error, Result};
use std::fs::{self, FileType, ReadDir};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Remove a directory tree; a missing directory is not an error.
pub fn rm_dir_if_exists(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => {
            debug!("Removed directory: {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io("failed to remove directory", path, e)),
    }
}

/// Remove a file or symlink (dangling or not); a missing entry is not an error.
pub fn rm_file_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!("Removed: {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io("failed to remove file", path, e)),
    }
}

/// Names of the entries of `dir`, sorted. A missing directory is empty.
pub fn list_dir_names(dir: &Path) -> Result<Vec<String>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::io("failed to read directory", dir, e)),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::io("failed to read directory entry", dir, e))?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

/// Create a directory and its parents.
pub fn create_dir_all(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| Error::io("failed to create directory", dir, e))
}

/// Create a symlink at `link` pointing to `target`.
pub fn symlink(target: &Path, link: &Path) -> Result<()> {
    #[cfg(unix)]
    let res = std::os::unix::fs::symlink(target, link);
    #[cfg(windows)]
    let res = std::os::windows::fs::symlink_file(target, link);

    res.map_err(|e| Error::io(format!("failed to create symlink to {}", target.display()), link, e))
}

/// Mark a file executable (no-op off unix).
pub fn set_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))
            .map_err(|e| Error::io("failed to set executable permissions", path, e))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

/// An entry produced by [`walk_dir`].
#[derive(Debug, Clone)]
pub struct WalkEntry {
    /// Absolute path.
    pub path: PathBuf,
    /// Path relative to the walk root.
    pub relative: PathBuf,
    /// Type of the entry itself (symlinks are not followed).
    pub file_type: FileType,
}

/// Lazy, pre-order, recursive directory walk.
///
/// Directories are read only when the walk reaches them, so a caller that
/// stops early never touches the rest of the tree. Symlinks are yielded but
/// not followed.
pub struct WalkDir {
    root: PathBuf,
    stack: Vec<ReadDir>,
    pending_error: Option<Error>,
}

/// Walk `root` recursively.
pub fn walk_dir(root: &Path) -> WalkDir {
    let (stack, pending_error) = match fs::read_dir(root) {
        Ok(rd) => (vec![rd], None),
        Err(e) => (Vec::new(), Some(Error::io("failed to read directory", root, e))),
    };
    WalkDir {
        root: root.to_path_buf(),
        stack,
        pending_error,
    }
}

impl Iterator for WalkDir {
    type Item = Result<WalkEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(err) = self.pending_error.take() {
            return Some(Err(err));
        }

        loop {
            let top = self.stack.last_mut()?;
            let entry = match top.next() {
                None => {
                    self.stack.pop();
                    continue;
                }
                Some(Err(e)) => return Some(Err(Error::io("failed to walk directory", &self.root, e))),
                Some(Ok(entry)) => entry,
            };

            let path = entry.path();
            let file_type = match entry.file_type() {
                Ok(ft) => ft,
                Err(e) => return Some(Err(Error::io("failed to stat entry", path, e))),
            };

            if file_type.is_dir() {
                match fs::read_dir(&path) {
                    Ok(rd) => self.stack.push(rd),
                    Err(e) => return Some(Err(Error::io("failed to read directory", path, e))),
                }
            }

            let relative = path
                .strip_prefix(&self.root)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| path.clone());

            return Some(Ok(WalkEntry {
                path,
                relative,
                file_type,
            }));
        }
    }
}

/// Copy the tree at `src` into `dest`, keeping file modes and symlinks.
///
/// Existing files in `dest` are overwritten.
pub fn merge_file_tree(src: &Path, dest: &Path) -> Result<()> {
    create_dir_all(dest)?;

    for entry in walk_dir(src) {
        let entry = entry?;
        let target = dest.join(&entry.relative);

        if entry.file_type.is_dir() {
            create_dir_all(&target)?;
        } else if entry.file_type.is_symlink() {
            let link = fs::read_link(&entry.path)
                .map_err(|e| Error::io("failed to read symlink", &entry.path, e))?;
            rm_file_if_exists(&target)?;
            symlink(&link, &target)?;
        } else {
            // fs::copy carries the permission bits over
            fs::copy(&entry.path, &target)
                .map_err(|e| Error::io("failed to copy file", &target, e))?;
        }
    }

    Ok(())
}
