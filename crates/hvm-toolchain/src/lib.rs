//! Toolchain management for hvm.
//!
//! This crate handles:
//! - Unpacking downloaded archives
//! - Scanning the base directory for installed versions
//! - Switching the active version through symlinks
//! - Scoped build actions with cleanup, patching and make
//! - Queries over the release catalog

pub mod archive;
pub mod build;
pub mod catalog;
pub mod fsutil;
pub mod install;
pub mod installed;
pub mod layout;
pub mod symlink;

pub use archive::{ArchiveFormat, DescentSpec, descend_into, list_entries, unpack};
pub use build::{GnuPatch, PatchTool, apply_patches, make_program, run_build_action, run_make};
pub use catalog::{Catalog, Tag, VersionInfo, latest_installed_for_major_minor, max_by_version};
pub use install::{InstallOutcome, InstallRequest, install_from_archive, remove_installation};
pub use installed::{
    InstalledEntry, Installation, find_installation, hls_internal_suffix, is_installed,
    is_source_built, list_installed, mark_source_built, tool_files,
};
pub use layout::Dirs;
pub use symlink::{
    get_active, get_active_managed, link_destination, link_minor, relink_major, remove_major,
    remove_minor, remove_plain, set_active, unset_active,
};
