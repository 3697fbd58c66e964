//! Scoped build actions, patching and make.

use async_trait::async_trait;
use hvm_config::RetentionPolicy;
use hvm_core::{CommandOutput, CommandRunner, Error, Fix, Result};
use std::ffi::OsStr;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::fsutil;

/// Cleanup for one build action. Runs once, from whichever exit path is
/// taken first; dropping an armed guard counts as a failure.
struct BuildGuard {
    build_dir: PathBuf,
    install_dir: Option<PathBuf>,
    policy: RetentionPolicy,
    armed: bool,
}

impl BuildGuard {
    fn on_success(&mut self) -> Result<()> {
        self.armed = false;
        if self.policy.keeps_on_success() {
            debug!("Keeping build directory {}", self.build_dir.display());
            return Ok(());
        }
        fsutil::rm_dir_if_exists(&self.build_dir)
    }

    fn on_failure(&mut self) {
        self.armed = false;
        if let Some(ref install_dir) = self.install_dir
            && let Err(e) = fsutil::rm_dir_if_exists(install_dir)
        {
            warn!("Could not remove partial installation: {}", e);
        }
        if self.policy.keeps_on_failure() {
            debug!("Keeping failed build directory {}", self.build_dir.display());
            return;
        }
        if let Err(e) = fsutil::rm_dir_if_exists(&self.build_dir) {
            warn!("Could not remove build directory: {}", e);
        }
    }
}

impl Drop for BuildGuard {
    fn drop(&mut self) {
        if self.armed {
            warn!(
                "Build in {} was interrupted, cleaning up",
                self.build_dir.display()
            );
            self.on_failure();
        }
    }
}

/// Run `action` against `build_dir`, cleaning up according to `policy`.
///
/// On failure the install directory is removed and the build directory is
/// removed only under [`RetentionPolicy::Never`]; the error is wrapped in
/// [`Error::BuildFailed`]. On success the build directory is kept only under
/// `Always`. Dropping the returned future before it completes cleans up as a
/// failure would.
pub async fn run_build_action<T, F>(
    build_dir: &Path,
    install_dir: Option<&Path>,
    policy: RetentionPolicy,
    action: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let mut guard = BuildGuard {
        build_dir: build_dir.to_path_buf(),
        install_dir: install_dir.map(Path::to_path_buf),
        policy,
        armed: true,
    };

    match action.await {
        Ok(value) => {
            guard.on_success()?;
            Ok(value)
        }
        Err(err) => {
            guard.on_failure();
            let fixes = if policy.keeps_on_failure() {
                vec![Fix::new(format!(
                    "Inspect the build directory at {}",
                    build_dir.display()
                ))]
            } else {
                vec![Fix::new(
                    "Set keep-dirs = \"errors\" in the config file to keep failed builds",
                )]
            };
            Err(Error::BuildFailed {
                build_dir: build_dir.to_path_buf(),
                source: Box::new(err),
                fixes,
            })
        }
    }
}

/// Applies a single patch file to a source tree.
#[async_trait]
pub trait PatchTool: Send + Sync {
    async fn apply(&self, patch: &Path, target_dir: &Path) -> Result<()>;
}

/// `patch -p1 -i <patch>` run inside the target directory.
#[derive(Debug, Default, Clone, Copy)]
pub struct GnuPatch;

#[async_trait]
impl PatchTool for GnuPatch {
    async fn apply(&self, patch: &Path, target_dir: &Path) -> Result<()> {
        CommandRunner::new()
            .with_working_dir(target_dir)
            .run_checked("patch", [OsStr::new("-p1"), OsStr::new("-i"), patch.as_os_str()])
            .await?;
        Ok(())
    }
}

/// Apply the patches in `patch_dir` to `target_dir`, in lexical order.
///
/// Stops at the first patch that fails.
pub async fn apply_patches(patch_dir: &Path, target_dir: &Path, tool: &dyn PatchTool) -> Result<()> {
    if !patch_dir.is_dir() {
        return Err(Error::io(
            "patch directory not found",
            patch_dir,
            io::Error::from(io::ErrorKind::NotFound),
        ));
    }

    let patches: Vec<String> = fsutil::list_dir_names(patch_dir)?
        .into_iter()
        .filter(|name| patch_dir.join(name).is_file())
        .collect();

    for name in patches {
        info!("Applying patch {}", name);
        tool.apply(&patch_dir.join(&name), target_dir)
            .await
            .map_err(|e| Error::PatchFailed {
                patch: name.clone(),
                source: Box::new(e),
            })?;
    }
    Ok(())
}

/// The make program: `gmake` when available, else `make`.
pub fn make_program() -> &'static str {
    if which::which("gmake").is_ok() {
        "gmake"
    } else {
        "make"
    }
}

/// Run make with `args` in `workdir`.
pub async fn run_make(args: &[&str], workdir: &Path) -> Result<CommandOutput> {
    CommandRunner::new()
        .with_working_dir(workdir)
        .run_checked(make_program(), args)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::tempdir;

    struct Scratch {
        _root: tempfile::TempDir,
        build: PathBuf,
        install: PathBuf,
    }

    fn setup() -> Scratch {
        let root = tempdir().unwrap();
        let build = root.path().join("build");
        let install = root.path().join("install");
        fs::create_dir_all(&build).unwrap();
        fs::create_dir_all(&install).unwrap();
        fs::write(build.join("config.log"), "log").unwrap();
        Scratch {
            _root: root,
            build,
            install,
        }
    }

    async fn failing() -> Result<()> {
        Err(Error::config("boom"))
    }

    #[tokio::test]
    async fn test_failure_never_removes_everything() {
        let d = setup();
        let err = run_build_action(&d.build, Some(&d.install), RetentionPolicy::Never, failing())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::BuildFailed { .. }));
        assert!(!d.build.exists());
        assert!(!d.install.exists());
    }

    #[tokio::test]
    async fn test_failure_always_keeps_build_dir() {
        let d = setup();
        let err = run_build_action(&d.build, Some(&d.install), RetentionPolicy::Always, failing())
            .await
            .unwrap_err();

        assert!(!err.fixes().is_empty());
        assert!(d.build.exists());
        assert!(!d.install.exists());
    }

    #[tokio::test]
    async fn test_failure_on_errors_keeps_build_dir() {
        let d = setup();
        let err = run_build_action(&d.build, None, RetentionPolicy::OnErrors, failing())
            .await
            .unwrap_err();
        assert!(d.build.join("config.log").exists());
        assert!(d.install.exists());
        assert!(err.fixes()[0].description.contains("Inspect the build directory"));
    }

    #[tokio::test]
    async fn test_failure_never_suggests_keeping_dirs() {
        let d = setup();
        let err = run_build_action(&d.build, None, RetentionPolicy::Never, failing())
            .await
            .unwrap_err();
        assert!(err.fixes()[0].description.contains("keep-dirs"));
    }

    #[tokio::test]
    async fn test_success_cleanup() {
        for (policy, kept) in [
            (RetentionPolicy::Never, false),
            (RetentionPolicy::OnErrors, false),
            (RetentionPolicy::Always, true),
        ] {
            let d = setup();
            let value = run_build_action(&d.build, Some(&d.install), policy, async { Ok(42) })
                .await
                .unwrap();
            assert_eq!(value, 42);
            assert_eq!(d.build.exists(), kept, "{:?}", policy);
            assert!(d.install.exists());
        }
    }

    #[tokio::test]
    async fn test_absent_build_dir_is_fine() {
        let d = setup();
        fs::remove_dir_all(&d.build).unwrap();
        run_build_action(&d.build, None, RetentionPolicy::Never, async { Ok(()) })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_cancellation_cleans_up() {
        let d = setup();
        let action = run_build_action(&d.build, Some(&d.install), RetentionPolicy::Never, async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        });

        let timed_out = tokio::time::timeout(Duration::from_millis(20), action).await;
        assert!(timed_out.is_err());
        assert!(!d.build.exists());
        assert!(!d.install.exists());
    }

    struct RecordingPatch {
        applied: Mutex<Vec<String>>,
        fail_on: &'static str,
    }

    #[async_trait]
    impl PatchTool for RecordingPatch {
        async fn apply(&self, patch: &Path, _target_dir: &Path) -> Result<()> {
            let name = patch.file_name().unwrap().to_string_lossy().to_string();
            self.applied.lock().unwrap().push(name.clone());
            if name == self.fail_on {
                return Err(Error::CommandFailed {
                    command: "patch".to_string(),
                    exit_code: Some(1),
                    stdout: String::new(),
                    stderr: "hunk failed".to_string(),
                    fixes: vec![],
                });
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_patches_stop_at_first_failure() {
        let patches = tempdir().unwrap();
        let src = tempdir().unwrap();
        for name in ["003-c.patch", "001-a.patch", "002-b.patch"] {
            fs::write(patches.path().join(name), "").unwrap();
        }
        fs::create_dir(patches.path().join("000-not-a-patch")).unwrap();

        let tool = RecordingPatch {
            applied: Mutex::new(Vec::new()),
            fail_on: "002-b.patch",
        };
        let err = apply_patches(patches.path(), src.path(), &tool)
            .await
            .unwrap_err();

        match err {
            Error::PatchFailed { patch, .. } => assert_eq!(patch, "002-b.patch"),
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(
            *tool.applied.lock().unwrap(),
            vec!["001-a.patch", "002-b.patch"]
        );
    }

    #[tokio::test]
    async fn test_missing_patch_dir() {
        let src = tempdir().unwrap();
        let err = apply_patches(&src.path().join("patches"), src.path(), &GnuPatch)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_make_program() {
        assert!(matches!(make_program(), "gmake" | "make"));
    }

    #[tokio::test]
    async fn test_run_make_without_makefile_fails() {
        let dir = tempdir().unwrap();
        assert!(run_make(&["hvm-no-such-target"], dir.path()).await.is_err());
    }
}
