//! Build environment cleanup.
//!
//! Removes the output directories and generated packaging descriptors of a
//! previous run. Every step is best-effort: permission problems, extended
//! attributes that cannot be stripped, and entries that cannot be deleted
//! are logged and recorded in the [`CleanReport`], never raised. Whether the
//! environment ended up clean is checked separately by [`ensure_clean`]
//! before packaging starts.

use super::{
    error::{Error, Result},
    settings::Settings,
    utils::fs,
};
use std::{
    path::{Path, PathBuf},
    process::{Command, Stdio},
    time::Duration,
};
use wait_timeout::ChildExt;

/// Upper bound for a single metadata strip command.
const STRIP_TIMEOUT: Duration = Duration::from_secs(30);

/// Strips platform metadata (extended attributes, quarantine flags) from a tree.
pub trait MetadataCleaner: Send + Sync {
    /// Strips metadata below `path`. Failures are reported as `false`.
    fn strip(&self, path: &Path) -> bool;
}

/// Runs `xattr -cr <path>` with a bounded wait.
#[derive(Debug, Clone, Copy)]
pub struct XattrCleaner {
    timeout: Duration,
}

impl Default for XattrCleaner {
    fn default() -> Self {
        Self {
            timeout: STRIP_TIMEOUT,
        }
    }
}

impl MetadataCleaner for XattrCleaner {
    fn strip(&self, path: &Path) -> bool {
        let mut child = match Command::new("xattr")
            .arg("-cr")
            .arg(path)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                log::debug!("Could not run xattr on {}: {}", path.display(), e);
                return false;
            }
        };

        match child.wait_timeout(self.timeout) {
            Ok(Some(status)) if status.success() => true,
            Ok(Some(status)) => {
                log::debug!(
                    "xattr -cr {} exited with code {}",
                    path.display(),
                    status.code().unwrap_or(-1)
                );
                false
            }
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
                log::warn!(
                    "Timed out stripping attributes of {} after {} seconds",
                    path.display(),
                    self.timeout.as_secs()
                );
                false
            }
            Err(_) => {
                let _ = child.kill();
                let _ = child.wait();
                false
            }
        }
    }
}

/// Skips metadata stripping entirely.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetadataCleaner;

impl MetadataCleaner for NoopMetadataCleaner {
    fn strip(&self, _path: &Path) -> bool {
        true
    }
}

/// The metadata cleaner appropriate for the host platform.
pub fn default_metadata_cleaner() -> Box<dyn MetadataCleaner> {
    if cfg!(target_os = "macos") {
        Box::new(XattrCleaner::default())
    } else {
        Box::new(NoopMetadataCleaner)
    }
}

/// Outcome of a cleanup pass.
#[derive(Debug, Default, Clone)]
pub struct CleanReport {
    /// Output directories (or links and files in their place) that were removed.
    pub removed_dirs: Vec<PathBuf>,
    /// Packaging descriptors that were removed.
    pub removed_descriptors: Vec<PathBuf>,
    /// Paths that could not be removed, with the reason.
    pub failures: Vec<(PathBuf, String)>,
}

impl CleanReport {
    /// Whether every step succeeded.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Removes the output directories and `*.spec` descriptors of a prior run.
///
/// Never fails; everything that went wrong is listed in the report.
pub async fn clean_build_environment(
    settings: &Settings,
    cleaner: &dyn MetadataCleaner,
) -> CleanReport {
    let mut report = CleanReport::default();

    for dir in settings.artifact_dirs() {
        let Ok(metadata) = dir.symlink_metadata() else {
            log::debug!("Nothing to clean at {}", dir.display());
            continue;
        };

        // A link is removed itself; its target is never walked or stripped.
        if !metadata.is_dir() {
            log::info!("Removing {}", dir.display());
            match fs::remove_file(&dir).await {
                Ok(()) => report.removed_dirs.push(dir),
                Err(e) => {
                    log::warn!("Could not remove {}: {}", dir.display(), e);
                    report.failures.push((dir, e.to_string()));
                }
            }
            continue;
        }

        log::info!("Removing {}", dir.display());

        match fs::relax_permissions(&dir).await {
            Ok(0) => {}
            Ok(n) => log::debug!("{} entries under {} kept their permissions", n, dir.display()),
            Err(e) => log::debug!("Relaxing permissions under {} failed: {}", dir.display(), e),
        }

        if !cleaner.strip(&dir) {
            log::debug!("Metadata under {} was not stripped", dir.display());
        }

        match fs::remove_dir_all(&dir).await {
            Ok(()) => report.removed_dirs.push(dir),
            Err(e) => {
                log::warn!("Could not remove {}: {}", dir.display(), e);
                report.failures.push((dir, e.to_string()));
            }
        }
    }

    remove_descriptors(settings, &mut report).await;
    report
}

async fn remove_descriptors(settings: &Settings, report: &mut CleanReport) {
    let pattern = settings.descriptor_pattern();
    let entries = match glob::glob(&pattern) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("Invalid descriptor pattern {}: {}", pattern, e);
            return;
        }
    };

    for entry in entries {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                log::debug!("Skipping unreadable descriptor: {}", e);
                continue;
            }
        };
        if !path.is_file() {
            continue;
        }
        match fs::remove_file(&path).await {
            Ok(()) => {
                log::debug!("Removed {}", path.display());
                report.removed_descriptors.push(path);
            }
            Err(e) => {
                log::warn!("Could not remove {}: {}", path.display(), e);
                report.failures.push((path, e.to_string()));
            }
        }
    }
}

/// Fails if any output directory still exists.
pub fn ensure_clean(settings: &Settings) -> Result<()> {
    let stale: Vec<PathBuf> = settings
        .artifact_dirs()
        .into_iter()
        .filter(|dir| dir.symlink_metadata().is_ok())
        .collect();

    if stale.is_empty() {
        Ok(())
    } else {
        Err(Error::StaleBuildEnvironment { paths: stale })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::SettingsBuilder;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingCleaner(AtomicUsize);

    impl MetadataCleaner for CountingCleaner {
        fn strip(&self, _path: &Path) -> bool {
            self.0.fetch_add(1, Ordering::SeqCst);
            false
        }
    }

    fn settings(root: &Path) -> Settings {
        SettingsBuilder::new(root)
            .app_name("Transcriber")
            .build()
            .expect("settings")
    }

    #[tokio::test]
    async fn test_removes_outputs_and_descriptors() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        std::fs::create_dir_all(root.join("dist/Transcriber.app/Contents")).expect("mkdir");
        std::fs::create_dir_all(root.join("build/Transcriber")).expect("mkdir");
        std::fs::write(root.join("Transcriber.spec"), "# generated").expect("write");
        std::fs::write(root.join("notes.txt"), "keep").expect("write");

        let settings = settings(root);
        let report = clean_build_environment(&settings, &NoopMetadataCleaner).await;

        assert!(report.is_complete());
        assert_eq!(report.removed_dirs.len(), 2);
        assert_eq!(report.removed_descriptors.len(), 1);
        assert!(!root.join("dist").exists());
        assert!(!root.join("build").exists());
        assert!(!root.join("Transcriber.spec").exists());
        assert!(root.join("notes.txt").exists());
        ensure_clean(&settings).expect("clean");
    }

    #[tokio::test]
    async fn test_cleaning_twice_is_a_no_op() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = settings(dir.path());

        let first = clean_build_environment(&settings, &NoopMetadataCleaner).await;
        let second = clean_build_environment(&settings, &NoopMetadataCleaner).await;

        assert!(first.is_complete() && second.is_complete());
        assert!(second.removed_dirs.is_empty());
        assert!(second.removed_descriptors.is_empty());
    }

    #[tokio::test]
    async fn test_strip_failures_are_not_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("dist")).expect("mkdir");
        let cleaner = CountingCleaner(AtomicUsize::new(0));

        let report = clean_build_environment(&settings(dir.path()), &cleaner).await;

        assert_eq!(cleaner.0.load(Ordering::SeqCst), 1);
        assert!(report.is_complete());
        assert!(!dir.path().join("dist").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_read_only_tree_is_removed() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let frameworks = dir.path().join("dist/Transcriber.app/Contents/Frameworks");
        std::fs::create_dir_all(&frameworks).expect("mkdir");
        std::fs::write(frameworks.join("ffmpeg"), b"bin").expect("write");
        std::fs::set_permissions(&frameworks, std::fs::Permissions::from_mode(0o555))
            .expect("chmod");

        let report = clean_build_environment(&settings(dir.path()), &NoopMetadataCleaner).await;

        assert!(report.is_complete(), "failures: {:?}", report.failures);
        assert!(!dir.path().join("dist").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_dangling_output_link_is_removed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let dist = dir.path().join("dist");
        std::os::unix::fs::symlink(dir.path().join("gone"), &dist).expect("symlink");
        let settings = settings(dir.path());

        let report = clean_build_environment(&settings, &NoopMetadataCleaner).await;

        assert!(report.is_complete(), "failures: {:?}", report.failures);
        assert_eq!(report.removed_dirs, vec![dist.clone()]);
        assert!(dist.symlink_metadata().is_err());
        ensure_clean(&settings).expect("clean");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_output_link_target_is_left_alone() {
        let dir = tempfile::tempdir().expect("tempdir");
        let outside = tempfile::tempdir().expect("tempdir");
        std::fs::write(outside.path().join("keep.txt"), "keep").expect("write");
        let build = dir.path().join("build");
        std::os::unix::fs::symlink(outside.path(), &build).expect("symlink");
        let cleaner = CountingCleaner(AtomicUsize::new(0));

        let report = clean_build_environment(&settings(dir.path()), &cleaner).await;

        assert!(report.is_complete(), "failures: {:?}", report.failures);
        assert!(build.symlink_metadata().is_err());
        assert!(outside.path().join("keep.txt").is_file());
        assert_eq!(cleaner.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_file_in_place_of_output_dir_is_removed() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("dist"), "not a directory").expect("write");
        let settings = settings(dir.path());

        let report = clean_build_environment(&settings, &NoopMetadataCleaner).await;

        assert!(report.is_complete(), "failures: {:?}", report.failures);
        ensure_clean(&settings).expect("clean");
    }

    #[test]
    fn test_ensure_clean_lists_leftovers() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("build")).expect("mkdir");

        let err = ensure_clean(&settings(dir.path())).unwrap_err();
        match err {
            Error::StaleBuildEnvironment { paths } => {
                assert_eq!(paths.len(), 1);
                assert!(paths[0].ends_with("build"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
