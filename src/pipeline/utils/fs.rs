//! File system utilities for the pipeline.
//!
//! Idempotent removal helpers and recursive permission relaxing used by the
//! cleanup and archive stages.

use crate::pipeline::error::{ErrorExt, Result};
use std::{io, path::Path};
use tokio::fs;

/// Removes the directory and its contents if it exists.
pub async fn remove_dir_all(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()), // Idempotent
        Err(e) => Err(e).fs_context("removing directory", path),
    }
}

/// Removes the file if it exists.
pub async fn remove_file(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).fs_context("removing file", path),
    }
}

/// Creates all of the directories of the specified path.
pub async fn create_dir_all(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .await
        .fs_context("creating directory", path)
}

/// Grants the owner write access to every entry below `root`.
///
/// Symlinks are skipped. Returns the number of entries that could not be
/// updated; a missing `root` counts as zero.
pub async fn relax_permissions(root: &Path) -> Result<usize> {
    let root = root.to_path_buf();

    tokio::task::spawn_blocking(move || relax_permissions_blocking(&root))
        .await
        .map_err(|e| {
            crate::pipeline::Error::GenericError(format!("Permission task panicked: {}", e))
        })
}

fn relax_permissions_blocking(root: &Path) -> usize {
    if !root.exists() {
        return 0;
    }

    let mut failures = 0;
    for entry in walkdir::WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::debug!("Skipping unreadable entry under {}: {}", root.display(), e);
                failures += 1;
                continue;
            }
        };

        if entry.file_type().is_symlink() {
            continue;
        }

        if let Err(e) = make_owner_writable(entry.path(), entry.file_type().is_dir()) {
            log::debug!("Could not relax permissions of {}: {}", entry.path().display(), e);
            failures += 1;
        }
    }
    failures
}

#[cfg(unix)]
fn make_owner_writable(path: &Path, is_dir: bool) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = std::fs::symlink_metadata(path)?.permissions();
    // Directories also need search and read access so their children can be unlinked
    let wanted = if is_dir { 0o700 } else { 0o200 };
    let mode = perms.mode();
    if mode & wanted != wanted {
        perms.set_mode(mode | wanted);
        std::fs::set_permissions(path, perms)?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn make_owner_writable(path: &Path, _is_dir: bool) -> io::Result<()> {
    let mut perms = std::fs::symlink_metadata(path)?.permissions();
    if perms.readonly() {
        #[allow(clippy::permissions_set_readonly_false)]
        perms.set_readonly(false);
        std::fs::set_permissions(path, perms)?;
    }
    Ok(())
}
