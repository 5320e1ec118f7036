//! Native dependency resolution.
//!
//! Each declared dependency is looked up by executable name on the host's
//! search path (or the configured override) and canonicalized, so symlinked
//! installs such as Homebrew's resolve to the real binary that gets bundled.

use super::error::{Error, ErrorExt, Result};
use crate::config::DependencySpec;
use std::path::{Path, PathBuf};

/// A dependency found on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDependency {
    /// Logical identifier, e.g. `codec`.
    pub id: String,
    /// Executable name that was looked up.
    pub binary: String,
    /// Canonical absolute path of the executable.
    pub path: PathBuf,
}

impl ResolvedDependency {
    /// File name of the resolved executable as it will appear in the bundle.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.binary.clone())
    }
}

/// Resolves every dependency, in declaration order.
///
/// `search_path` replaces `PATH` for the lookup when given; relative entries
/// in it are taken relative to `cwd`.
///
/// # Errors
///
/// Fails with [`Error::MissingDependency`] on the first tool that cannot be
/// found. Nothing is returned partially.
pub fn resolve_dependencies(
    specs: &[DependencySpec],
    search_path: Option<&str>,
    cwd: &Path,
) -> Result<Vec<ResolvedDependency>> {
    specs
        .iter()
        .map(|spec| resolve_one(spec, search_path, cwd))
        .collect()
}

fn resolve_one(
    spec: &DependencySpec,
    search_path: Option<&str>,
    cwd: &Path,
) -> Result<ResolvedDependency> {
    let found = match search_path {
        Some(paths) => which::which_in(&spec.binary, Some(paths), cwd),
        None => which::which(&spec.binary),
    }
    .map_err(|error| Error::MissingDependency {
        id: spec.id.clone(),
        binary: spec.binary.clone(),
        error,
    })?;

    let path = found
        .canonicalize()
        .fs_context("canonicalizing dependency", &found)?;

    log::info!("Resolved {} ({}) to {}", spec.binary, spec.id, path.display());

    Ok(ResolvedDependency {
        id: spec.id.clone(),
        binary: spec.binary.clone(),
        path,
    })
}
