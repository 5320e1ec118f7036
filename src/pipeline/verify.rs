//! Bundle verification.
//!
//! Confirms that the bundle produced by the packaging tool actually contains
//! the runtime resources and native binaries the application needs. Every
//! check is evaluated so that a single failure reports all missing items.

use super::error::{Error, Result};
use std::{
    fmt,
    path::{Path, PathBuf},
};

/// Directories searched for bundled native binaries, relative to the bundle.
pub const BINARY_LOCATIONS: [&str; 2] = ["Contents/Frameworks", "Contents/Resources"];

/// Directory holding bundled resources, relative to the bundle.
pub const RESOURCES_DIR: &str = "Contents/Resources";

/// An item the bundle was expected to contain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissingItem {
    /// A data file under `Contents/Resources`.
    Resource(PathBuf),
    /// A native binary, with the locations that were searched.
    Binary {
        /// Executable file name
        name: String,
        /// Absolute paths that were checked
        searched: Vec<PathBuf>,
    },
}

impl fmt::Display for MissingItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingItem::Resource(path) => {
                write!(f, "resource {}/{}", RESOURCES_DIR, path.display())
            }
            MissingItem::Binary { name, .. } => write!(
                f,
                "binary '{}' in {}",
                name,
                BINARY_LOCATIONS.join(" or ")
            ),
        }
    }
}

/// What verification found.
#[derive(Debug, Clone, Default)]
pub struct VerificationReport {
    /// Resources found, as absolute paths.
    pub resources: Vec<PathBuf>,
    /// Binaries found, as absolute paths.
    pub binaries: Vec<PathBuf>,
}

/// Checks `bundle` for every required resource and binary.
///
/// Resources are relative to `Contents/Resources`. A binary passes if it
/// exists in `Contents/Frameworks` or `Contents/Resources`.
///
/// # Errors
///
/// - [`Error::BundleNotFound`] if `bundle` is not a directory
/// - [`Error::VerificationFailed`] listing every missing item
pub fn verify_bundle<S: AsRef<str>>(
    bundle: &Path,
    required_resources: &[PathBuf],
    binary_names: &[S],
) -> Result<VerificationReport> {
    if !bundle.is_dir() {
        return Err(Error::BundleNotFound(bundle.to_path_buf()));
    }

    let mut report = VerificationReport::default();
    let mut missing = Vec::new();

    let resources_root = bundle.join(RESOURCES_DIR);
    for resource in required_resources {
        let path = resources_root.join(resource);
        if path.is_file() {
            log::debug!("Found resource {}", path.display());
            report.resources.push(path);
        } else {
            missing.push(MissingItem::Resource(resource.clone()));
        }
    }

    for name in binary_names {
        let name = name.as_ref();
        let candidates: Vec<PathBuf> = BINARY_LOCATIONS
            .iter()
            .map(|location| bundle.join(location).join(name))
            .collect();

        match candidates.iter().find(|path| path.is_file()) {
            Some(found) => {
                log::debug!("Found binary {}", found.display());
                report.binaries.push(found.clone());
            }
            None => missing.push(MissingItem::Binary {
                name: name.to_string(),
                searched: candidates,
            }),
        }
    }

    if missing.is_empty() {
        log::info!(
            "Verified {} ({} resources, {} binaries)",
            bundle.display(),
            report.resources.len(),
            report.binaries.len()
        );
        Ok(report)
    } else {
        Err(Error::VerificationFailed {
            bundle: bundle.to_path_buf(),
            missing,
        })
    }
}
