//! Verify command implementation.
//!
//! Checks an already-built bundle without rebuilding it.

use crate::cli::RuntimeConfig;
use crate::error::Result;
use crate::pipeline::{Settings, resolve_dependencies, verify_bundle};

/// Execute verify command
pub(super) fn execute_verify(settings: &Settings, config: &RuntimeConfig) -> Result<i32> {
    let bundle = settings.bundle_path();
    let _ = config
        .output()
        .section(&format!("Verifying {}", bundle.display()));

    let binary_names = bundled_binary_names(settings, config);
    let report = verify_bundle(&bundle, settings.required_resources(), &binary_names)?;

    for path in report.resources.iter().chain(&report.binaries) {
        config.verbose_println(&format!("Found {}", path.display()));
    }
    config.success_println(&format!(
        "Bundle is complete ({} resources, {} binaries)",
        report.resources.len(),
        report.binaries.len()
    ));
    Ok(0)
}

/// Names the binaries carry inside the bundle.
///
/// The bundle holds the canonical file, so the names come from resolving the
/// dependencies on this host; when that fails the declared names are used.
fn bundled_binary_names(settings: &Settings, config: &RuntimeConfig) -> Vec<String> {
    match resolve_dependencies(
        settings.dependencies(),
        settings.search_path(),
        settings.project_root(),
    ) {
        Ok(resolved) => resolved.iter().map(|dep| dep.file_name()).collect(),
        Err(e) => {
            config.verbose_println(&format!("Using declared binary names: {}", e));
            settings
                .dependencies()
                .iter()
                .map(|dep| dep.binary.clone())
                .collect()
        }
    }
}
