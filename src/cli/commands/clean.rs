//! Clean command implementation.
//!
//! Runs only the cleanup stage, then checks that nothing survived.

use crate::cli::RuntimeConfig;
use crate::error::Result;
use crate::pipeline::{Settings, clean_build_environment, default_metadata_cleaner, ensure_clean};

/// Execute clean command
pub(super) async fn execute_clean(settings: &Settings, config: &RuntimeConfig) -> Result<i32> {
    let _ = config.output().section("Cleaning build environment");

    let cleaner = default_metadata_cleaner();
    let report = clean_build_environment(settings, cleaner.as_ref()).await;

    for dir in &report.removed_dirs {
        config.verbose_println(&format!("Removed {}", dir.display()));
    }
    for descriptor in &report.removed_descriptors {
        config.verbose_println(&format!("Removed {}", descriptor.display()));
    }
    for (path, reason) in &report.failures {
        config.warning_println(&format!("Could not remove {}: {}", path.display(), reason));
    }

    ensure_clean(settings)?;

    if report.removed_dirs.is_empty() && report.removed_descriptors.is_empty() {
        config.success_println("Nothing to clean");
    } else {
        config.success_println(&format!(
            "Removed {} directories and {} descriptor files",
            report.removed_dirs.len(),
            report.removed_descriptors.len()
        ));
    }
    Ok(0)
}
