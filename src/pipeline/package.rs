//! Packaging tool invocation.

use super::{
    clean::ensure_clean,
    error::{Error, Result},
    manifest::BundleManifest,
    settings::Settings,
};
use std::process::Stdio;
use tokio::process::Command;

/// Runs the packaging tool for `manifest` from the project root.
///
/// The tool's output streams straight to the terminal. Refuses to start when
/// an output directory survived cleanup.
///
/// # Errors
///
/// - [`Error::StaleBuildEnvironment`] if `dist/` or `build/` still exist
/// - [`Error::CommandFailed`] if the tool cannot be started
/// - [`Error::CommandStatus`] if it exits unsuccessfully
pub async fn run_packaging_tool(settings: &Settings, manifest: &BundleManifest) -> Result<()> {
    ensure_clean(settings)?;

    let tool = settings.tool();
    let args = manifest.to_args();
    log::info!("Running {} for {}", tool, manifest.name);
    log::debug!("{} {:?}", tool, args);

    let status = Command::new(tool)
        .args(&args)
        .current_dir(settings.project_root())
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .map_err(|error| Error::CommandFailed {
            command: tool.to_string(),
            error,
        })?;

    if !status.success() {
        return Err(Error::CommandStatus {
            command: tool.to_string(),
            code: status.code(),
        });
    }

    Ok(())
}
