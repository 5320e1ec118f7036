//! Build command implementation.
//!
//! Runs the whole pipeline and prints the success banner.

use crate::cli::{BuildArgs, OutputManager, RuntimeConfig};
use crate::error::Result;
use crate::pipeline::{BuildArtifacts, Pipeline, Settings};

/// Execute build command
pub(super) async fn execute_build(
    settings: Settings,
    args: &BuildArgs,
    config: &RuntimeConfig,
) -> Result<i32> {
    let mut settings = settings;
    if let Some(format) = args.archive_format {
        settings = settings.with_archive_format(format);
    }
    if args.no_terminate {
        settings = settings.with_terminate(false);
    }

    let _ = config
        .output()
        .section(&format!("Packaging {}", settings.app_name()));
    config.verbose_println(&format!("Project root: {}", settings.project_root().display()));
    config.verbose_println(&format!("Packaging tool: {}", settings.tool()));
    config.verbose_println(&format!("Archive format: {}", settings.archive_format().resolve()));
    config.progress_println("terminate → clean → resolve → package → verify → archive");

    let mut pipeline = Pipeline::new(settings);
    let artifacts = pipeline.run().await?;

    for dep in &artifacts.dependencies {
        config.verbose_println(&format!("Bundled {} from {}", dep.binary, dep.path.display()));
    }
    if !artifacts.clean.is_complete() {
        config.warning_println("Cleanup left some files behind; see the log for details");
    }

    print_success_banner(&artifacts, config.output());
    Ok(0)
}

/// Prints the delimited success banner with both artifact paths.
pub fn print_success_banner(artifacts: &BuildArtifacts, output: &OutputManager) {
    let _ = output.println("");
    let _ = output.rule();
    let _ = output.success("BUILD SUCCESS");
    let _ = output.rule();
    let _ = output.println(&format!("App:     {}", artifacts.bundle_path.display()));
    let _ = output.println(&format!("Archive: {}", artifacts.archive_path.display()));
    let _ = output.indent(&format!("Size:   {}", format_size(artifacts.archive_size)));
    let _ = output.indent(&format!("SHA256: {}", artifacts.checksum));
    let _ = output.rule();
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}
