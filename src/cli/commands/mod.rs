//! Command execution functions.
//!
//! Loads the project configuration, dispatches to the selected command and
//! turns failures into colored messages, recovery suggestions and an exit code.

mod build;
mod clean;
mod manifest;
mod verify;

pub use build::print_success_banner;

use crate::cli::{Args, Command, RuntimeConfig};
use crate::config::{self, CONFIG_FILE_NAME, PackagerConfig};
use crate::error::{CliError, Result};
use crate::pipeline::{Settings, SettingsBuilder};
use path_absolutize::Absolutize;
use std::path::PathBuf;

/// Execute the command selected by the parsed arguments
pub async fn execute_command(args: Args) -> Result<i32> {
    if let Err(reason) = args.validate() {
        return Err(CliError::InvalidArguments { reason }.into());
    }

    let config = RuntimeConfig::from(&args);
    let command = args.command();

    let result = match load_settings(&args) {
        Ok(settings) => match &command {
            Command::Build(build) => build::execute_build(settings, build, &config).await,
            Command::Clean => clean::execute_clean(&settings, &config).await,
            Command::Verify => verify::execute_verify(&settings, &config),
            Command::Manifest => manifest::execute_manifest(&settings, &config),
        },
        Err(e) => Err(e),
    };

    match result {
        Ok(exit_code) => Ok(exit_code),
        Err(e) => {
            config.error_println(&format!("Command '{}' failed: {}", command.name(), e));

            let suggestions = e.recovery_suggestions();
            if !suggestions.is_empty() {
                let _ = config.output().println("\n💡 Recovery suggestions:");
                for suggestion in suggestions {
                    let _ = config.output().indent(&format!("• {}", suggestion));
                }
            }

            Ok(e.exit_code())
        }
    }
}

/// Locates the project, loads its config and resolves the settings.
///
/// An explicit `--config` file fixes the project root to its directory unless
/// `--project-dir` is also given. Otherwise the root is the nearest ancestor of
/// the start directory holding a config file.
fn load_settings(args: &Args) -> Result<Settings> {
    let start = match &args.project_dir {
        Some(dir) => dir.absolutize()?.into_owned(),
        None => std::env::current_dir()?,
    };

    let (root, config_path) = match &args.config {
        Some(file) => {
            let file = file.absolutize()?.into_owned();
            let root = match &args.project_dir {
                Some(_) => start,
                None => file
                    .parent()
                    .map(PathBuf::from)
                    .unwrap_or_else(|| start.clone()),
            };
            (root, file)
        }
        None => {
            let root = config::find_project_root(&start)?;
            let file = root.join(CONFIG_FILE_NAME);
            (root, file)
        }
    };

    log::debug!("Project root {}, config {}", root.display(), config_path.display());
    let packager_config = PackagerConfig::load(&config_path)?;
    Ok(SettingsBuilder::from_config(&root, &packager_config).build()?)
}
