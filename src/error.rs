//! Error types for app_packager operations.
//!
//! This module defines the top-level error with actionable messages, recovery
//! suggestions, and the mapping to process exit codes.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for app_packager operations
pub type Result<T> = std::result::Result<T, PackagerError>;

/// Main error type for all app_packager operations
#[derive(Error, Debug)]
pub enum PackagerError {
    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// Pipeline errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] crate::pipeline::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors loading `Packager.toml`
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No config file in the start directory or any ancestor
    #[error(
        "could not find {} in {} or any parent directory",
        crate::config::CONFIG_FILE_NAME,
        start.display()
    )]
    NotFound {
        /// Directory the search started from
        start: PathBuf,
    },

    /// Config file could not be read
    #[error("failed to read {path}: {source}")]
    Read {
        /// Config file path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML or does not match the schema
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// Config file path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: toml::de::Error,
    },

    /// A field has an invalid value
    #[error("invalid value for '{field}': {reason}")]
    Invalid {
        /// Dotted field name
        field: String,
        /// Reason for the error
        reason: String,
    },
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },
}

impl PackagerError {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        use crate::pipeline::Error as PipelineError;

        match self {
            PackagerError::Config(ConfigError::NotFound { .. }) => vec![
                format!(
                    "Create a {} in the project root with at least [app] name = \"...\"",
                    crate::config::CONFIG_FILE_NAME
                ),
                "Or point at an existing file with --config <FILE>".to_string(),
            ],
            PackagerError::Config(_) => {
                vec!["Fix the reported field in the config file and re-run".to_string()]
            }
            PackagerError::Pipeline(e) => match e.root() {
                PipelineError::MissingDependency { binary, .. } => vec![
                    format!("Install {binary} (on macOS: brew install ffmpeg)"),
                    "Make sure it is on PATH, or set packaging.search_path".to_string(),
                ],
                PipelineError::MissingInput { path, .. } => {
                    vec![format!("Create {} or fix its path in the config", path.display())]
                }
                PipelineError::StaleBuildEnvironment { .. } => vec![
                    "Remove the listed directories manually (they may be owned by another user)"
                        .to_string(),
                    "Quit any running copy of the application and re-run".to_string(),
                ],
                PipelineError::UnsafeOutputDir { field, .. } => vec![format!(
                    "Point packaging.{field} at a subdirectory of the project root, e.g. \"dist\""
                )],
                PipelineError::CommandFailed { command, .. } => {
                    vec![format!("Check that '{command}' is installed and executable")]
                }
                PipelineError::VerificationFailed { .. } => vec![
                    "Check packaging.collect_data and dependencies in the config".to_string(),
                    "Inspect the packaging tool output above for skipped files".to_string(),
                ],
                _ => vec!["Check the error message above for specific details".to_string()],
            },
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }

    /// Process exit code for this error.
    ///
    /// Propagates the exit code of a failing external command when there is
    /// one, otherwise `1`.
    pub fn exit_code(&self) -> i32 {
        match self {
            PackagerError::Pipeline(e) => e.command_exit_code().unwrap_or(1),
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Error as PipelineError, Stage};

    #[test]
    fn test_exit_code_propagates_tool_status() {
        let err = PackagerError::from(PipelineError::StageFailed {
            stage: Stage::Packaging,
            source: Box::new(PipelineError::CommandStatus {
                command: "pyinstaller".into(),
                code: Some(2),
            }),
        });
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_defaults_to_one() {
        let err = PackagerError::from(ConfigError::Invalid {
            field: "app.name".into(),
            reason: "empty".into(),
        });
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_missing_dependency_suggests_install() {
        let which_err = which::which_in("definitely-not-a-tool", Some(""), "/").unwrap_err();
        let err = PackagerError::from(PipelineError::StageFailed {
            stage: Stage::ResolvingDeps,
            source: Box::new(PipelineError::MissingDependency {
                id: "codec".into(),
                binary: "ffmpeg".into(),
                error: which_err,
            }),
        });
        let suggestions = err.recovery_suggestions();
        assert!(suggestions[0].contains("ffmpeg"));
    }
}
