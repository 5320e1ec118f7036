//! Error types for pipeline operations.
//!
//! Provides contextual error chaining, filesystem-specific errors, and the
//! typed failure reasons of each fatal pipeline stage.
//!
//! # Features
//!
//! - **Context trait**: Add context to errors similar to anyhow
//! - **ErrorExt trait**: Filesystem operations with automatic path context
//!
//! # Example
//!
//! ```no_run
//! use app_packager::pipeline::{Context, ErrorExt, Result};
//! use std::path::Path;
//!
//! fn entry_point_name(path: &Path) -> Result<String> {
//!     std::fs::metadata(path).fs_context("reading entry point", path)?;
//!     let name = path.file_stem().context("entry point has no file name")?;
//!     Ok(name.to_string_lossy().into_owned())
//! }
//! ```

use super::{stage::Stage, verify::MissingItem};
use std::{
    fmt::Display,
    io,
    path::{self, PathBuf},
};
use thiserror::Error as DeriveError;

/// Errors returned by the pipeline.
#[derive(Debug, DeriveError)]
#[non_exhaustive]
pub enum Error {
    /// Error with context. Created by the [`Context`] trait.
    #[error("{0}: {1}")]
    Context(String, Box<Self>),

    /// A stage of the pipeline failed; the run was halted at `stage`.
    #[error("stage '{stage}' failed: {source}")]
    StageFailed {
        /// Stage that was running when the failure happened
        stage: Stage,
        /// The underlying failure
        source: Box<Self>,
    },

    /// File system error with path context.
    ///
    /// Created by the [`ErrorExt`] trait's `fs_context` method.
    #[error("{context} {path}: {error}")]
    Fs {
        /// Context describing the operation (e.g., "reading config file")
        context: &'static str,
        /// Path that was being accessed
        path: PathBuf,
        /// The underlying I/O error
        error: io::Error,
    },

    /// Child process could not be started.
    #[error("failed to run command {command}: {error}")]
    CommandFailed {
        /// Command that failed to execute
        command: String,
        /// The underlying error
        error: io::Error,
    },

    /// Child process ran but exited unsuccessfully.
    #[error("command {command} exited with {}", describe_code(*.code))]
    CommandStatus {
        /// Command that exited unsuccessfully
        command: String,
        /// Exit code, `None` when terminated by a signal
        code: Option<i32>,
    },

    /// A required native tool could not be found on the host.
    #[error("required tool '{binary}' ({id}) not found on the host: {error}")]
    MissingDependency {
        /// Logical identifier of the dependency (e.g. "codec")
        id: String,
        /// Executable name that was looked up
        binary: String,
        /// The lookup failure
        error: which::Error,
    },

    /// A project input (entry point, icon, data directory) is missing.
    #[error("{what} not found at {path}")]
    MissingInput {
        /// Human readable name of the input
        what: &'static str,
        /// Path where it was expected
        path: PathBuf,
    },

    /// Output directories survived cleanup.
    #[error("build environment is not clean, stale paths remain: {}", join_paths(.paths))]
    StaleBuildEnvironment {
        /// Directories that still exist
        paths: Vec<PathBuf>,
    },

    /// The packaging tool reported success but produced no bundle.
    #[error("bundle not found at {0}")]
    BundleNotFound(PathBuf),

    /// The produced bundle lacks required content.
    #[error("bundle {bundle} is incomplete: {}", join_missing(.missing))]
    VerificationFailed {
        /// Bundle that was verified
        bundle: PathBuf,
        /// Every item that was not found
        missing: Vec<MissingItem>,
    },

    /// An output directory would resolve onto, above, or outside the project root.
    #[error("{field} must be a directory inside the project root, got {}", .path.display())]
    UnsafeOutputDir {
        /// Setting that names the directory
        field: &'static str,
        /// The resolved path
        path: PathBuf,
    },

    /// A stage was entered out of order.
    #[error("invalid stage transition from '{from}' to '{to}'")]
    InvalidTransition {
        /// Current stage
        from: Stage,
        /// Requested stage
        to: Stage,
    },

    /// Generic I/O error.
    #[error("{0}")]
    IoError(#[from] io::Error),

    /// Error walking a directory tree.
    #[error("{0}")]
    WalkdirError(#[from] walkdir::Error),

    /// Path prefix stripping error.
    #[error("{0}")]
    StripError(#[from] path::StripPrefixError),

    /// ZIP archive creation error.
    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    /// Generic error with custom message.
    #[error("{0}")]
    GenericError(String),
}

fn describe_code(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "termination by signal".to_string(),
    }
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_missing(missing: &[MissingItem]) -> String {
    missing
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    /// Exit code of the external command that caused this error, if any.
    ///
    /// Looks through [`Error::Context`] and [`Error::StageFailed`] wrappers so
    /// that the process can propagate the failing tool's own status.
    pub fn command_exit_code(&self) -> Option<i32> {
        match self {
            Error::CommandStatus { code, .. } => code.filter(|c| *c != 0),
            Error::Context(_, inner) => inner.command_exit_code(),
            Error::StageFailed { source, .. } => source.command_exit_code(),
            _ => None,
        }
    }

    /// Stage at which the pipeline halted, if this error came from a run.
    pub fn failed_stage(&self) -> Option<Stage> {
        match self {
            Error::StageFailed { stage, .. } => Some(*stage),
            Error::Context(_, inner) => inner.failed_stage(),
            _ => None,
        }
    }

    /// Innermost error, with context and stage wrappers removed.
    pub fn root(&self) -> &Error {
        match self {
            Error::Context(_, inner) => inner.root(),
            Error::StageFailed { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Convenient type alias for Result.
pub type Result<T> = std::result::Result<T, Error>;

/// Trait for adding context to errors.
///
/// Similar to `anyhow::Context` but integrated with the pipeline's Error type.
/// Works with both `Result<T, E>` and `Option<T>`.
pub trait Context<T> {
    /// Add context to an error.
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static;
}

impl<T> Context<T> for Result<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.map_err(|e| Error::Context(context.to_string(), Box::new(e)))
    }
}

impl<T> Context<T> for Option<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.ok_or_else(|| Error::GenericError(context.to_string()))
    }
}

/// Extension trait for filesystem operations with automatic path context.
pub trait ErrorExt<T> {
    /// Add filesystem context to an I/O error.
    ///
    /// The `context` should be a present-tense verb phrase describing the operation,
    /// e.g., "reading file", "creating directory", "removing archive".
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, std::io::Error> {
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|error| Error::Fs {
            context,
            path: path.into(),
            error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_exit_code_through_wrappers() {
        let err = Error::StageFailed {
            stage: Stage::Packaging,
            source: Box::new(Error::Context(
                "running packaging tool".into(),
                Box::new(Error::CommandStatus {
                    command: "pyinstaller".into(),
                    code: Some(3),
                }),
            )),
        };
        assert_eq!(err.command_exit_code(), Some(3));
        assert_eq!(err.failed_stage(), Some(Stage::Packaging));
        assert!(matches!(err.root(), Error::CommandStatus { .. }));
    }

    #[test]
    fn test_signal_termination_has_no_exit_code() {
        let err = Error::CommandStatus {
            command: "ditto".into(),
            code: None,
        };
        assert_eq!(err.command_exit_code(), None);
        assert!(err.to_string().contains("signal"));
    }

    #[test]
    fn test_option_context() {
        let missing: Option<u8> = None;
        let err = missing.context("no value").unwrap_err();
        assert_eq!(err.to_string(), "no value");
    }
}
