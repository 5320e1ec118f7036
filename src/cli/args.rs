//! Command line argument parsing and validation.
//!
//! With no subcommand the tool runs the full build, so a bare `app_packager`
//! in the project directory does the whole job.

use crate::pipeline::ArchiveFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Reproducible packaging for desktop applications
#[derive(Parser, Debug)]
#[command(
    name = "app_packager",
    version,
    about = "Bundle a desktop application with its native tools into a verified archive",
    long_about = "Bundle a desktop application with its native tools into a verified archive.

Stages: terminate stale instances, clean dist/ and build/, resolve native
dependencies, run the packaging tool, verify the bundle, archive it.

Usage:
  app_packager                     # full build from the nearest Packager.toml
  app_packager -C ~/src/transcriber build --archive-format zip
  app_packager verify              # check an existing bundle
  app_packager manifest            # print the packaging command"
)]
pub struct Args {
    /// Start project discovery from DIR instead of the current directory
    #[arg(short = 'C', long, value_name = "DIR", global = true)]
    pub project_dir: Option<PathBuf>,

    /// Use an explicit config file; its directory is the project root
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Show detailed progress
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Command to run (defaults to build)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the full pipeline (default when no command is given)
    Build(BuildArgs),

    /// Run only the cleanup stage
    Clean,

    /// Verify an existing bundle in the dist directory
    Verify,

    /// Resolve dependencies and print the packaging command without running it
    Manifest,
}

/// Options of the build command
#[derive(clap::Args, Debug, Clone, Default)]
pub struct BuildArgs {
    /// Archive writer (auto, ditto, zip, tar-gz)
    #[arg(long, value_enum, value_name = "FMT")]
    pub archive_format: Option<ArchiveFormat>,

    /// Skip stale-instance termination
    #[arg(long)]
    pub no_terminate: bool,
}

impl Command {
    /// Get command name for display
    pub fn name(&self) -> &'static str {
        match self {
            Command::Build(_) => "build",
            Command::Clean => "clean",
            Command::Verify => "verify",
            Command::Manifest => "manifest",
        }
    }
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The command to run, defaulting to a plain build.
    pub fn command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or_else(|| Command::Build(BuildArgs::default()))
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        if let Some(config) = &self.config
            && config.file_name().is_none()
        {
            return Err(format!("--config must name a file, got {}", config.display()));
        }

        Ok(())
    }
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    output: super::OutputManager,
}

impl RuntimeConfig {
    /// Create runtime configuration
    pub fn new(verbose: bool) -> Self {
        Self {
            output: super::OutputManager::new(verbose),
        }
    }

    /// Get a reference to the output manager
    pub fn output(&self) -> &super::OutputManager {
        &self.output
    }

    /// Print verbose message
    pub fn verbose_println(&self, message: &str) {
        let _ = self.output.verbose(message);
    }

    /// Print error message (always shown)
    pub fn error_println(&self, message: &str) {
        self.output.error(message);
    }

    /// Print warning message
    pub fn warning_println(&self, message: &str) {
        let _ = self.output.warn(message);
    }

    /// Print success message
    pub fn success_println(&self, message: &str) {
        let _ = self.output.success(message);
    }

    /// Print a progress line
    pub fn progress_println(&self, message: &str) {
        let _ = self.output.progress(message);
    }
}

impl From<&Args> for RuntimeConfig {
    fn from(args: &Args) -> Self {
        Self::new(args.verbose)
    }
}
