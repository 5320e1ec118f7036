//! Command line interface for app_packager.
//!
//! Argument parsing, command dispatch and colored user feedback around the
//! packaging pipeline.

mod args;
pub mod commands;
mod output;

pub use args::{Args, BuildArgs, Command, RuntimeConfig};
pub use commands::{execute_command, print_success_banner};
pub use output::OutputManager;

use crate::error::Result;

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    execute_command(args).await
}
