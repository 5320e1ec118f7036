//! # app_packager
//!
//! Reproducible packaging for a desktop application: one command turns a
//! project into a verified `<Name>.app` bundle and a distributable archive.
//!
//! ## Features
//!
//! - **Clean builds**: stale instances are stopped and prior outputs removed
//!   before anything is built
//! - **Native tools bundled**: `ffmpeg`/`ffprobe` (or any configured tools) are
//!   resolved on the host and embedded in the bundle
//! - **Verified output**: the bundle is checked for every required resource
//!   and binary before it is archived
//! - **Single-entry archives**: the archive unpacks to exactly `<Name>.app`
//!
//! ## Usage
//!
//! ```bash
//! app_packager                       # full build from the nearest Packager.toml
//! app_packager build --no-terminate  # skip stopping running instances
//! app_packager clean                 # remove dist/, build/ and *.spec
//! app_packager verify                # check an existing bundle
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod cli;
pub mod config;
pub mod error;
pub mod pipeline;

pub use cli::Args;
pub use config::PackagerConfig;
pub use error::{CliError, ConfigError, PackagerError, Result};
pub use pipeline::{BuildArtifacts, Pipeline, Settings, SettingsBuilder};
