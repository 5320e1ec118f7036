//! Reproducible packaging pipeline for a desktop application.
//!
//! Turns a project into a self-contained `<Name>.app` bundle and a
//! distributable archive, in strictly ordered stages:
//!
//! | Stage | Failure |
//! |-------|---------|
//! | terminate stale instances | ignored |
//! | clean `dist/`, `build/`, `*.spec` | ignored, checked before packaging |
//! | resolve native dependencies | fatal |
//! | run the packaging tool | fatal, exit code propagated |
//! | verify the bundle | fatal, every missing item listed |
//! | archive | fatal |
//! | report | fatal |
//!
//! Each stage is also available as a free function so it can be run on its
//! own (see the `clean`, `verify` and `manifest` commands).

#![warn(missing_docs)]

mod archive;
mod builder;
mod checksum;
mod clean;
mod error;
mod manifest;
mod package;
mod resolve;
mod settings;
mod stage;
mod terminate;
mod utils;
mod verify;

pub use archive::{ArchiveFormat, create_archive};
pub use builder::{BuildArtifacts, Pipeline};
pub use checksum::calculate_sha256;
pub use clean::{
    CleanReport, MetadataCleaner, NoopMetadataCleaner, XattrCleaner, clean_build_environment,
    default_metadata_cleaner, ensure_clean,
};
pub use error::{Context, Error, ErrorExt, Result};
pub use manifest::{BundleInput, BundleManifest};
pub use package::run_packaging_tool;
pub use resolve::{ResolvedDependency, resolve_dependencies};
pub use settings::{Settings, SettingsBuilder};
pub use stage::Stage;
pub use terminate::{
    NoopTerminator, ProcessTerminator, SysinfoTerminator, terminate_stale_instances,
};
pub use verify::{BINARY_LOCATIONS, MissingItem, RESOURCES_DIR, VerificationReport, verify_bundle};
