//! Manifest command implementation.
//!
//! Resolves dependencies and prints the packaging command a build would run.

use crate::cli::RuntimeConfig;
use crate::error::Result;
use crate::pipeline::{BundleManifest, Settings, resolve_dependencies};
use std::ffi::OsStr;

/// Execute manifest command
pub(super) fn execute_manifest(settings: &Settings, config: &RuntimeConfig) -> Result<i32> {
    let dependencies = resolve_dependencies(
        settings.dependencies(),
        settings.search_path(),
        settings.project_root(),
    )?;
    let manifest = BundleManifest::from_settings(settings, &dependencies)?;

    let _ = config.output().section("Native dependencies");
    for dep in &dependencies {
        let _ = config
            .output()
            .indent(&format!("{} ({}): {}", dep.binary, dep.id, dep.path.display()));
    }

    let _ = config.output().section("Packaging command");
    let _ = config
        .output()
        .println(&format!("cd {}", shell_quote(settings.project_root().as_os_str())));
    let mut line = shell_quote(OsStr::new(settings.tool()));
    for arg in manifest.to_args() {
        line.push_str(" \\\n    ");
        line.push_str(&shell_quote(&arg));
    }
    let _ = config.output().println(&line);
    Ok(0)
}

/// Single-quotes an argument when the shell would otherwise split or expand it.
fn shell_quote(arg: &OsStr) -> String {
    let text = arg.to_string_lossy();
    let plain = !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=,+@".contains(c));

    if plain {
        text.into_owned()
    } else {
        format!("'{}'", text.replace('\'', r"'\''"))
    }
}
