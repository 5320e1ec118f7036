//! Distributable archive creation.
//!
//! The archive holds exactly one top-level entry, the `<Name>.app` bundle
//! directory, so that extracting it yields a runnable application. Any
//! previous archive at the destination is removed first.

use super::{
    error::{Context, Error, ErrorExt, Result},
    utils::fs,
};
use flate2::{Compression, write::GzEncoder};
use serde::Deserialize;
use std::{
    fmt,
    io::{self, Write},
    path::{Path, PathBuf},
    process::Stdio,
    str::FromStr,
};
use tokio::process::Command;
use walkdir::WalkDir;
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

/// How the archive is written.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ArchiveFormat {
    /// `ditto` on macOS, `zip` elsewhere.
    #[default]
    Auto,
    /// macOS `ditto -c -k --keepParent`; preserves resource forks and signatures.
    Ditto,
    /// Zip written in-process.
    Zip,
    /// Gzipped tarball written in-process.
    TarGz,
}

impl ArchiveFormat {
    /// Replaces [`ArchiveFormat::Auto`] with the writer for the host.
    pub fn resolve(self) -> ArchiveFormat {
        match self {
            ArchiveFormat::Auto if cfg!(target_os = "macos") => ArchiveFormat::Ditto,
            ArchiveFormat::Auto => ArchiveFormat::Zip,
            other => other,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            ArchiveFormat::Auto => "auto",
            ArchiveFormat::Ditto => "ditto",
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::TarGz => "tar-gz",
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArchiveFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "auto" => Ok(ArchiveFormat::Auto),
            "ditto" => Ok(ArchiveFormat::Ditto),
            "zip" => Ok(ArchiveFormat::Zip),
            "tar-gz" => Ok(ArchiveFormat::TarGz),
            other => Err(Error::GenericError(format!(
                "unknown archive format '{other}' (expected auto, ditto, zip or tar-gz)"
            ))),
        }
    }
}

/// Writes `bundle` into a fresh archive at `archive`.
///
/// # Errors
///
/// Fails if the bundle does not exist, the old archive cannot be removed, or
/// the writer fails.
pub async fn create_archive(bundle: &Path, archive: &Path, format: ArchiveFormat) -> Result<()> {
    if !bundle.is_dir() {
        return Err(Error::BundleNotFound(bundle.to_path_buf()));
    }
    let bundle_name = bundle
        .file_name()
        .context("bundle path has no file name")?
        .to_string_lossy()
        .into_owned();

    fs::remove_file(archive).await?;
    if let Some(parent) = archive.parent() {
        fs::create_dir_all(parent).await?;
    }

    let format = format.resolve();
    log::info!("Archiving {} to {} ({})", bundle.display(), archive.display(), format);

    match format {
        ArchiveFormat::Ditto => ditto(bundle, archive).await,
        ArchiveFormat::Zip | ArchiveFormat::Auto => {
            blocking(bundle, archive, move |bundle, archive| {
                zip_dir(&bundle, &bundle_name, &archive)
            })
            .await
        }
        ArchiveFormat::TarGz => {
            blocking(bundle, archive, move |bundle, archive| {
                tar_gz_dir(&bundle, &bundle_name, &archive)
            })
            .await
        }
    }
}

async fn blocking<F>(bundle: &Path, archive: &Path, f: F) -> Result<()>
where
    F: FnOnce(PathBuf, PathBuf) -> Result<()> + Send + 'static,
{
    let bundle = bundle.to_path_buf();
    let archive = archive.to_path_buf();
    tokio::task::spawn_blocking(move || f(bundle, archive))
        .await
        .map_err(|e| Error::GenericError(format!("Archive task panicked: {}", e)))?
}

async fn ditto(bundle: &Path, archive: &Path) -> Result<()> {
    let status = Command::new("ditto")
        .args(["-c", "-k", "--sequesterRsrc", "--keepParent"])
        .arg(bundle)
        .arg(archive)
        .stdin(Stdio::null())
        .status()
        .await
        .map_err(|error| Error::CommandFailed {
            command: "ditto".to_string(),
            error,
        })?;

    if status.success() {
        Ok(())
    } else {
        Err(Error::CommandStatus {
            command: "ditto".to_string(),
            code: status.code(),
        })
    }
}

/// Entry name inside the archive: `<bundle_name>/<relative path>` with `/` separators.
fn entry_name(bundle_name: &str, relative: &Path) -> String {
    let mut name = bundle_name.to_string();
    for component in relative.components() {
        name.push('/');
        name.push_str(&component.as_os_str().to_string_lossy());
    }
    name
}

fn zip_dir(bundle: &Path, bundle_name: &str, archive: &Path) -> Result<()> {
    let file = std::fs::File::create(archive).fs_context("creating archive", archive)?;
    let mut zip = ZipWriter::new(file);
    let base = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in WalkDir::new(bundle).follow_links(false).sort_by_file_name() {
        let entry = entry?;
        let relative = entry.path().strip_prefix(bundle)?;
        let name = entry_name(bundle_name, relative);
        let metadata = entry.path().symlink_metadata()?;
        let options = with_mode(base, &metadata);

        if entry.file_type().is_symlink() {
            let target = std::fs::read_link(entry.path())?;
            zip.add_symlink(name, target.to_string_lossy(), options)?;
        } else if entry.file_type().is_dir() {
            zip.add_directory(name, options)?;
        } else {
            zip.start_file(name, options)?;
            let mut source = std::fs::File::open(entry.path())?;
            io::copy(&mut source, &mut zip)?;
        }
    }

    let mut file = zip.finish()?;
    file.flush()?;
    Ok(())
}

#[cfg(unix)]
fn with_mode(options: SimpleFileOptions, metadata: &std::fs::Metadata) -> SimpleFileOptions {
    use std::os::unix::fs::PermissionsExt;
    options.unix_permissions(metadata.permissions().mode() & 0o7777)
}

#[cfg(not(unix))]
fn with_mode(options: SimpleFileOptions, _metadata: &std::fs::Metadata) -> SimpleFileOptions {
    options
}

fn tar_gz_dir(bundle: &Path, bundle_name: &str, archive: &Path) -> Result<()> {
    let file = std::fs::File::create(archive).fs_context("creating archive", archive)?;
    let enc = GzEncoder::new(file, Compression::default());
    let mut tar = tar::Builder::new(enc);
    tar.follow_symlinks(false);
    tar.append_dir_all(bundle_name, bundle)?;

    let enc = tar.into_inner()?;
    let mut finished = enc.finish()?;
    finished.flush()?;
    Ok(())
}
