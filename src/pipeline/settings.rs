//! Resolved pipeline settings.
//!
//! [`Settings`] is the configuration anchored to a project root: every path
//! absolute, every default filled in. Construct it with [`SettingsBuilder`],
//! either field by field or from a parsed [`PackagerConfig`].

use super::{
    archive::ArchiveFormat,
    error::{Error, Result},
};
use crate::config::{
    self, ArchiveConfig, DataEntry, DependencySpec, PackagerConfig, PackagingConfig, VerifyConfig,
};
use path_absolutize::Absolutize;
use std::path::{Path, PathBuf};

/// Main settings for a pipeline run.
///
/// # Examples
///
/// ```no_run
/// use app_packager::pipeline::SettingsBuilder;
///
/// # fn example() -> app_packager::pipeline::Result<()> {
/// let settings = SettingsBuilder::new("/work/transcriber")
///     .app_name("Transcriber")
///     .build()?;
///
/// assert!(settings.bundle_path().ends_with("dist/Transcriber.app"));
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Settings {
    project_root: PathBuf,
    app_name: String,
    entry_point: PathBuf,
    icon: PathBuf,
    windowed: bool,
    data: Vec<DataEntry>,
    dependencies: Vec<DependencySpec>,
    tool: String,
    dist_dir: PathBuf,
    work_dir: PathBuf,
    collect_data: Vec<String>,
    hidden_imports: Vec<String>,
    extra_args: Vec<String>,
    search_path: Option<String>,
    required_resources: Vec<PathBuf>,
    archive_suffix: String,
    archive_format: ArchiveFormat,
    terminate: bool,
}

impl Settings {
    /// Project root; the packaging tool runs with this as its working directory.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Display name of the application.
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Absolute path of the entry point script.
    pub fn entry_point(&self) -> &Path {
        &self.entry_point
    }

    /// Absolute path of the icon resource.
    pub fn icon(&self) -> &Path {
        &self.icon
    }

    /// Whether the bundle is a windowed application.
    pub fn windowed(&self) -> bool {
        self.windowed
    }

    /// Data directories, sources absolute.
    pub fn data(&self) -> &[DataEntry] {
        &self.data
    }

    /// Native dependencies to resolve.
    pub fn dependencies(&self) -> &[DependencySpec] {
        &self.dependencies
    }

    /// Packaging tool executable.
    pub fn tool(&self) -> &str {
        &self.tool
    }

    /// Absolute output directory.
    pub fn dist_dir(&self) -> &Path {
        &self.dist_dir
    }

    /// Absolute scratch directory of the packaging tool.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Packages whose data files are collected.
    pub fn collect_data(&self) -> &[String] {
        &self.collect_data
    }

    /// Packages force-included as hidden imports.
    pub fn hidden_imports(&self) -> &[String] {
        &self.hidden_imports
    }

    /// Extra packaging tool arguments.
    pub fn extra_args(&self) -> &[String] {
        &self.extra_args
    }

    /// PATH override for dependency lookup.
    pub fn search_path(&self) -> Option<&str> {
        self.search_path.as_deref()
    }

    /// Files required under `Contents/Resources`.
    pub fn required_resources(&self) -> &[PathBuf] {
        &self.required_resources
    }

    /// Archive writer.
    pub fn archive_format(&self) -> ArchiveFormat {
        self.archive_format
    }

    /// Whether stale instances are signalled before cleaning.
    pub fn terminate(&self) -> bool {
        self.terminate
    }

    /// Bundle directory name, e.g. `Transcriber.app`.
    pub fn bundle_name(&self) -> String {
        format!("{}.app", self.app_name)
    }

    /// Where the packaging tool writes the bundle.
    pub fn bundle_path(&self) -> PathBuf {
        self.dist_dir.join(self.bundle_name())
    }

    /// Where the distributable archive is written.
    pub fn archive_path(&self) -> PathBuf {
        self.dist_dir
            .join(format!("{}{}", self.app_name, self.archive_suffix))
    }

    /// Output directories removed by cleanup.
    pub fn artifact_dirs(&self) -> Vec<PathBuf> {
        vec![self.dist_dir.clone(), self.work_dir.clone()]
    }

    /// Glob matching packaging-tool descriptor files left in the project root.
    pub fn descriptor_pattern(&self) -> String {
        let root = glob::Pattern::escape(&self.project_root.to_string_lossy());
        format!("{root}/*.spec")
    }

    /// Returns a copy with a different archive writer.
    pub fn with_archive_format(mut self, format: ArchiveFormat) -> Self {
        self.archive_format = format;
        self
    }

    /// Returns a copy with termination switched on or off.
    pub fn with_terminate(mut self, terminate: bool) -> Self {
        self.terminate = terminate;
        self
    }
}

/// Builder for constructing [`Settings`].
#[derive(Debug, Clone)]
pub struct SettingsBuilder {
    project_root: PathBuf,
    app_name: Option<String>,
    entry_point: PathBuf,
    icon: PathBuf,
    windowed: bool,
    data: Vec<DataEntry>,
    dependencies: Vec<DependencySpec>,
    tool: String,
    dist_dir: PathBuf,
    work_dir: PathBuf,
    collect_data: Vec<String>,
    hidden_imports: Vec<String>,
    extra_args: Vec<String>,
    search_path: Option<String>,
    required_resources: Vec<PathBuf>,
    archive_suffix: String,
    archive_format: ArchiveFormat,
    terminate: bool,
}

impl SettingsBuilder {
    /// Creates a builder with the config-file defaults, anchored at `project_root`.
    pub fn new<P: AsRef<Path>>(project_root: P) -> Self {
        let packaging = PackagingConfig::default();
        let verify = VerifyConfig::default();
        let archive = ArchiveConfig::default();

        Self {
            project_root: project_root.as_ref().to_path_buf(),
            app_name: None,
            entry_point: config::default_entry_point(),
            icon: config::default_icon(),
            windowed: true,
            data: config::default_data(),
            dependencies: config::default_dependencies(),
            tool: packaging.tool,
            dist_dir: packaging.dist_dir,
            work_dir: packaging.work_dir,
            collect_data: packaging.collect_data,
            hidden_imports: packaging.hidden_imports,
            extra_args: packaging.extra_args,
            search_path: packaging.search_path,
            required_resources: verify.required_resources,
            archive_suffix: archive.suffix,
            archive_format: archive.format,
            terminate: true,
        }
    }

    /// Creates a builder holding every value of a parsed config.
    pub fn from_config<P: AsRef<Path>>(project_root: P, config: &PackagerConfig) -> Self {
        Self {
            project_root: project_root.as_ref().to_path_buf(),
            app_name: Some(config.app.name.clone()),
            entry_point: config.app.entry_point.clone(),
            icon: config.app.icon.clone(),
            windowed: config.app.windowed,
            data: config.data.clone(),
            dependencies: config.dependencies.clone(),
            tool: config.packaging.tool.clone(),
            dist_dir: config.packaging.dist_dir.clone(),
            work_dir: config.packaging.work_dir.clone(),
            collect_data: config.packaging.collect_data.clone(),
            hidden_imports: config.packaging.hidden_imports.clone(),
            extra_args: config.packaging.extra_args.clone(),
            search_path: config.packaging.search_path.clone(),
            required_resources: config.verify.required_resources.clone(),
            archive_suffix: config.archive.suffix.clone(),
            archive_format: config.archive.format,
            terminate: config.terminate.enabled,
        }
    }

    /// Sets the display name.
    ///
    /// # Required
    ///
    /// This field is required for building.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    /// Sets the entry point script (relative to the project root).
    pub fn entry_point<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.entry_point = path.as_ref().to_path_buf();
        self
    }

    /// Sets the icon resource (relative to the project root).
    pub fn icon<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.icon = path.as_ref().to_path_buf();
        self
    }

    /// Sets the data directories.
    pub fn data(mut self, data: Vec<DataEntry>) -> Self {
        self.data = data;
        self
    }

    /// Sets the native dependencies.
    pub fn dependencies(mut self, dependencies: Vec<DependencySpec>) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// Sets the packaging tool executable.
    pub fn tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = tool.into();
        self
    }

    /// Sets the output directory (relative to the project root).
    pub fn dist_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.dist_dir = path.as_ref().to_path_buf();
        self
    }

    /// Sets the packaging tool's scratch directory (relative to the project root).
    pub fn work_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.work_dir = path.as_ref().to_path_buf();
        self
    }

    /// Sets the archive file name suffix appended to the app name.
    pub fn archive_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.archive_suffix = suffix.into();
        self
    }

    /// Sets packages whose data files are collected.
    pub fn collect_data(mut self, packages: Vec<String>) -> Self {
        self.collect_data = packages;
        self
    }

    /// Sets packages force-included as hidden imports.
    pub fn hidden_imports(mut self, packages: Vec<String>) -> Self {
        self.hidden_imports = packages;
        self
    }

    /// Sets the PATH override for dependency lookup.
    pub fn search_path(mut self, search_path: impl Into<String>) -> Self {
        self.search_path = Some(search_path.into());
        self
    }

    /// Sets the files required under `Contents/Resources`.
    pub fn required_resources(mut self, resources: Vec<PathBuf>) -> Self {
        self.required_resources = resources;
        self
    }

    /// Sets the archive writer.
    pub fn archive_format(mut self, format: ArchiveFormat) -> Self {
        self.archive_format = format;
        self
    }

    /// Enables or disables stale instance termination.
    pub fn terminate(mut self, terminate: bool) -> Self {
        self.terminate = terminate;
        self
    }

    /// Builds the settings, making every path absolute.
    ///
    /// # Errors
    ///
    /// Returns an error if `app_name` is missing, a path cannot be made
    /// absolute, or an output directory is not strictly inside the project
    /// root. Cleanup deletes both output directories recursively.
    pub fn build(self) -> Result<Settings> {
        use super::error::{Context, ErrorExt};

        let app_name = self.app_name.context("app_name is required")?;
        if app_name.trim().is_empty() || app_name.contains(['/', '\\']) {
            return Err(Error::GenericError(format!(
                "app name '{app_name}' must be non-empty and free of path separators"
            )));
        }
        if self.archive_suffix.is_empty() || self.archive_suffix.contains(['/', '\\']) {
            return Err(Error::GenericError(format!(
                "archive suffix '{}' must be non-empty and free of path separators",
                self.archive_suffix
            )));
        }
        let root = self
            .project_root
            .absolutize()
            .fs_context("resolving project root", &self.project_root)?
            .into_owned();

        let anchor = |path: &Path| -> Result<PathBuf> {
            Ok(path
                .absolutize_from(&root)
                .fs_context("resolving path", path)?
                .into_owned())
        };

        let data = self
            .data
            .iter()
            .map(|entry| {
                Ok(DataEntry {
                    source: anchor(&entry.source)?,
                    destination: entry.destination.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let output_dir = |field: &'static str, path: &Path| -> Result<PathBuf> {
            let dir = anchor(path)?;
            if dir == root || !dir.starts_with(&root) {
                return Err(Error::UnsafeOutputDir { field, path: dir });
            }
            Ok(dir)
        };

        Ok(Settings {
            entry_point: anchor(&self.entry_point)?,
            icon: anchor(&self.icon)?,
            dist_dir: output_dir("dist_dir", &self.dist_dir)?,
            work_dir: output_dir("work_dir", &self.work_dir)?,
            project_root: root,
            app_name,
            windowed: self.windowed,
            data,
            dependencies: self.dependencies,
            tool: self.tool,
            collect_data: self.collect_data,
            hidden_imports: self.hidden_imports,
            extra_args: self.extra_args,
            search_path: self.search_path,
            required_resources: self.required_resources,
            archive_suffix: self.archive_suffix,
            archive_format: self.archive_format,
            terminate: self.terminate,
        })
    }
}
