//! Project configuration read from `Packager.toml`.
//!
//! Only `app.name` is required. Every other field falls back to the defaults
//! of the transcription desktop app this tool was written for: a PyInstaller
//! build of `app/gui_app.py` that embeds `ffmpeg`/`ffprobe` and collects the
//! data files of the `whisper` package.

use crate::error::{ConfigError, Result};
use crate::pipeline::ArchiveFormat;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

/// File name that marks a project root.
pub const CONFIG_FILE_NAME: &str = "Packager.toml";

/// Deserialized `Packager.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackagerConfig {
    /// Application identity and inputs.
    pub app: AppConfig,

    /// Data directories embedded verbatim into the bundle.
    #[serde(default = "default_data")]
    pub data: Vec<DataEntry>,

    /// Native tools resolved on the host and embedded as companions.
    #[serde(default = "default_dependencies")]
    pub dependencies: Vec<DependencySpec>,

    /// Packaging tool invocation.
    #[serde(default)]
    pub packaging: PackagingConfig,

    /// Bundle verification.
    #[serde(default)]
    pub verify: VerifyConfig,

    /// Distributable archive.
    #[serde(default)]
    pub archive: ArchiveConfig,

    /// Stale instance termination.
    #[serde(default)]
    pub terminate: TerminateConfig,
}

/// `[app]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Display name. The bundle is `<name>.app`.
    pub name: String,

    /// Entry point script handed to the packaging tool.
    #[serde(default = "default_entry_point")]
    pub entry_point: PathBuf,

    /// Icon resource.
    #[serde(default = "default_icon")]
    pub icon: PathBuf,

    /// Build a windowed (no console) application.
    #[serde(default = "default_true")]
    pub windowed: bool,
}

/// One `[[data]]` entry: `source` is copied to `destination` inside the bundle.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataEntry {
    /// Directory relative to the project root.
    pub source: PathBuf,
    /// Directory inside the bundle's resources.
    pub destination: PathBuf,
}

/// One `[[dependencies]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DependencySpec {
    /// Logical identifier, e.g. "codec".
    pub id: String,
    /// Executable name looked up on the host, e.g. "ffmpeg".
    pub binary: String,
}

impl DependencySpec {
    /// Creates a dependency spec.
    pub fn new(id: impl Into<String>, binary: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            binary: binary.into(),
        }
    }
}

/// `[packaging]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackagingConfig {
    /// Packaging tool executable (name or path).
    pub tool: String,
    /// Output directory for bundles.
    pub dist_dir: PathBuf,
    /// Scratch directory of the packaging tool.
    pub work_dir: PathBuf,
    /// Packages whose non-code data files are collected.
    pub collect_data: Vec<String>,
    /// Packages only used through runtime reflection.
    pub hidden_imports: Vec<String>,
    /// Extra arguments appended before the entry point.
    pub extra_args: Vec<String>,
    /// PATH-style list used instead of the host `PATH` for dependency lookup.
    pub search_path: Option<String>,
}

impl Default for PackagingConfig {
    fn default() -> Self {
        Self {
            tool: "pyinstaller".to_string(),
            dist_dir: PathBuf::from("dist"),
            work_dir: PathBuf::from("build"),
            collect_data: vec!["whisper".to_string()],
            hidden_imports: vec!["whisper".to_string()],
            extra_args: Vec::new(),
            search_path: None,
        }
    }
}

/// `[verify]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VerifyConfig {
    /// Files that must exist under `Contents/Resources`.
    pub required_resources: Vec<PathBuf>,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            required_resources: vec![PathBuf::from("whisper/assets/mel_filters.npz")],
        }
    }
}

/// `[archive]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArchiveConfig {
    /// Appended to the display name to form the archive file name.
    pub suffix: String,
    /// Archive writer.
    pub format: ArchiveFormat,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            suffix: "-macOS.zip".to_string(),
            format: ArchiveFormat::Auto,
        }
    }
}

/// `[terminate]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TerminateConfig {
    /// Signal running instances before cleaning.
    pub enabled: bool,
}

impl Default for TerminateConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

pub(crate) fn default_entry_point() -> PathBuf {
    PathBuf::from("app/gui_app.py")
}

pub(crate) fn default_icon() -> PathBuf {
    PathBuf::from("assets/icon.icns")
}

fn default_true() -> bool {
    true
}

pub(crate) fn default_data() -> Vec<DataEntry> {
    vec![DataEntry {
        source: PathBuf::from("assets"),
        destination: PathBuf::from("assets"),
    }]
}

pub(crate) fn default_dependencies() -> Vec<DependencySpec> {
    vec![
        DependencySpec::new("codec", "ffmpeg"),
        DependencySpec::new("probe", "ffprobe"),
    ]
}

impl PackagerConfig {
    /// Parses and validates configuration text.
    ///
    /// `origin` is only used in error messages.
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self> {
        let config: PackagerConfig = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, path)
    }

    /// Checks invariants serde cannot express.
    pub fn validate(&self) -> Result<()> {
        let name = self.app.name.trim();
        if name.is_empty() {
            return Err(invalid("app.name", "must not be empty"));
        }
        if name.contains(['/', '\\']) {
            return Err(invalid("app.name", "must not contain path separators"));
        }
        if self.packaging.tool.trim().is_empty() {
            return Err(invalid("packaging.tool", "must not be empty"));
        }
        if self.archive.suffix.is_empty() {
            return Err(invalid("archive.suffix", "must not be empty"));
        }
        if self.archive.suffix.contains(['/', '\\']) {
            return Err(invalid("archive.suffix", "must not contain path separators"));
        }
        for (field, dir) in [
            ("packaging.dist_dir", &self.packaging.dist_dir),
            ("packaging.work_dir", &self.packaging.work_dir),
        ] {
            if !is_subdirectory(dir) {
                return Err(invalid(
                    field,
                    &format!(
                        "{} must name a subdirectory of the project root",
                        dir.display()
                    ),
                ));
            }
        }

        let mut ids = HashSet::new();
        let mut binaries = HashSet::new();
        for dep in &self.dependencies {
            if dep.id.is_empty() || dep.binary.is_empty() {
                return Err(invalid("dependencies", "id and binary must not be empty"));
            }
            if !ids.insert(dep.id.as_str()) {
                return Err(invalid(
                    "dependencies",
                    &format!("duplicate dependency id '{}'", dep.id),
                ));
            }
            if !binaries.insert(dep.binary.as_str()) {
                return Err(invalid(
                    "dependencies",
                    &format!("binary '{}' listed twice", dep.binary),
                ));
            }
        }

        for resource in &self.verify.required_resources {
            if resource.is_absolute() {
                return Err(invalid(
                    "verify.required_resources",
                    &format!("{} must be relative to the bundle resources", resource.display()),
                ));
            }
        }

        Ok(())
    }
}

/// Non-empty relative path made only of plain names, so no `.`, `..` or root.
fn is_subdirectory(path: &Path) -> bool {
    path.components().next().is_some()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_)))
}

fn invalid(field: &str, reason: &str) -> crate::error::PackagerError {
    ConfigError::Invalid {
        field: field.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

/// Walks up from `start` to the first directory containing [`CONFIG_FILE_NAME`].
pub fn find_project_root(start: &Path) -> Result<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(CONFIG_FILE_NAME).is_file())
        .map(Path::to_path_buf)
        .ok_or_else(|| {
            ConfigError::NotFound {
                start: start.to_path_buf(),
            }
            .into()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PackagerError;

    fn parse(text: &str) -> Result<PackagerConfig> {
        PackagerConfig::from_toml_str(text, Path::new("Packager.toml"))
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = parse("[app]\nname = \"Transcriber\"\n").expect("minimal config");

        assert_eq!(config.app.name, "Transcriber");
        assert_eq!(config.app.entry_point, PathBuf::from("app/gui_app.py"));
        assert_eq!(config.app.icon, PathBuf::from("assets/icon.icns"));
        assert!(config.app.windowed);
        assert_eq!(config.data, default_data());
        assert_eq!(
            config.dependencies,
            vec![
                DependencySpec::new("codec", "ffmpeg"),
                DependencySpec::new("probe", "ffprobe"),
            ]
        );
        assert_eq!(config.packaging.tool, "pyinstaller");
        assert_eq!(config.packaging.collect_data, vec!["whisper"]);
        assert_eq!(config.packaging.hidden_imports, vec!["whisper"]);
        assert_eq!(config.archive.suffix, "-macOS.zip");
        assert_eq!(config.archive.format, ArchiveFormat::Auto);
        assert!(config.terminate.enabled);
    }

    #[test]
    fn test_full_config_overrides() {
        let config = parse(
            r#"
[app]
name = "Scribe"
entry_point = "main.py"
icon = "res/scribe.icns"
windowed = false

[[data]]
source = "res"
destination = "res"

[[dependencies]]
id = "codec"
binary = "ffmpeg"

[packaging]
tool = "/opt/tools/pyinstaller"
dist_dir = "out"
collect_data = []
hidden_imports = ["torch", "whisper"]
search_path = "/opt/ffmpeg/bin"

[verify]
required_resources = ["a/b.bin", "c.json"]

[archive]
suffix = ".tar.gz"
format = "tar-gz"

[terminate]
enabled = false
"#,
        )
        .expect("full config");

        assert_eq!(config.app.entry_point, PathBuf::from("main.py"));
        assert!(!config.app.windowed);
        assert_eq!(config.dependencies.len(), 1);
        assert_eq!(config.packaging.dist_dir, PathBuf::from("out"));
        assert_eq!(config.packaging.work_dir, PathBuf::from("build"));
        assert!(config.packaging.collect_data.is_empty());
        assert_eq!(config.packaging.search_path.as_deref(), Some("/opt/ffmpeg/bin"));
        assert_eq!(config.verify.required_resources.len(), 2);
        assert_eq!(config.archive.format, ArchiveFormat::TarGz);
        assert!(!config.terminate.enabled);
    }

    #[test]
    fn test_missing_name_is_a_parse_error() {
        let err = parse("[app]\nicon = \"x.icns\"\n").unwrap_err();
        assert!(matches!(err, PackagerError::Config(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        assert!(parse("[app]\nname = \"A\"\ncolour = \"red\"\n").is_err());
    }

    #[test]
    fn test_name_with_separator_is_invalid() {
        let err = parse("[app]\nname = \"a/b\"\n").unwrap_err();
        assert!(matches!(err, PackagerError::Config(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_duplicate_dependency_ids_are_invalid() {
        let err = parse(
            r#"
[app]
name = "A"

[[dependencies]]
id = "codec"
binary = "ffmpeg"

[[dependencies]]
id = "codec"
binary = "ffprobe"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate dependency id"));
    }

    #[test]
    fn test_absolute_required_resource_is_invalid() {
        let err = parse("[app]\nname = \"A\"\n[verify]\nrequired_resources = [\"/etc/passwd\"]\n")
            .unwrap_err();
        assert!(matches!(err, PackagerError::Config(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_output_dirs_must_be_subdirectories() {
        for dir in ["", ".", "./", "..", "../dist", "dist/../..", "/", "/tmp/dist"] {
            for field in ["dist_dir", "work_dir"] {
                let text = format!("[app]\nname = \"A\"\n[packaging]\n{field} = {dir:?}\n");
                let err = parse(&text).unwrap_err();
                assert!(
                    matches!(
                        &err,
                        PackagerError::Config(ConfigError::Invalid { field: f, .. })
                            if f == &format!("packaging.{field}")
                    ),
                    "{field} = {dir:?} was accepted: {err}"
                );
            }
        }

        let config = parse("[app]\nname = \"A\"\n[packaging]\ndist_dir = \"out/dist\"\n")
            .expect("nested dist_dir");
        assert_eq!(config.packaging.dist_dir, PathBuf::from("out/dist"));
    }

    #[test]
    fn test_archive_suffix_with_separator_is_invalid() {
        let err = parse("[app]\nname = \"A\"\n[archive]\nsuffix = \"/../../x.zip\"\n")
            .unwrap_err();
        assert!(err.to_string().contains("archive.suffix"));
    }

    #[test]
    fn test_find_project_root_walks_up() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "[app]\nname = \"A\"\n")
            .expect("write config");
        let nested = dir.path().join("app/ui");
        std::fs::create_dir_all(&nested).expect("nested dirs");

        let root = find_project_root(&nested).expect("root found");
        assert_eq!(root, dir.path());
    }

    #[test]
    fn test_find_project_root_reports_missing_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = find_project_root(dir.path()).unwrap_err();
        assert!(matches!(err, PackagerError::Config(ConfigError::NotFound { .. })));
    }
}
