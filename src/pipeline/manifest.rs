//! Declarative description of the bundle handed to the packaging tool.
//!
//! A [`BundleManifest`] captures everything the packaging tool needs: entry
//! point, icon, data directories, resolved native binaries, packages whose
//! data is collected, and hidden imports. [`BundleManifest::to_args`] turns
//! it into the tool's command line.

use super::{
    error::{Error, Result},
    resolve::ResolvedDependency,
    settings::Settings,
};
use std::{ffi::OsString, path::PathBuf};

/// Separator between source and destination in `--add-data`/`--add-binary`.
const PAIR_SEPARATOR: &str = ":";

/// A file or directory copied into the bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleInput {
    /// Absolute path on the host.
    pub source: PathBuf,
    /// Destination relative to the bundle's data root.
    pub destination: PathBuf,
}

/// Everything the packaging tool is asked to produce.
#[derive(Debug, Clone)]
pub struct BundleManifest {
    /// Display name; the bundle is `<name>.app`.
    pub name: String,
    /// Entry point script.
    pub entry_point: PathBuf,
    /// Icon resource.
    pub icon: PathBuf,
    /// Windowed (no console) application.
    pub windowed: bool,
    /// Data directories.
    pub data: Vec<BundleInput>,
    /// Native binaries, placed at the bundle's binary root.
    pub binaries: Vec<BundleInput>,
    /// Packages whose data files are collected.
    pub collect_data: Vec<String>,
    /// Packages included even when not statically imported.
    pub hidden_imports: Vec<String>,
    /// Output directory for the bundle.
    pub dist_dir: PathBuf,
    /// Scratch directory.
    pub work_dir: PathBuf,
    /// Arguments appended before the entry point.
    pub extra_args: Vec<String>,
}

impl BundleManifest {
    /// Builds the manifest, checking that every project input exists.
    ///
    /// # Errors
    ///
    /// [`Error::MissingInput`] for the first missing entry point, icon, or
    /// data source.
    pub fn from_settings(settings: &Settings, dependencies: &[ResolvedDependency]) -> Result<Self> {
        require_file("entry point", settings.entry_point().to_path_buf())?;
        require_file("icon", settings.icon().to_path_buf())?;

        let data = settings
            .data()
            .iter()
            .map(|entry| {
                if !entry.source.exists() {
                    return Err(Error::MissingInput {
                        what: "data source",
                        path: entry.source.clone(),
                    });
                }
                Ok(BundleInput {
                    source: entry.source.clone(),
                    destination: entry.destination.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let binaries = dependencies
            .iter()
            .map(|dep| BundleInput {
                source: dep.path.clone(),
                destination: PathBuf::from("."),
            })
            .collect();

        Ok(Self {
            name: settings.app_name().to_string(),
            entry_point: settings.entry_point().to_path_buf(),
            icon: settings.icon().to_path_buf(),
            windowed: settings.windowed(),
            data,
            binaries,
            collect_data: settings.collect_data().to_vec(),
            hidden_imports: settings.hidden_imports().to_vec(),
            dist_dir: settings.dist_dir().to_path_buf(),
            work_dir: settings.work_dir().to_path_buf(),
            extra_args: settings.extra_args().to_vec(),
        })
    }

    /// Command-line arguments for the packaging tool, entry point last.
    pub fn to_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["--noconfirm".into(), "--clean".into()];

        if self.windowed {
            args.push("--windowed".into());
        }

        args.push("--name".into());
        args.push(self.name.clone().into());
        args.push("--icon".into());
        args.push(self.icon.clone().into());

        for input in &self.data {
            args.push("--add-data".into());
            args.push(pair(input));
        }
        for input in &self.binaries {
            args.push("--add-binary".into());
            args.push(pair(input));
        }
        for package in &self.collect_data {
            args.push("--collect-data".into());
            args.push(package.into());
        }
        for package in &self.hidden_imports {
            args.push("--hidden-import".into());
            args.push(package.into());
        }

        args.push("--distpath".into());
        args.push(self.dist_dir.clone().into());
        args.push("--workpath".into());
        args.push(self.work_dir.clone().into());

        args.extend(self.extra_args.iter().map(OsString::from));
        args.push(self.entry_point.clone().into());
        args
    }

    /// File names the verify stage must find inside the bundle.
    pub fn binary_names(&self) -> Vec<String> {
        self.binaries
            .iter()
            .filter_map(|input| input.source.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect()
    }
}

fn pair(input: &BundleInput) -> OsString {
    let mut value = input.source.clone().into_os_string();
    value.push(PAIR_SEPARATOR);
    value.push(&input.destination);
    value
}

fn require_file(what: &'static str, path: PathBuf) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(Error::MissingInput { what, path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::SettingsBuilder;
    use std::path::Path;

    fn project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("app")).expect("mkdir");
        std::fs::create_dir_all(dir.path().join("assets")).expect("mkdir");
        std::fs::write(dir.path().join("app/gui_app.py"), "print('hi')\n").expect("write");
        std::fs::write(dir.path().join("assets/icon.icns"), b"icns").expect("write");
        dir
    }

    fn deps() -> Vec<ResolvedDependency> {
        vec![
            ResolvedDependency {
                id: "codec".into(),
                binary: "ffmpeg".into(),
                path: PathBuf::from("/opt/homebrew/Cellar/ffmpeg/7.1/bin/ffmpeg"),
            },
            ResolvedDependency {
                id: "probe".into(),
                binary: "ffprobe".into(),
                path: PathBuf::from("/opt/homebrew/Cellar/ffmpeg/7.1/bin/ffprobe"),
            },
        ]
    }

    #[test]
    fn test_arguments_cover_every_input() {
        let dir = project();
        let settings = SettingsBuilder::new(dir.path())
            .app_name("Transcriber")
            .build()
            .expect("settings");

        let manifest = BundleManifest::from_settings(&settings, &deps()).expect("manifest");
        let args: Vec<String> = manifest
            .to_args()
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        let position = |flag: &str| args.iter().position(|a| a == flag).expect(flag);
        assert_eq!(args[position("--name") + 1], "Transcriber");
        assert!(args.contains(&"--windowed".to_string()));
        assert!(args.contains(&"/opt/homebrew/Cellar/ffmpeg/7.1/bin/ffmpeg:.".to_string()));
        assert!(args.contains(&"/opt/homebrew/Cellar/ffmpeg/7.1/bin/ffprobe:.".to_string()));
        assert_eq!(args[position("--collect-data") + 1], "whisper");
        assert_eq!(args[position("--hidden-import") + 1], "whisper");

        let data = &args[position("--add-data") + 1];
        assert!(data.ends_with("assets:assets"));
        assert!(args.last().expect("entry").ends_with("app/gui_app.py"));
        assert_eq!(manifest.binary_names(), vec!["ffmpeg", "ffprobe"]);
    }

    #[test]
    fn test_missing_entry_point_is_rejected() {
        let dir = project();
        std::fs::remove_file(dir.path().join("app/gui_app.py")).expect("rm");
        let settings = SettingsBuilder::new(dir.path())
            .app_name("Transcriber")
            .build()
            .expect("settings");

        let err = BundleManifest::from_settings(&settings, &[]).unwrap_err();
        match err {
            Error::MissingInput { what, path } => {
                assert_eq!(what, "entry point");
                assert!(path.ends_with(Path::new("app/gui_app.py")));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_console_app_omits_windowed_flag() {
        let dir = project();
        let settings = SettingsBuilder::new(dir.path())
            .app_name("Transcriber")
            .build()
            .expect("settings");

        let mut manifest = BundleManifest::from_settings(&settings, &[]).expect("manifest");
        manifest.windowed = false;

        assert!(!manifest.to_args().iter().any(|a| a == "--windowed"));
    }
}
