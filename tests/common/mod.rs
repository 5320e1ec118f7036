//! Common test utilities for app_packager integration tests

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Display name used by every test project
pub const APP_NAME: &str = "Transcriber";

/// Stand-in for PyInstaller.
///
/// Lays out `<distpath>/<name>.app` with every `--add-binary` copied into
/// `Contents/Frameworks` and the whisper mel filters under `Contents/Resources`.
/// Marker files in the project root (its working directory) change behavior:
/// `omit-resources` skips the data file, `binaries-in-resources` puts the
/// binaries in `Contents/Resources`, `fail-with` exits with the code it holds.
const FAKE_PACKAGER: &str = r##"#!/bin/sh
touch packager-ran
if [ -f fail-with ]; then
  exit "$(cat fail-with)"
fi
NAME=""
DIST=""
BINS=""
while [ $# -gt 0 ]; do
  case "$1" in
    --name) NAME="$2"; shift 2 ;;
    --distpath) DIST="$2"; shift 2 ;;
    --add-binary) BINS="$BINS ${2%:.}"; shift 2 ;;
    *) shift ;;
  esac
done
C="$DIST/$NAME.app/Contents"
mkdir -p "$C/MacOS" "$C/Frameworks" "$C/Resources/whisper/assets"
echo "#!/bin/sh" > "$C/MacOS/$NAME"
chmod 755 "$C/MacOS/$NAME"
TARGET="$C/Frameworks"
if [ -f binaries-in-resources ]; then
  TARGET="$C/Resources"
fi
for b in $BINS; do
  cp "$b" "$TARGET/"
done
if [ ! -f omit-resources ]; then
  echo mel > "$C/Resources/whisper/assets/mel_filters.npz"
fi
"##;

/// A project directory with fake native tools and a fake packaging tool
#[allow(dead_code)]
pub struct TestProject {
    /// Temporary directory
    pub temp: TempDir,
    /// Path to the project root
    pub path: PathBuf,
}

#[allow(dead_code)]
impl TestProject {
    /// Create a complete project with a `Packager.toml`
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let path = temp.path().to_path_buf();
        let project = Self { temp, path };

        project.write_file("app/gui_app.py", "print('transcriber')\n");
        project.write_file("assets/icon.icns", "icns");
        project.write_file("assets/logo.png", "png");
        project.install_tool("ffmpeg", "echo ffmpeg");
        project.install_tool("ffprobe", "echo ffprobe");
        project.install_tool("pyinstaller", FAKE_PACKAGER.trim_start_matches("#!/bin/sh\n"));
        project.write_config("");
        project
    }

    /// Directory holding the fake tools
    pub fn bin_dir(&self) -> PathBuf {
        self.path.join("bin")
    }

    /// Write `Packager.toml`, appending `extra` to the base config
    pub fn write_config(&self, extra: &str) {
        let config = format!(
            r#"[app]
name = "{APP_NAME}"

[packaging]
tool = "{tool}"
search_path = "{bin}"

[archive]
format = "zip"

[terminate]
enabled = false
{extra}"#,
            tool = self.bin_dir().join("pyinstaller").display(),
            bin = self.bin_dir().display(),
        );
        self.write_file("Packager.toml", &config);
    }

    /// Install an executable shell script in the tool directory
    pub fn install_tool(&self, name: &str, body: &str) {
        let path = self.bin_dir().join(name);
        self.write_file(&format!("bin/{name}"), &format!("#!/bin/sh\n{body}\n"));
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("Failed to make tool executable");
    }

    /// Remove a tool from the tool directory
    pub fn remove_tool(&self, name: &str) {
        std::fs::remove_file(self.bin_dir().join(name)).expect("Failed to remove tool");
    }

    /// Write a file in the project
    pub fn write_file(&self, path: &str, content: &str) {
        let file_path = self.path.join(path);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&file_path, content).expect("Failed to write file");
    }

    /// Check if a path exists in the project
    pub fn exists(&self, path: &str) -> bool {
        self.path.join(path).exists()
    }

    /// Whether the fake packaging tool was started
    pub fn packager_ran(&self) -> bool {
        self.exists("packager-ran")
    }

    /// Expected bundle path
    pub fn bundle_path(&self) -> PathBuf {
        self.path.join("dist").join(format!("{APP_NAME}.app"))
    }

    /// Expected archive path
    pub fn archive_path(&self) -> PathBuf {
        self.path.join("dist").join(format!("{APP_NAME}-macOS.zip"))
    }
}

/// Top-level entry names of a zip archive
#[allow(dead_code)]
pub fn zip_roots(archive: &Path) -> Vec<String> {
    let file = std::fs::File::open(archive).expect("Failed to open archive");
    let zip = zip::ZipArchive::new(file).expect("Failed to read archive");
    let mut roots: Vec<String> = zip
        .file_names()
        .filter_map(|name| name.split('/').next())
        .map(str::to_string)
        .collect();
    roots.sort();
    roots.dedup();
    roots
}
