//! Pipeline orchestration.
//!
//! The [`Pipeline`] drives one packaging run through its stages in order:
//!
//! 1. Terminate stale instances of the application (best-effort)
//! 2. Clean `dist/`, `build/` and generated descriptors (best-effort)
//! 3. Resolve native dependencies on the host
//! 4. Run the packaging tool
//! 5. Verify the produced bundle
//! 6. Archive the bundle
//! 7. Collect the artifacts for the success report
//!
//! The first fatal failure halts the run; later stages never execute.
//!
//! # Example
//!
//! ```no_run
//! use app_packager::pipeline::{Pipeline, SettingsBuilder};
//!
//! # async fn example() -> app_packager::pipeline::Result<()> {
//! let settings = SettingsBuilder::new("/work/transcriber")
//!     .app_name("Transcriber")
//!     .build()?;
//!
//! let artifacts = Pipeline::new(settings).run().await?;
//! println!("Archive: {}", artifacts.archive_path.display());
//! println!("SHA256: {}", artifacts.checksum);
//! # Ok(())
//! # }
//! ```

use super::{
    archive::create_archive,
    checksum::calculate_sha256,
    clean::{CleanReport, MetadataCleaner, clean_build_environment, default_metadata_cleaner},
    error::{Error, ErrorExt, Result},
    manifest::BundleManifest,
    package::run_packaging_tool,
    resolve::{ResolvedDependency, resolve_dependencies},
    settings::Settings,
    stage::Stage,
    terminate::{NoopTerminator, ProcessTerminator, SysinfoTerminator, terminate_stale_instances},
    verify::verify_bundle,
};
use std::path::PathBuf;

/// Artifacts of a successful run.
#[derive(Debug, Clone)]
pub struct BuildArtifacts {
    /// The verified `<Name>.app` bundle.
    pub bundle_path: PathBuf,
    /// The distributable archive.
    pub archive_path: PathBuf,
    /// Archive size in bytes.
    pub archive_size: u64,
    /// Hex SHA-256 of the archive.
    pub checksum: String,
    /// Native tools that were bundled.
    pub dependencies: Vec<ResolvedDependency>,
    /// What the cleanup stage did.
    pub clean: CleanReport,
}

/// Drives a packaging run through its stages.
pub struct Pipeline {
    settings: Settings,
    terminator: Box<dyn ProcessTerminator>,
    cleaner: Box<dyn MetadataCleaner>,
    stage: Stage,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("settings", &self.settings)
            .field("stage", &self.stage)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Creates a pipeline with the host's process terminator and metadata cleaner.
    pub fn new(settings: Settings) -> Self {
        let terminator: Box<dyn ProcessTerminator> = if settings.terminate() {
            Box::new(SysinfoTerminator)
        } else {
            Box::new(NoopTerminator)
        };

        Self {
            settings,
            terminator,
            cleaner: default_metadata_cleaner(),
            stage: Stage::Idle,
        }
    }

    /// Replaces the process terminator.
    pub fn with_terminator(mut self, terminator: impl ProcessTerminator + 'static) -> Self {
        self.terminator = Box::new(terminator);
        self
    }

    /// Replaces the metadata cleaner used during cleanup.
    pub fn with_metadata_cleaner(mut self, cleaner: impl MetadataCleaner + 'static) -> Self {
        self.cleaner = Box::new(cleaner);
        self
    }

    /// Settings of this run.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Current stage; [`Stage::Succeeded`] or [`Stage::Failed`] once the run is over.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Runs every stage.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StageFailed`] naming the stage that halted the run.
    /// A pipeline runs once; calling `run` again fails with
    /// [`Error::InvalidTransition`].
    pub async fn run(&mut self) -> Result<BuildArtifacts> {
        self.advance(Stage::Terminating)?;
        if self.settings.terminate() {
            terminate_stale_instances(self.settings.app_name(), self.terminator.as_ref());
        } else {
            log::debug!("Stale instance termination disabled");
        }

        self.advance(Stage::Cleaning)?;
        let clean = clean_build_environment(&self.settings, self.cleaner.as_ref()).await;
        for (path, reason) in &clean.failures {
            log::warn!("Cleanup left {} behind: {}", path.display(), reason);
        }

        self.advance(Stage::ResolvingDeps)?;
        let dependencies = resolve_dependencies(
            self.settings.dependencies(),
            self.settings.search_path(),
            self.settings.project_root(),
        )
        .map_err(|e| self.fail(e))?;

        self.advance(Stage::Packaging)?;
        let manifest = match BundleManifest::from_settings(&self.settings, &dependencies) {
            Ok(manifest) => manifest,
            Err(e) => return Err(self.fail(e)),
        };
        if let Err(e) = run_packaging_tool(&self.settings, &manifest).await {
            return Err(self.fail(e));
        }

        self.advance(Stage::Verifying)?;
        let bundle_path = self.settings.bundle_path();
        verify_bundle(
            &bundle_path,
            self.settings.required_resources(),
            &manifest.binary_names(),
        )
        .map_err(|e| self.fail(e))?;

        self.advance(Stage::Archiving)?;
        let archive_path = self.settings.archive_path();
        if let Err(e) =
            create_archive(&bundle_path, &archive_path, self.settings.archive_format()).await
        {
            return Err(self.fail(e));
        }

        self.advance(Stage::Reporting)?;
        let (archive_size, checksum) = match summarize(&archive_path).await {
            Ok(summary) => summary,
            Err(e) => return Err(self.fail(e)),
        };

        self.advance(Stage::Succeeded)?;
        log::info!("Packaged {} into {}", bundle_path.display(), archive_path.display());

        Ok(BuildArtifacts {
            bundle_path,
            archive_path,
            archive_size,
            checksum,
            dependencies,
            clean,
        })
    }

    fn advance(&mut self, to: Stage) -> Result<()> {
        self.stage = self.stage.transition(to)?;
        log::debug!("Entering stage {}", self.stage);
        Ok(())
    }

    /// Moves to [`Stage::Failed`] and wraps `error` with the stage it halted.
    fn fail(&mut self, error: Error) -> Error {
        let stage = self.stage;
        self.stage = stage.transition(Stage::Failed).unwrap_or(Stage::Failed);
        log::error!("Stage {} failed: {}", stage, error);
        Error::StageFailed {
            stage,
            source: Box::new(error),
        }
    }
}

async fn summarize(archive: &std::path::Path) -> Result<(u64, String)> {
    let size = tokio::fs::metadata(archive)
        .await
        .fs_context("reading archive metadata", archive)?
        .len();
    let checksum = calculate_sha256(archive).await?;
    Ok((size, checksum))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::DependencySpec;
    use crate::pipeline::{ArchiveFormat, NoopMetadataCleaner, SettingsBuilder};
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct RecordingTerminator(Arc<Mutex<Vec<String>>>);

    impl ProcessTerminator for RecordingTerminator {
        fn terminate(&self, app_name: &str) -> usize {
            if let Ok(mut calls) = self.0.lock() {
                calls.push(app_name.to_string());
            }
            0
        }
    }

    fn executable(path: &Path, body: &str) {
        std::fs::write(path, format!("#!/bin/sh\n{body}\n")).expect("write");
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).expect("chmod");
    }

    /// Project with fake tools; the packaging tool lays out a bundle when `complete`.
    fn project(root: &Path, complete: bool) -> Settings {
        std::fs::create_dir_all(root.join("app")).expect("mkdir");
        std::fs::create_dir_all(root.join("assets")).expect("mkdir");
        std::fs::create_dir_all(root.join("bin")).expect("mkdir");
        std::fs::write(root.join("app/main.py"), "").expect("write");
        std::fs::write(root.join("assets/icon.icns"), "").expect("write");
        executable(&root.join("bin/ffmpeg"), "exit 0");

        let mut script = String::from(
            "B=dist/Demo.app/Contents\nmkdir -p $B/Frameworks $B/Resources/pkg\n",
        );
        script.push_str("cp bin/ffmpeg $B/Frameworks/ffmpeg\n");
        if complete {
            script.push_str("echo data > $B/Resources/pkg/data.bin\n");
        }
        executable(&root.join("bin/fake-pyinstaller"), &script);

        SettingsBuilder::new(root)
            .app_name("Demo")
            .entry_point("app/main.py")
            .dependencies(vec![DependencySpec::new("codec", "ffmpeg")])
            .search_path(root.join("bin").to_string_lossy().into_owned())
            .tool(root.join("bin/fake-pyinstaller").to_string_lossy().into_owned())
            .collect_data(vec![])
            .hidden_imports(vec![])
            .required_resources(vec![PathBuf::from("pkg/data.bin")])
            .archive_format(ArchiveFormat::Zip)
            .build()
            .expect("settings")
    }

    #[tokio::test]
    async fn test_successful_run_produces_both_artifacts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let terminator = RecordingTerminator::default();
        let calls = terminator.0.clone();
        let mut pipeline = Pipeline::new(project(dir.path(), true))
            .with_terminator(terminator)
            .with_metadata_cleaner(NoopMetadataCleaner);

        let artifacts = pipeline.run().await.expect("run");

        assert_eq!(pipeline.stage(), Stage::Succeeded);
        assert!(artifacts.bundle_path.is_dir());
        assert!(artifacts.archive_path.is_file());
        assert_eq!(artifacts.checksum.len(), 64);
        assert_eq!(artifacts.dependencies[0].file_name(), "ffmpeg");
        assert_eq!(calls.lock().expect("lock").as_slice(), ["Demo"]);
    }

    #[tokio::test]
    async fn test_incomplete_bundle_halts_before_archive() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = project(dir.path(), false);
        let archive = settings.archive_path();
        let mut pipeline = Pipeline::new(settings)
            .with_terminator(NoopTerminator)
            .with_metadata_cleaner(NoopMetadataCleaner);

        let err = pipeline.run().await.unwrap_err();

        assert_eq!(err.failed_stage(), Some(Stage::Verifying));
        assert_eq!(pipeline.stage(), Stage::Failed);
        assert!(!archive.exists());
    }

    #[tokio::test]
    async fn test_pipeline_runs_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut pipeline = Pipeline::new(project(dir.path(), true))
            .with_terminator(NoopTerminator)
            .with_metadata_cleaner(NoopMetadataCleaner);

        pipeline.run().await.expect("first run");
        let err = pipeline.run().await.unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));
    }
}
