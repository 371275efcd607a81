// crates/core/src/compile.rs
//! Compile orchestrator: turns one library comic into one flat `.cbz`.
//!
//! Phases, as reported through [`CompileObserver`]:
//! - `initializing`: resolve the comic, extract the selected entries into a
//!   private working directory, normalize archive extensions
//! - `extracting`: recursively unpack nested archives
//! - `compiling`: pack, clean up the working directory, publish
//!
//! Any failure removes the working directory (best effort) and is returned
//! as a [`CompileFailure`] tagged with the phase it happened in.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::archive;
use crate::error::{CompileError, CompileFailure};
use crate::library::Library;
use crate::normalize::normalize_extensions;
use crate::pack::pack_tree;
use crate::progress::CompileObserver;
use crate::types::Phase;
use crate::unpack::unpack_all;

/// Directories the orchestrator works in.
#[derive(Debug, Clone)]
pub struct CompileSettings {
    /// Parent of the per-job working directories.
    pub work_dir: PathBuf,
    /// Where finished `.cbz` files land.
    pub published_dir: PathBuf,
    /// Upper bound on recursive unpack passes.
    pub max_unpack_passes: usize,
}

/// What to compile: a comic by file name plus an optional entry selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileRequest {
    pub comic: String,
    /// Entry names to extract from the comic; empty means all of them.
    pub files: Vec<String>,
}

/// Tag errors with the phase they surfaced in.
trait AtStage<T> {
    fn at(self, stage: Phase) -> Result<T, CompileFailure>;
}

impl<T, E: Into<CompileError>> AtStage<T> for Result<T, E> {
    fn at(self, stage: Phase) -> Result<T, CompileFailure> {
        self.map_err(|e| CompileFailure::new(stage, e))
    }
}

fn checkpoint(observer: &dyn CompileObserver, stage: Phase) -> Result<(), CompileFailure> {
    if observer.is_cancelled() {
        return Err(CompileFailure::new(stage, CompileError::Cancelled));
    }
    Ok(())
}

/// Published name for a comic: its file stem with a `.cbz` extension.
pub fn published_name(comic: &str) -> String {
    let stem = Path::new(comic)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "comic".to_string());
    format!("{stem}.cbz")
}

/// Move `from` to `to`, replacing `to`; falls back to copy + remove when a
/// rename is not possible (e.g. across filesystems).
fn move_file(from: &Path, to: &Path) -> Result<(), CompileError> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to).map_err(|e| CompileError::io(to, e))?;
    fs::remove_file(from).map_err(|e| CompileError::io(from, e))?;
    Ok(())
}

/// Remove every directory directly under `root`, keeping its files.
fn remove_subdirectories(root: &Path) -> Result<(), CompileError> {
    for entry in fs::read_dir(root).map_err(|e| CompileError::io(root, e))? {
        let entry = entry.map_err(|e| CompileError::io(root, e))?;
        let path = entry.path();
        if path.is_dir() {
            fs::remove_dir_all(&path).map_err(|e| CompileError::io(&path, e))?;
        }
    }
    Ok(())
}

/// Runs compile pipelines against one library.
#[derive(Debug, Clone)]
pub struct Compiler {
    library: Library,
    settings: CompileSettings,
}

impl Compiler {
    pub fn new(library: Library, settings: CompileSettings) -> Self {
        Self { library, settings }
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn settings(&self) -> &CompileSettings {
        &self.settings
    }

    /// Working directory for the job identified by `token`.
    pub fn workspace(&self, token: &str) -> PathBuf {
        self.settings.work_dir.join(token)
    }

    /// Run the whole pipeline synchronously. Returns the published path.
    pub fn compile(
        &self,
        request: &CompileRequest,
        token: &str,
        observer: &dyn CompileObserver,
    ) -> Result<PathBuf, CompileFailure> {
        let workspace = self.workspace(token);
        match self.run(request, token, &workspace, observer) {
            Ok(published) => {
                tracing::info!(
                    comic = %request.comic,
                    token,
                    output = %published.display(),
                    "Compile finished"
                );
                Ok(published)
            }
            Err(mut failure) => {
                if workspace.exists() {
                    if let Err(e) = fs::remove_dir_all(&workspace) {
                        tracing::warn!(
                            path = %workspace.display(),
                            error = %e,
                            "Failed to remove working directory"
                        );
                    }
                }
                failure.partial_artifacts = workspace.exists();
                if failure.is_cancelled() {
                    tracing::info!(comic = %request.comic, token, stage = %failure.stage, "Compile cancelled");
                } else {
                    tracing::warn!(comic = %request.comic, token, error = %failure, "Compile failed");
                }
                Err(failure)
            }
        }
    }

    fn run(
        &self,
        request: &CompileRequest,
        token: &str,
        workspace: &Path,
        observer: &dyn CompileObserver,
    ) -> Result<PathBuf, CompileFailure> {
        observer.phase_started(Phase::Initializing);
        let source = self.library.resolve(&request.comic).at(Phase::Initializing)?;
        checkpoint(observer, Phase::Initializing)?;

        fs::create_dir_all(workspace)
            .map_err(|e| CompileError::io(workspace, e))
            .at(Phase::Initializing)?;
        let selection: HashSet<String> = request.files.iter().cloned().collect();
        let extracted = archive::extract(&source, &selection, workspace).at(Phase::Initializing)?;
        normalize_extensions(workspace).at(Phase::Initializing)?;
        observer.completion(1.0);
        tracing::debug!(comic = %request.comic, token, files = extracted, "Initial extraction done");
        checkpoint(observer, Phase::Initializing)?;

        observer.phase_started(Phase::Extracting);
        unpack_all(workspace, self.settings.max_unpack_passes, observer).at(Phase::Extracting)?;
        checkpoint(observer, Phase::Extracting)?;

        observer.phase_started(Phase::Compiling);
        let packed = pack_tree(workspace, token, observer).at(Phase::Compiling)?;
        remove_subdirectories(workspace).at(Phase::Compiling)?;

        let published_dir = &self.settings.published_dir;
        fs::create_dir_all(published_dir)
            .map_err(|e| CompileError::io(published_dir, e))
            .at(Phase::Compiling)?;
        let published = published_dir.join(published_name(&request.comic));
        move_file(&packed, &published).at(Phase::Compiling)?;

        if let Err(e) = fs::remove_dir_all(workspace) {
            tracing::warn!(path = %workspace.display(), error = %e, "Failed to remove working directory");
        }
        Ok(published)
    }
}
