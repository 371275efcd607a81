// crates/core/src/unpack.rs
//! Recursive unpacker: expands every archive found under a working directory
//! in place until none remain.
//!
//! Each pass first normalizes comic aliases, then walks the tree in sorted
//! order and expands the archives it saw at the start of the pass. Archives
//! produced by an expansion, `.cbz`/`.cbr` included, are picked up by the
//! next pass. Completion for the phase is `processed / (processed +
//! pending)`, never reported backwards, and ends at exactly 1.0.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::archive;
use crate::error::CompileError;
use crate::normalize::normalize_extensions;
use crate::progress::{CompileObserver, MonotonicProgress};
use crate::types::ArchiveFormat;

/// Outcome of a successful unpack.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnpackStats {
    /// Archives expanded in total.
    pub archives: usize,
    /// Passes that found at least one archive.
    pub passes: usize,
}

/// Files under `root`, depth-first with siblings sorted by name.
fn tree_files(root: &Path) -> Result<Vec<PathBuf>, CompileError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| CompileError::walk(root, e))?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn is_archive(path: &Path) -> bool {
    ArchiveFormat::from_canonical_path(path).is_some()
}

/// Expand every `.zip`/`.rar` (or `.cbz`/`.cbr`) under `root` in place,
/// recursively.
///
/// Gives up with [`CompileError::NestingTooDeep`] once `max_passes` passes
/// have run and archives still remain.
pub fn unpack_all(
    root: &Path,
    max_passes: usize,
    observer: &dyn CompileObserver,
) -> Result<UnpackStats, CompileError> {
    let mut stats = UnpackStats::default();
    let mut progress = MonotonicProgress::new();

    loop {
        normalize_extensions(root)?;
        let files = tree_files(root)?;
        let pending = files.iter().filter(|p| is_archive(p)).count();
        if pending == 0 {
            progress.advance(observer, 1.0);
            tracing::debug!(
                root = %root.display(),
                archives = stats.archives,
                passes = stats.passes,
                "Unpack reached a fixed point"
            );
            return Ok(stats);
        }
        if stats.passes >= max_passes {
            return Err(CompileError::NestingTooDeep {
                path: root.to_path_buf(),
                limit: max_passes,
            });
        }
        stats.passes += 1;

        let total = stats.archives + pending;
        for file in files {
            if observer.is_cancelled() {
                return Err(CompileError::Cancelled);
            }
            if is_archive(&file) && file.is_file() {
                expand_in_place(&file)?;
                stats.archives += 1;
            }
            progress.advance(observer, stats.archives as f32 / total as f32);
        }
    }
}

/// Replace `archive_path` with its contents, merged into its parent directory.
///
/// Entries land in a hidden staging directory first, so an archive holding an
/// entry with its own name does not clobber itself mid-read.
fn expand_in_place(archive_path: &Path) -> Result<usize, CompileError> {
    let parent = archive_path.parent().ok_or_else(|| {
        CompileError::Internal(format!("{} has no parent", archive_path.display()))
    })?;
    let staging = tempfile::Builder::new()
        .prefix(".unpack-")
        .tempdir_in(parent)
        .map_err(|e| CompileError::io(parent, e))?;

    let count = archive::extract(archive_path, &HashSet::new(), staging.path())?;
    fs::remove_file(archive_path).map_err(|e| CompileError::io(archive_path, e))?;
    merge_into(staging.path(), parent)?;

    tracing::debug!(archive = %archive_path.display(), files = count, "Expanded nested archive");
    Ok(count)
}

/// Move everything under `from` into `to`; files overwrite, directories merge.
fn merge_into(from: &Path, to: &Path) -> Result<(), CompileError> {
    let entries = fs::read_dir(from).map_err(|e| CompileError::io(from, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| CompileError::io(from, e))?;
        let source = entry.path();
        let target = to.join(entry.file_name());
        let is_dir = entry
            .file_type()
            .map_err(|e| CompileError::io(&source, e))?
            .is_dir();

        if is_dir && target.is_dir() {
            merge_into(&source, &target)?;
            continue;
        }
        if target.is_dir() {
            fs::remove_dir_all(&target).map_err(|e| CompileError::io(&target, e))?;
        } else if is_dir && target.exists() {
            fs::remove_file(&target).map_err(|e| CompileError::io(&target, e))?;
        }
        fs::rename(&source, &target).map_err(|e| CompileError::io(&source, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::test_support::{write_zip, zip_bytes};
    use crate::progress::test_support::RecordingObserver;
    use crate::progress::NoopObserver;
    use crate::types::Phase;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::Ordering;
    use tempfile::TempDir;

    fn relative_files(root: &Path) -> Vec<String> {
        let mut names: Vec<String> = tree_files(root)
            .unwrap()
            .into_iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_no_archives_completes_immediately() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("page.jpg"), b"j").unwrap();

        let observer = RecordingObserver::default();
        observer.phase_started(Phase::Extracting);
        let stats = unpack_all(dir.path(), 4, &observer).unwrap();

        assert_eq!(stats, UnpackStats::default());
        assert_eq!(observer.completions(Phase::Extracting), vec![0.0, 1.0]);
    }

    #[test]
    fn test_nested_archives_are_fully_expanded() {
        let dir = TempDir::new().unwrap();
        let inner = zip_bytes(&[("page2.jpg", b"two")]);
        write_zip(
            &dir.path().join("outer.zip"),
            &[("page1.jpg", b"one"), ("sub/inner.zip", &inner)],
        );

        let stats = unpack_all(dir.path(), 8, &NoopObserver).unwrap();
        assert_eq!(stats, UnpackStats { archives: 2, passes: 2 });
        assert_eq!(
            relative_files(dir.path()),
            vec!["page1.jpg".to_string(), "sub/page2.jpg".to_string()]
        );
    }

    #[test]
    fn test_aliases_inside_archives_are_expanded() {
        let dir = TempDir::new().unwrap();
        let issue = zip_bytes(&[("page1.jpg", b"one")]);
        let rar_issue = crate::archive::test_support::rar4_bytes(&[("page2.jpg", b"two")]);
        write_zip(
            &dir.path().join("volume.cbz"),
            &[("issue1.cbz", &issue), ("extra/issue2.CBR", &rar_issue)],
        );

        let stats = unpack_all(dir.path(), 8, &NoopObserver).unwrap();
        assert_eq!(stats, UnpackStats { archives: 3, passes: 2 });
        assert_eq!(
            relative_files(dir.path()),
            vec!["extra/page2.jpg".to_string(), "page1.jpg".to_string()]
        );
    }

    #[test]
    fn test_progress_is_monotonic_and_ends_at_one() {
        let dir = TempDir::new().unwrap();
        let inner = zip_bytes(&[("deep.jpg", b"d")]);
        write_zip(&dir.path().join("a.zip"), &[("a.jpg", b"a"), ("n.zip", &inner)]);
        write_zip(&dir.path().join("b.zip"), &[("b.jpg", b"b")]);
        fs::write(dir.path().join("loose.jpg"), b"l").unwrap();

        let observer = RecordingObserver::default();
        observer.phase_started(Phase::Extracting);
        unpack_all(dir.path(), 8, &observer).unwrap();

        let values = observer.completions(Phase::Extracting);
        assert!(values.windows(2).all(|w| w[0] <= w[1]), "{values:?}");
        assert_eq!(values.last().copied(), Some(1.0));
    }

    #[test]
    fn test_archive_containing_its_own_name() {
        let dir = TempDir::new().unwrap();
        let inner = zip_bytes(&[("page.jpg", b"p")]);
        write_zip(&dir.path().join("hero.zip"), &[("hero.zip", &inner)]);

        unpack_all(dir.path(), 8, &NoopObserver).unwrap();
        assert_eq!(relative_files(dir.path()), vec!["page.jpg".to_string()]);
    }

    #[test]
    fn test_expanded_entries_overwrite_siblings() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("art")).unwrap();
        fs::write(dir.path().join("art/cover.jpg"), b"old").unwrap();
        write_zip(
            &dir.path().join("bundle.zip"),
            &[("art/cover.jpg", b"new"), ("art/back.jpg", b"back")],
        );

        unpack_all(dir.path(), 8, &NoopObserver).unwrap();
        assert_eq!(fs::read(dir.path().join("art/cover.jpg")).unwrap(), b"new");
        assert!(dir.path().join("art/back.jpg").is_file());
        assert!(!dir.path().join("bundle.zip").exists());
    }

    #[test]
    fn test_nesting_limit() {
        let dir = TempDir::new().unwrap();
        let level2 = zip_bytes(&[("page.jpg", b"p")]);
        let level1 = zip_bytes(&[("level2.zip", &level2)]);
        write_zip(&dir.path().join("level0.zip"), &[("level1.zip", &level1)]);

        let err = unpack_all(dir.path(), 2, &NoopObserver).unwrap_err();
        assert!(matches!(err, CompileError::NestingTooDeep { limit: 2, .. }));
    }

    #[test]
    fn test_cancellation_stops_the_walk() {
        let dir = TempDir::new().unwrap();
        write_zip(&dir.path().join("a.zip"), &[("a.jpg", b"a")]);

        let observer = RecordingObserver::default();
        observer.cancel.store(true, Ordering::Relaxed);
        let err = unpack_all(dir.path(), 8, &observer).unwrap_err();
        assert!(matches!(err, CompileError::Cancelled));
        assert!(dir.path().join("a.zip").exists());
    }

    #[test]
    fn test_corrupt_nested_archive_fails() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("broken.zip"), b"not a zip").unwrap();
        let err = unpack_all(dir.path(), 8, &NoopObserver).unwrap_err();
        assert!(matches!(err, CompileError::Archive(_)));
    }
}
