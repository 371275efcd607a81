// crates/core/src/pack.rs
//! Flat packer: gathers every file under a directory tree into a single
//! stored-mode zip with no directory structure.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::archive::{self, PackItem};
use crate::error::{ArchiveError, CompileError};
use crate::progress::{CompileObserver, MonotonicProgress};

/// Every regular file under `root`, depth-first with siblings sorted by name.
pub fn collect_files(root: &Path) -> Result<Vec<PathBuf>, CompileError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| CompileError::walk(root, e))?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Split `name` at its last dot: `("page", ".jpg")`, or `(name, "")`.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) => name.split_at(idx),
        None => (name, ""),
    }
}

/// Flat entry names for `files`, in the same order.
///
/// The first file with a given base name keeps it; later ones become
/// `<stem>_<k><ext>` with `k` counting up from 1 and skipping any name
/// already handed out.
pub fn entry_names(files: &[PathBuf]) -> Vec<String> {
    let mut next_suffix: HashMap<String, usize> = HashMap::new();
    let mut used: HashSet<String> = HashSet::new();
    let mut names = Vec::with_capacity(files.len());

    for file in files {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (stem, ext) = split_extension(&name);

        let mut k = next_suffix.get(&name).copied().unwrap_or(0);
        let mut candidate = if k == 0 {
            name.clone()
        } else {
            format!("{stem}_{k}{ext}")
        };
        while used.contains(&candidate) {
            k += 1;
            candidate = format!("{stem}_{k}{ext}");
        }

        next_suffix.insert(name.clone(), k + 1);
        used.insert(candidate.clone());
        names.push(candidate);
    }
    names
}

/// Pack every file under `root` into `root/<token>.zip`.
///
/// Reports `(i + 1) / n` after each file. Fails with
/// [`CompileError::NothingToPack`] when the tree holds no files, and with
/// [`CompileError::Cancelled`] when the observer asks to stop mid-pack.
pub fn pack_tree(
    root: &Path,
    token: &str,
    observer: &dyn CompileObserver,
) -> Result<PathBuf, CompileError> {
    let files = collect_files(root)?;
    if files.is_empty() {
        return Err(CompileError::NothingToPack {
            path: root.to_path_buf(),
        });
    }

    let names = entry_names(&files);
    let items: Vec<PackItem> = files
        .into_iter()
        .zip(names)
        .map(|(source, name)| PackItem { source, name })
        .collect();

    let output = root.join(format!("{token}.zip"));
    let mut progress = MonotonicProgress::new();
    let packed = archive::pack(&output, &items, |fraction| {
        progress.advance(observer, fraction);
        !observer.is_cancelled()
    });

    match packed {
        Ok(()) => {
            tracing::debug!(output = %output.display(), files = items.len(), "Packed tree");
            Ok(output)
        }
        Err(ArchiveError::Interrupted { .. }) => Err(CompileError::Cancelled),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::list_entries;
    use crate::progress::test_support::RecordingObserver;
    use crate::progress::NoopObserver;
    use crate::types::Phase;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::sync::atomic::Ordering;
    use tempfile::TempDir;

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_duplicate_names_get_numbered() {
        let names = entry_names(&paths(&["a/x.jpg", "b/x.jpg", "c/x.jpg"]));
        assert_eq!(names, vec!["x.jpg", "x_1.jpg", "x_2.jpg"]);
    }

    #[test]
    fn test_generated_name_skips_existing_literal() {
        let names = entry_names(&paths(&["a/x.jpg", "a/x_1.jpg", "b/x.jpg"]));
        assert_eq!(names, vec!["x.jpg", "x_1.jpg", "x_2.jpg"]);

        let names = entry_names(&paths(&["a/x.jpg", "b/x.jpg", "c/x_1.jpg"]));
        assert_eq!(names, vec!["x.jpg", "x_1.jpg", "x_1_1.jpg"]);
    }

    #[test]
    fn test_names_without_extension_and_multiple_dots() {
        let names = entry_names(&paths(&["a/README", "b/README", "a/p.tar.gz", "b/p.tar.gz"]));
        assert_eq!(names, vec!["README", "README_1", "p.tar.gz", "p.tar_1.gz"]);
    }

    #[test]
    fn test_pack_tree_flattens() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("ch1")).unwrap();
        fs::create_dir_all(root.join("ch2")).unwrap();
        fs::write(root.join("ch1/page.jpg"), b"one").unwrap();
        fs::write(root.join("ch2/page.jpg"), b"two").unwrap();
        fs::write(root.join("cover.jpg"), b"cover").unwrap();

        let observer = RecordingObserver::default();
        observer.phase_started(Phase::Compiling);
        let output = pack_tree(root, "tok", &observer).unwrap();
        assert_eq!(output, root.join("tok.zip"));

        let names: Vec<String> = list_entries(&output).into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["page.jpg", "page_1.jpg", "cover.jpg"]);

        let values = observer.completions(Phase::Compiling);
        assert_eq!(values.len(), 4);
        assert_eq!(values.last().copied(), Some(1.0));
    }

    #[test]
    fn test_empty_tree_has_nothing_to_pack() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("empty/nested")).unwrap();
        let err = pack_tree(dir.path(), "tok", &NoopObserver).unwrap_err();
        assert!(matches!(err, CompileError::NothingToPack { .. }));
        assert!(!dir.path().join("tok.zip").exists());
    }

    #[test]
    fn test_cancel_during_pack() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.jpg"), b"a").unwrap();
        fs::write(dir.path().join("b.jpg"), b"b").unwrap();

        let observer = RecordingObserver::default();
        observer.cancel.store(true, Ordering::Relaxed);
        let err = pack_tree(dir.path(), "tok", &observer).unwrap_err();
        assert!(matches!(err, CompileError::Cancelled));
    }
}
