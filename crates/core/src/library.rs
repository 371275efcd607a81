// crates/core/src/library.rs
//! Comic library browsing.
//!
//! The library is laid out as `<root>/<series>/<volume>/<comic file>`. Only
//! that third level holds comics; loose files at the upper levels, hidden
//! entries and the published output directory are ignored.

use std::fs;
use std::path::{Path, PathBuf};

use crate::archive;
use crate::error::LibraryError;
use crate::types::{format_size, ComicFile};

/// A comic found in the library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryComic {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
}

impl From<&LibraryComic> for ComicFile {
    fn from(comic: &LibraryComic) -> Self {
        ComicFile {
            name: comic.name.clone(),
            size: format_size(comic.size),
        }
    }
}

/// Read-only view of the comic library.
#[derive(Debug, Clone)]
pub struct Library {
    root: PathBuf,
    excluded: Option<PathBuf>,
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

/// Sorted child entries of `dir`.
fn sorted_children(dir: &Path) -> Result<Vec<fs::DirEntry>, LibraryError> {
    let mut children = fs::read_dir(dir)
        .map_err(|e| LibraryError::io(dir, e))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| LibraryError::io(dir, e))?;
    children.sort_by_key(|entry| entry.file_name());
    Ok(children)
}

impl Library {
    /// `excluded` is a directory under `root` to skip while listing (the
    /// published output directory, when it lives inside the library).
    pub fn new(root: impl Into<PathBuf>, excluded: Option<PathBuf>) -> Self {
        Self {
            root: root.into(),
            excluded,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_excluded(&self, path: &Path) -> bool {
        is_hidden(path) || self.excluded.as_deref() == Some(path)
    }

    /// All comics, in series/volume/name order.
    ///
    /// Unreadable series or volume directories are skipped with a warning; a
    /// missing library root is an error.
    pub fn comics(&self) -> Result<Vec<LibraryComic>, LibraryError> {
        let mut comics = Vec::new();
        for series in sorted_children(&self.root)? {
            let series_path = series.path();
            if self.is_excluded(&series_path) || !series_path.is_dir() {
                continue;
            }
            let volumes = match sorted_children(&series_path) {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(path = %series_path.display(), error = %e, "Skipping unreadable series");
                    continue;
                }
            };
            for volume in volumes {
                let volume_path = volume.path();
                if is_hidden(&volume_path) || !volume_path.is_dir() {
                    continue;
                }
                let files = match sorted_children(&volume_path) {
                    Ok(f) => f,
                    Err(e) => {
                        tracing::warn!(path = %volume_path.display(), error = %e, "Skipping unreadable volume");
                        continue;
                    }
                };
                for file in files {
                    let path = file.path();
                    let Ok(metadata) = file.metadata() else {
                        continue;
                    };
                    if !metadata.is_file() || is_hidden(&path) {
                        continue;
                    }
                    comics.push(LibraryComic {
                        name: file.file_name().to_string_lossy().into_owned(),
                        path,
                        size: metadata.len(),
                    });
                }
            }
        }
        Ok(comics)
    }

    /// Listing form of [`Library::comics`].
    pub fn list_comics(&self) -> Result<Vec<ComicFile>, LibraryError> {
        Ok(self.comics()?.iter().map(ComicFile::from).collect())
    }

    /// Locate a comic by exact file name; the first match in listing order wins.
    pub fn resolve(&self, name: &str) -> Result<PathBuf, LibraryError> {
        self.comics()?
            .into_iter()
            .find(|comic| comic.name == name)
            .map(|comic| comic.path)
            .ok_or_else(|| LibraryError::ComicNotFound {
                name: name.to_string(),
            })
    }

    /// Entries inside a comic's archive, skipping zero-size entries.
    ///
    /// A comic whose archive cannot be read reports no entries.
    pub fn comic_info(&self, name: &str) -> Result<Vec<ComicFile>, LibraryError> {
        let path = self.resolve(name)?;
        Ok(archive::list_entries(&path)
            .into_iter()
            .filter(|entry| entry.size > 0)
            .map(|entry| ComicFile {
                name: entry.name,
                size: format_size(entry.size),
            })
            .collect())
    }
}

/// Compiled `.cbz` files in `dir`, sorted by name. A missing directory lists
/// as empty.
pub fn published_comics(dir: &Path) -> Result<Vec<ComicFile>, LibraryError> {
    let children = match sorted_children(dir) {
        Ok(children) => children,
        Err(LibraryError::LibraryDirNotFound { .. }) => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut published = Vec::new();
    for child in children {
        let path = child.path();
        let is_cbz = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("cbz"));
        if !is_cbz {
            continue;
        }
        let metadata = child.metadata().map_err(|e| LibraryError::io(&path, e))?;
        if metadata.is_file() {
            published.push(ComicFile {
                name: child.file_name().to_string_lossy().into_owned(),
                size: format_size(metadata.len()),
            });
        }
    }
    Ok(published)
}
