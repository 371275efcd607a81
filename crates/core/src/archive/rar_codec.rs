// crates/core/src/archive/rar_codec.rs
//! Legacy (RAR) container support, backed by libunrar.
//!
//! Listing reads file headers only. Extraction walks the headers once and
//! writes each selected file to a path computed here, so entry names are
//! checked before anything touches the disk.

use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path};

use unrar::Archive;

use crate::error::ArchiveError;
use crate::types::ArchiveEntry;

fn ensure_file(path: &Path) -> Result<(), ArchiveError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ArchiveError::NotFound {
            path: path.to_path_buf(),
        })
    }
}

/// Entry name as `/`-separated text.
fn entry_name(filename: &Path) -> String {
    filename.to_string_lossy().replace('\\', "/")
}

fn is_enclosed(name: &str) -> bool {
    Path::new(name)
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
}

pub(crate) fn list(path: &Path) -> Result<Vec<ArchiveEntry>, ArchiveError> {
    ensure_file(path)?;
    let archive = Archive::new(path)
        .open_for_listing()
        .map_err(|e| ArchiveError::corrupt(path, e))?;

    let mut entries = Vec::new();
    for header in archive {
        let header = header.map_err(|e| ArchiveError::corrupt(path, e))?;
        if header.is_directory() {
            continue;
        }
        entries.push(ArchiveEntry {
            name: entry_name(&header.filename),
            size: header.unpacked_size,
        });
    }
    Ok(entries)
}

pub(crate) fn extract(
    path: &Path,
    allow_list: &HashSet<String>,
    dest: &Path,
) -> Result<usize, ArchiveError> {
    ensure_file(path)?;
    fs::create_dir_all(dest).map_err(|e| ArchiveError::io(dest, e))?;

    let mut archive = Archive::new(path)
        .open_for_processing()
        .map_err(|e| ArchiveError::corrupt(path, e))?;

    let mut count: usize = 0;
    while let Some(header) = archive
        .read_header()
        .map_err(|e| ArchiveError::corrupt(path, e))?
    {
        let name = entry_name(&header.entry().filename);
        let is_dir = header.entry().is_directory();
        let selected = allow_list.is_empty() || allow_list.contains(&name);

        if !selected {
            archive = header.skip().map_err(|e| ArchiveError::corrupt(path, e))?;
            continue;
        }
        if !is_enclosed(&name) {
            tracing::warn!(
                archive = %path.display(),
                entry = %name,
                "Skipping entry that escapes the destination"
            );
            archive = header.skip().map_err(|e| ArchiveError::corrupt(path, e))?;
            continue;
        }

        let target = dest.join(&name);
        if is_dir {
            fs::create_dir_all(&target).map_err(|e| ArchiveError::io(&target, e))?;
            archive = header.skip().map_err(|e| ArchiveError::corrupt(path, e))?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| ArchiveError::io(parent, e))?;
        }
        archive = header
            .extract_to(&target)
            .map_err(|e| ArchiveError::corrupt(path, e))?;
        count += 1;
    }

    Ok(count)
}
