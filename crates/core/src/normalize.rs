// crates/core/src/normalize.rs
//! Extension normalization: rewrites comic archive aliases to their real
//! container extension so later stages can dispatch on extension alone.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::CompileError;

/// Canonical extension for a comic alias, if `path` carries one.
fn canonical_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "cbr" => Some("rar"),
        "cbz" => Some("zip"),
        _ => None,
    }
}

/// Rename every `.cbr`/`.cbz` file under `root` to `.rar`/`.zip`.
///
/// Idempotent: a second pass finds nothing to rename. Returns the renamed
/// paths (new names).
pub fn normalize_extensions(root: &Path) -> Result<Vec<PathBuf>, CompileError> {
    let mut targets = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| CompileError::walk(root, e))?;
        if entry.file_type().is_file() {
            if let Some(ext) = canonical_for(entry.path()) {
                targets.push((entry.into_path(), ext));
            }
        }
    }

    let mut renamed = Vec::with_capacity(targets.len());
    for (from, ext) in targets {
        let to = from.with_extension(ext);
        fs::rename(&from, &to).map_err(|e| CompileError::io(&from, e))?;
        tracing::debug!(from = %from.display(), to = %to.display(), "Normalized archive extension");
        renamed.push(to);
    }
    Ok(renamed)
}
