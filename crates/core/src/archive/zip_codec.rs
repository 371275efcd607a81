// crates/core/src/archive/zip_codec.rs
//! Zip container support: listing, selective extraction and stored-mode packing.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::PackItem;
use crate::error::ArchiveError;
use crate::types::ArchiveEntry;

fn open(path: &Path) -> Result<ZipArchive<BufReader<File>>, ArchiveError> {
    let file = File::open(path).map_err(|e| ArchiveError::io(path, e))?;
    ZipArchive::new(BufReader::new(file)).map_err(|e| ArchiveError::from((path.to_path_buf(), e)))
}

pub(crate) fn list(path: &Path) -> Result<Vec<ArchiveEntry>, ArchiveError> {
    let mut archive = open(path)?;
    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let entry = archive
            .by_index_raw(i)
            .map_err(|e| ArchiveError::from((path.to_path_buf(), e)))?;
        entries.push(ArchiveEntry {
            name: entry.name().to_string(),
            size: entry.size(),
        });
    }
    Ok(entries)
}

pub(crate) fn extract(
    path: &Path,
    allow_list: &HashSet<String>,
    dest: &Path,
) -> Result<usize, ArchiveError> {
    let mut archive = open(path)?;

    let mut count: usize = 0;
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| ArchiveError::from((path.to_path_buf(), e)))?;

        if !allow_list.is_empty() && !allow_list.contains(entry.name()) {
            continue;
        }

        let relative: PathBuf = match entry.enclosed_name() {
            Some(p) => p.to_path_buf(),
            None => {
                tracing::warn!(
                    archive = %path.display(),
                    entry = entry.name(),
                    "Skipping entry that escapes the destination"
                );
                continue;
            }
        };
        let output_path = dest.join(&relative);

        if entry.is_dir() {
            fs::create_dir_all(&output_path).map_err(|e| ArchiveError::io(&output_path, e))?;
            continue;
        }

        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ArchiveError::io(parent, e))?;
        }
        let mut outfile =
            File::create(&output_path).map_err(|e| ArchiveError::io(&output_path, e))?;
        io::copy(&mut entry, &mut outfile).map_err(|e| ArchiveError::io(&output_path, e))?;
        count += 1;
    }

    Ok(count)
}

pub(crate) fn pack<F>(output: &Path, items: &[PackItem], mut on_progress: F) -> Result<(), ArchiveError>
where
    F: FnMut(f32) -> bool,
{
    let file = File::create(output).map_err(|e| ArchiveError::io(output, e))?;
    let mut writer = ZipWriter::new(BufWriter::new(file));
    let zip_err = |e: zip::result::ZipError| ArchiveError::from((output.to_path_buf(), e));

    let total = items.len();
    for (index, item) in items.iter().enumerate() {
        let mut source = File::open(&item.source).map_err(|e| ArchiveError::io(&item.source, e))?;
        let size = source
            .metadata()
            .map_err(|e| ArchiveError::io(&item.source, e))?
            .len();

        // Pages are already-compressed images; storing keeps extraction cheap.
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .large_file(size >= u64::from(u32::MAX));

        writer.start_file(item.name.clone(), options).map_err(zip_err)?;
        io::copy(&mut source, &mut writer).map_err(|e| ArchiveError::io(output, e))?;

        if !on_progress((index + 1) as f32 / total as f32) {
            return Err(ArchiveError::Interrupted {
                path: output.to_path_buf(),
            });
        }
    }

    let mut inner = writer.finish().map_err(zip_err)?;
    inner.flush().map_err(|e| ArchiveError::io(output, e))?;
    Ok(())
}
