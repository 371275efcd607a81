// crates/core/src/archive/mod.rs
//! Archive codec: reads zip and rar containers, writes stored-mode zips.
//!
//! Provides:
//! - `list_entries` - entry metadata, empty when the archive cannot be opened
//! - `extract` - materialize entries (optionally an allow-list) under a directory
//! - `pack` - write files into a new zip, reporting progress per file

mod rar_codec;
mod zip_codec;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::ArchiveError;
use crate::types::{ArchiveEntry, ArchiveFormat};

/// One file to be written into a packed archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackItem {
    /// File on disk.
    pub source: PathBuf,
    /// Entry name inside the archive.
    pub name: String,
}

fn detect(path: &Path) -> Result<ArchiveFormat, ArchiveError> {
    ArchiveFormat::from_path(path).ok_or_else(|| ArchiveError::UnsupportedFormat {
        path: path.to_path_buf(),
    })
}

/// List the entries of an archive.
///
/// An archive that cannot be opened yields an empty list rather than an
/// error; callers treat that as "no metadata available".
pub fn list_entries(path: &Path) -> Vec<ArchiveEntry> {
    let result = detect(path).and_then(|format| match format {
        ArchiveFormat::Zip => zip_codec::list(path),
        ArchiveFormat::Rar => rar_codec::list(path),
    });
    match result {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Archive has no readable entries");
            Vec::new()
        }
    }
}

/// Extract entries of `path` into `dest`, preserving relative paths.
///
/// An empty `allow_list` extracts everything. The first failing entry aborts
/// the call; files already written stay on disk. Returns the number of files
/// written.
pub fn extract(
    path: &Path,
    allow_list: &HashSet<String>,
    dest: &Path,
) -> Result<usize, ArchiveError> {
    let count = match detect(path)? {
        ArchiveFormat::Zip => zip_codec::extract(path, allow_list, dest)?,
        ArchiveFormat::Rar => rar_codec::extract(path, allow_list, dest)?,
    };
    tracing::debug!(
        archive = %path.display(),
        dest = %dest.display(),
        files = count,
        "Extracted archive"
    );
    Ok(count)
}

/// Write `items` into a new stored-mode zip at `output`.
///
/// `on_progress` receives `(index + 1) / total` after each file and returns
/// `false` to stop early, which fails with [`ArchiveError::Interrupted`]. A
/// failed pack leaves the partial archive on disk.
pub fn pack<F>(output: &Path, items: &[PackItem], on_progress: F) -> Result<(), ArchiveError>
where
    F: FnMut(f32) -> bool,
{
    zip_codec::pack(output, items, on_progress)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::fs::File;
    use std::io::Write;
    use std::path::{Path, PathBuf};

    use zip::write::SimpleFileOptions;
    use zip::{CompressionMethod, ZipWriter};

    /// Write a stored zip with the given entries.
    pub fn write_zip(path: &Path, files: &[(&str, &[u8])]) -> PathBuf {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        let file = File::create(path).unwrap();
        let mut writer = ZipWriter::new(file);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        for (name, content) in files {
            writer.start_file(name.to_string(), options).unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap();
        path.to_path_buf()
    }

    /// Build the bytes of a stored zip in memory, for nesting inside another zip.
    pub fn zip_bytes(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        for (name, content) in files {
            writer.start_file(name.to_string(), options).unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn push_rar4_block(out: &mut Vec<u8>, head: &[u8], data: &[u8]) {
        let crc = (crc32fast::hash(head) & 0xFFFF) as u16;
        out.extend(crc.to_le_bytes());
        out.extend_from_slice(head);
        out.extend_from_slice(data);
    }

    /// Build a RAR 4.x archive with stored (uncompressed) entries.
    pub fn rar4_bytes(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut out = b"Rar!\x1a\x07\x00".to_vec();

        let mut main = vec![0x73];
        main.extend(0u16.to_le_bytes());
        main.extend(13u16.to_le_bytes());
        main.extend([0u8; 6]);
        push_rar4_block(&mut out, &main, &[]);

        for (name, data) in files {
            let size = data.len() as u32;
            let mut head = vec![0x74];
            head.extend(0x8000u16.to_le_bytes());
            head.extend(((32 + name.len()) as u16).to_le_bytes());
            head.extend(size.to_le_bytes()); // packed
            head.extend(size.to_le_bytes()); // unpacked
            head.push(3); // unix host
            head.extend(crc32fast::hash(data).to_le_bytes());
            head.extend(0x5821_0000u32.to_le_bytes()); // 2024-01-01, DOS time
            head.push(20);
            head.push(0x30); // store
            head.extend((name.len() as u16).to_le_bytes());
            head.extend(0o100644u32.to_le_bytes());
            head.extend_from_slice(name.as_bytes());
            push_rar4_block(&mut out, &head, data);
        }

        let mut end = vec![0x7B];
        end.extend(0x4000u16.to_le_bytes());
        end.extend(7u16.to_le_bytes());
        push_rar4_block(&mut out, &end, &[]);
        out
    }

    fn vint(mut value: u64) -> Vec<u8> {
        let mut bytes = Vec::new();
        loop {
            let low = (value & 0x7F) as u8;
            value >>= 7;
            if value == 0 {
                bytes.push(low);
                return bytes;
            }
            bytes.push(low | 0x80);
        }
    }

    fn push_rar5_block(out: &mut Vec<u8>, fields: &[u8], data: &[u8]) {
        let size = vint(fields.len() as u64);
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&size);
        hasher.update(fields);
        out.extend(hasher.finalize().to_le_bytes());
        out.extend_from_slice(&size);
        out.extend_from_slice(fields);
        out.extend_from_slice(data);
    }

    /// Build a RAR 5 archive with stored (uncompressed) entries.
    pub fn rar5_bytes(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut out = b"Rar!\x1a\x07\x01\x00".to_vec();
        push_rar5_block(&mut out, &[vint(1), vint(0), vint(0)].concat(), &[]);

        for (name, data) in files {
            let size = data.len() as u64;
            let fields = [
                vint(2),          // file header
                vint(0x0002),     // data area present
                vint(size),
                vint(0x0004),     // crc32 present
                vint(size),
                vint(0o100644),
                crc32fast::hash(data).to_le_bytes().to_vec(),
                vint(0),          // RAR 5.0, store
                vint(1),          // unix host
                vint(name.len() as u64),
                name.as_bytes().to_vec(),
            ]
            .concat();
            push_rar5_block(&mut out, &fields, data);
        }

        push_rar5_block(&mut out, &[vint(5), vint(0), vint(0)].concat(), &[]);
        out
    }
}
