// crates/core/src/types.rs
//! Shared value types for the compile pipeline and the listing endpoints.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Named stage of a compile job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Initializing,
    Extracting,
    Compiling,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Initializing => "initializing",
            Phase::Extracting => "extracting",
            Phase::Compiling => "compiling",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phase plus completion fraction, as shown to polling clients.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub status: Phase,
    pub completion: f32,
}

impl Progress {
    pub fn start(phase: Phase) -> Self {
        Self {
            status: phase,
            completion: 0.0,
        }
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::start(Phase::Initializing)
    }
}

/// A named file with a human-readable size, used by every listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComicFile {
    pub name: String,
    pub size: String,
}

/// One item inside an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Relative name inside the archive, `/`-separated.
    pub name: String,
    pub size: u64,
}

/// Container format, detected from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    Rar,
}

impl ArchiveFormat {
    /// Detect the format from an extension, accepting the comic aliases.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "zip" | "cbz" => Some(Self::Zip),
            "rar" | "cbr" => Some(Self::Rar),
            _ => None,
        }
    }

    /// Detect the format only from canonical extensions (`zip`, `rar`).
    ///
    /// The unpacker uses this after normalization, so comic aliases that
    /// somehow survive are treated as plain files.
    pub fn from_canonical_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "zip" => Some(Self::Zip),
            "rar" => Some(Self::Rar),
            _ => None,
        }
    }

    pub fn canonical_extension(self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::Rar => "rar",
        }
    }
}

/// Format a byte count with base-1024 units and one decimal place.
///
/// `512` → `512.0B`, `1536` → `1.5KB`.
pub fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size < KB {
        format!("{:.1}B", size as f64)
    } else if size < MB {
        format!("{:.1}KB", size as f64 / KB as f64)
    } else if size < GB {
        format!("{:.1}MB", size as f64 / MB as f64)
    } else {
        format!("{:.1}GB", size as f64 / GB as f64)
    }
}
