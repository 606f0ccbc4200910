use std::path::Path;

use bytes::Bytes;

use crate::TransferError;
use crate::validation::validate_size;

/// A file selected for upload, held in memory.
///
/// Chunk descriptors borrow slices of `data` without copying.
#[derive(Debug, Clone)]
pub struct UploadFile {
    /// File name sent to the server (no directory part).
    pub name: String,
    /// MIME type used by the single-PUT path.
    pub content_type: String,
    /// Raw file contents.
    pub data: Bytes,
}

impl UploadFile {
    /// Wraps in-memory bytes, guessing the content type from `name`.
    pub fn from_bytes(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let name = name.into();
        let content_type = content_type_for(&name).to_string();
        Self {
            name,
            content_type,
            data: data.into(),
        }
    }

    /// Reads a file from disk.
    ///
    /// The size recorded in the file's metadata is checked against
    /// `max_size` first, so oversized or empty files are never read.
    pub async fn open(path: &Path, max_size: u64) -> Result<Self, TransferError> {
        let size = tokio::fs::metadata(path).await?.len();
        validate_size(size, max_size)?;
        let data = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::from_bytes(name, data))
    }

    /// File size in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Maps a file extension to a MIME type; unknown types are sent as binary.
fn content_type_for(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "csv" => "text/csv",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "xml" => "application/xml",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "fit" => "application/vnd.ant.fit",
        _ => "application/octet-stream",
    }
}

/// One contiguous slice of the source file, transmitted as one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkDescriptor {
    /// Raw chunk bytes.
    pub bytes: Bytes,
    /// 0-based index, dense and ordered by `offset`.
    pub chunk_number: u32,
    /// Number of chunks in the whole plan.
    pub total_chunks: u32,
    /// Byte offset of this chunk within the file.
    pub offset: u64,
    /// Size of this chunk in bytes.
    pub size: u64,
    /// Set only on the chunk whose range ends at the file size.
    pub is_last_chunk: bool,
}

impl ChunkDescriptor {
    /// Offset one past the last byte of this chunk.
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }
}

/// Aggregate progress of one upload attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UploadProgress {
    /// Bytes acknowledged so far.
    pub loaded: u64,
    /// Bytes expected in total.
    pub total: u64,
    /// `loaded / total` scaled to 0–100.
    pub percentage: f64,
}

impl UploadProgress {
    /// Builds a progress snapshot, clamping `loaded` to `total`.
    pub fn new(loaded: u64, total: u64) -> Self {
        let loaded = loaded.min(total);
        let percentage = if total == 0 {
            0.0
        } else {
            loaded as f64 / total as f64 * 100.0
        };
        Self {
            loaded,
            total,
            percentage,
        }
    }

    /// Returns `true` once every byte has been acknowledged.
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.loaded == self.total
    }
}
