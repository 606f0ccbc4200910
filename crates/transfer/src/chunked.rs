use std::io::Read;
use std::path::Path;

use bytes::Bytes;
use sha2::{Digest, Sha256};

use crate::types::{ChunkDescriptor, UploadFile};
use crate::{
    LARGE_FILE_THRESHOLD, MAX_CHUNK_SIZE, MEDIUM_CHUNK_SIZE, MIN_CHUNK_SIZE, SMALL_FILE_THRESHOLD,
    TransferError,
};

// ---------------------------------------------------------------------------
// Checksum helpers
// ---------------------------------------------------------------------------

/// Computes SHA-256 of `data` and returns the hex-encoded digest.
pub fn checksum_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Computes SHA-256 of an entire file and returns the hex-encoded digest.
pub fn checksum_file(path: &Path) -> Result<String, TransferError> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

// ---------------------------------------------------------------------------
// Chunk sizing
// ---------------------------------------------------------------------------

/// Picks a chunk size for a file of `file_size` bytes.
///
/// - under 10 MiB: about 20 chunks, clamped to 64 KiB..=1 MiB
/// - 10 MiB up to 100 MiB: 1 MiB
/// - 100 MiB and up: about 50 chunks, at most 10 MiB
pub fn choose_chunk_size(file_size: u64) -> u64 {
    if file_size < SMALL_FILE_THRESHOLD {
        file_size
            .div_ceil(20)
            .clamp(MIN_CHUNK_SIZE, MEDIUM_CHUNK_SIZE)
    } else if file_size < LARGE_FILE_THRESHOLD {
        MEDIUM_CHUNK_SIZE
    } else {
        file_size.div_ceil(50).min(MAX_CHUNK_SIZE)
    }
}

// ---------------------------------------------------------------------------
// ChunkPlan
// ---------------------------------------------------------------------------

/// Slices `file` into chunks of `chunk_size` bytes.
///
/// A `chunk_size` of 0 falls back to [`choose_chunk_size`]. Fails when the
/// chunk count does not fit a `u32` chunk number.
pub fn plan(file: &UploadFile, chunk_size: u64) -> Result<ChunkPlan, TransferError> {
    let chunk_size = if chunk_size == 0 {
        choose_chunk_size(file.size())
    } else {
        chunk_size
    };
    ChunkPlan::new(file.data.clone(), chunk_size)
}

/// Number of chunks of `chunk_size` bytes covering `file_size` bytes.
pub fn chunk_count(file_size: u64, chunk_size: u64) -> Result<u32, TransferError> {
    let chunks = file_size.div_ceil(chunk_size);
    u32::try_from(chunks).map_err(|_| TransferError::TooManyChunks { chunks, chunk_size })
}

/// Lazy, restartable sequence of [`ChunkDescriptor`]s covering a file.
///
/// Chunk `i` starts at `i * chunk_size`; numbering is 0-based and assigned
/// at slice time. Descriptors share the file's buffer.
#[derive(Debug, Clone)]
pub struct ChunkPlan {
    data: Bytes,
    chunk_size: u64,
    total_chunks: u32,
    next: u32,
}

impl ChunkPlan {
    fn new(data: Bytes, chunk_size: u64) -> Result<Self, TransferError> {
        let total_chunks = chunk_count(data.len() as u64, chunk_size)?;
        Ok(Self {
            data,
            chunk_size,
            total_chunks,
            next: 0,
        })
    }

    /// Repositions the plan so the next descriptor is chunk `index`.
    pub fn starting_at(mut self, index: u32) -> Self {
        self.next = index.min(self.total_chunks);
        self
    }

    /// Returns the descriptor for chunk `index`, if it exists.
    pub fn get(&self, index: u32) -> Option<ChunkDescriptor> {
        if index >= self.total_chunks {
            return None;
        }
        let file_size = self.file_size();
        let offset = index as u64 * self.chunk_size;
        let size = self.chunk_size.min(file_size - offset);
        let bytes = self
            .data
            .slice(offset as usize..(offset + size) as usize);
        Some(ChunkDescriptor {
            bytes,
            chunk_number: index,
            total_chunks: self.total_chunks,
            offset,
            size,
            is_last_chunk: offset + size == file_size,
        })
    }

    /// Chunk size used by this plan.
    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Number of chunks in the whole plan.
    pub fn total_chunks(&self) -> u32 {
        self.total_chunks
    }

    /// Size of the planned file in bytes.
    pub fn file_size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Bytes covered by chunks before `index`.
    pub fn bytes_before(&self, index: u32) -> u64 {
        (index as u64 * self.chunk_size).min(self.file_size())
    }
}

impl Iterator for ChunkPlan {
    type Item = ChunkDescriptor;

    fn next(&mut self) -> Option<Self::Item> {
        let chunk = self.get(self.next)?;
        self.next += 1;
        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.total_chunks - self.next) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ChunkPlan {}
