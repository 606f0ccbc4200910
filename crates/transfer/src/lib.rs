//! Transfer primitives for chunked uploads.
//!
//! Everything here is synchronous and transport-agnostic: validating the
//! input file, choosing a chunk size, slicing the file into self-describing
//! [`ChunkDescriptor`]s, hashing chunks, aggregating progress, and the
//! backoff arithmetic shared by chunk retries and job polling.

mod chunked;
mod progress;
mod retry;
mod types;
mod validation;

pub use chunked::{
    ChunkPlan, checksum_bytes, checksum_file, choose_chunk_size, chunk_count, plan,
};
pub use progress::{ProgressAggregator, SpeedCalculator};
pub use retry::{Backoff, RetryPolicy};
pub use types::{ChunkDescriptor, UploadFile, UploadProgress};
pub use validation::{validate_size, validate_upload};

/// 1 KiB.
pub const KIB: u64 = 1024;

/// 1 MiB.
pub const MIB: u64 = 1024 * KIB;

/// Largest file accepted for upload: 500 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 500 * MIB;

/// Smallest chunk used for files under [`SMALL_FILE_THRESHOLD`].
pub const MIN_CHUNK_SIZE: u64 = 64 * KIB;

/// Chunk size for medium files, and the ceiling for small ones.
pub const MEDIUM_CHUNK_SIZE: u64 = MIB;

/// Ceiling on the chunk size for large files.
pub const MAX_CHUNK_SIZE: u64 = 10 * MIB;

/// Files below this size are split into roughly 20 chunks.
pub const SMALL_FILE_THRESHOLD: u64 = 10 * MIB;

/// Files at or above this size are split into roughly 50 chunks.
pub const LARGE_FILE_THRESHOLD: u64 = 100 * MIB;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no file selected")]
    MissingFile,

    #[error("file is empty")]
    EmptyFile,

    #[error("file is too large ({size} bytes, maximum is {max} bytes)")]
    FileTooLarge { size: u64, max: u64 },

    #[error("{chunks} chunks of {chunk_size} bytes exceed the chunk number range")]
    TooManyChunks { chunks: u64, chunk_size: u64 },
}
