/// Multipart field carrying the raw chunk bytes.
pub const FIELD_CHUNK: &str = "chunk";

/// Multipart field with the 0-based chunk index.
pub const FIELD_CHUNK_NUMBER: &str = "chunkNumber";

/// Multipart field with the total number of chunks in the plan.
pub const FIELD_TOTAL_CHUNKS: &str = "totalChunks";

/// Multipart field, `"true"` only on the final chunk.
pub const FIELD_IS_LAST_CHUNK: &str = "isLastChunk";

/// Multipart field with the original file name.
pub const FIELD_FILE_NAME: &str = "fileName";

/// Multipart field with the SHA-256 hex digest of the chunk (may be empty).
pub const FIELD_CHECKSUM: &str = "checksum";

/// Query parameter identifying a processing job on the status endpoint.
pub const PARAM_PROCESSING_ID: &str = "processingId";

/// Default path of the chunk upload endpoint.
pub const DEFAULT_CHUNK_PATH: &str = "/api/upload/chunk";

/// Default path of the processing trigger endpoint.
pub const DEFAULT_START_PATH: &str = "/api/process/start";

/// Default path of the processing status endpoint.
pub const DEFAULT_STATUS_PATH: &str = "/api/process/status";

/// Default path of the signed-URL endpoint used by the single-PUT path.
pub const DEFAULT_SIGNED_URL_PATH: &str = "/api/upload/signed-url";

/// Encodes a boolean the way the chunk endpoint expects it.
pub fn bool_field(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}
