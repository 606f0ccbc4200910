use bytes::Bytes;
use vitals_transfer::checksum_bytes;

/// Hashes `bytes` on the blocking pool.
///
/// Returns `Err` with a reason when the hashing task could not complete;
/// callers send the chunk without a checksum in that case.
pub async fn digest_chunk(bytes: Bytes) -> Result<String, String> {
    tokio::task::spawn_blocking(move || checksum_bytes(&bytes))
        .await
        .map_err(|e| format!("checksum task failed: {e}"))
}
