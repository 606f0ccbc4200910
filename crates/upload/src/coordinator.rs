//! Whole-file chunked upload.
//!
//! Chunks are sent in groups of at most `max_parallel_uploads`. Chunks within
//! a group run concurrently on the calling task; groups run strictly in plan
//! order, and the first unrecovered failure ends the upload.

use futures_util::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use vitals_protocol::ChunkAck;
use vitals_transfer::{
    ChunkDescriptor, ProgressAggregator, UploadFile, choose_chunk_size, plan, validate_upload,
};

use crate::checksum::digest_chunk;
use crate::config::ClientConfig;
use crate::endpoint::{ChunkEndpoint, ChunkRequest};
use crate::error::{ErrorDetails, TransmitError, TransmitErrorCode, UploadError};
use crate::observer::UploadObserver;
use crate::transmitter::ChunkTransmitter;
use crate::types::{FinalAck, UploadOptions};

/// Drives a file through the chunk endpoint.
pub struct UploadCoordinator<'a> {
    endpoint: &'a dyn ChunkEndpoint,
    config: &'a ClientConfig,
    observer: &'a dyn UploadObserver,
}

impl<'a> UploadCoordinator<'a> {
    pub fn new(
        endpoint: &'a dyn ChunkEndpoint,
        config: &'a ClientConfig,
        observer: &'a dyn UploadObserver,
    ) -> Self {
        Self {
            endpoint,
            config,
            observer,
        }
    }

    /// Uploads `file` and returns the acknowledgment of its last chunk.
    ///
    /// Validation runs before any request is made. Chunks before
    /// `options.start_chunk` are skipped and counted as already loaded.
    pub async fn upload(
        &self,
        file: &UploadFile,
        options: &UploadOptions,
    ) -> Result<FinalAck, UploadError> {
        validate_upload(Some(file), self.config.max_file_size)?;

        let chunk_size = options
            .chunk_size
            .filter(|&size| size > 0)
            .unwrap_or_else(|| choose_chunk_size(file.size()));
        let chunks = plan(file, chunk_size)?;
        let total_chunks = chunks.total_chunks();
        if options.start_chunk >= total_chunks {
            return Err(start_out_of_range(options.start_chunk, total_chunks).into());
        }
        let progress =
            ProgressAggregator::new(file.size(), chunks.bytes_before(options.start_chunk));
        let mut chunks = chunks.starting_at(options.start_chunk);

        let parallel = options
            .max_parallel_uploads
            .unwrap_or(self.config.max_parallel_uploads)
            .max(1);
        let transmitter = ChunkTransmitter::new(
            self.endpoint,
            self.config.chunk_policy(options.max_retries),
            self.config.chunk_timeout(),
            self.observer,
        );

        info!(
            file = %file.name,
            size = file.size(),
            chunk_size,
            total_chunks,
            parallel,
            start_chunk = options.start_chunk,
            "starting chunked upload"
        );

        let mut final_ack = None;
        loop {
            let group: Vec<ChunkDescriptor> = chunks.by_ref().take(parallel).collect();
            let Some(first) = group.first() else {
                break;
            };
            if options.cancel.is_cancelled() {
                return Err(TransmitError::cancelled(Some(first.chunk_number), 0).into());
            }
            debug!(
                first = first.chunk_number,
                len = group.len(),
                "sending chunk group"
            );

            let results = join_all(group.iter().map(|descriptor| {
                self.send_chunk(
                    &transmitter,
                    descriptor,
                    &file.name,
                    &progress,
                    &options.cancel,
                )
            }))
            .await;

            let mut failure: Option<TransmitError> = None;
            for (descriptor, result) in group.iter().zip(results) {
                match result {
                    Ok(ack) if descriptor.is_last_chunk => final_ack = Some(ack),
                    Ok(_) => {}
                    // A cancellation outranks any failure in the same group.
                    Err(e) if e.is_cancelled() => {
                        if !failure.as_ref().is_some_and(TransmitError::is_cancelled) {
                            failure = Some(e);
                        }
                    }
                    Err(e) => {
                        failure.get_or_insert(e);
                    }
                }
            }
            if let Some(err) = failure {
                info!(file = %file.name, error = %err, "chunked upload stopped");
                return Err(err.into());
            }
        }

        let ack = final_ack.ok_or_else(|| TransmitError {
            code: TransmitErrorCode::UploadFailed,
            message: "final chunk was never acknowledged".into(),
            details: ErrorDetails {
                chunk_number: total_chunks.checked_sub(1),
                ..ErrorDetails::default()
            },
        })?;
        info!(file = %file.name, total_chunks, "chunked upload complete");

        Ok(FinalAck {
            file_name: file.name.clone(),
            file_size: file.size(),
            total_chunks,
            ack,
        })
    }

    async fn send_chunk(
        &self,
        transmitter: &ChunkTransmitter<'_>,
        descriptor: &ChunkDescriptor,
        file_name: &str,
        progress: &ProgressAggregator,
        cancel: &CancellationToken,
    ) -> Result<ChunkAck, TransmitError> {
        let checksum = match digest_chunk(descriptor.bytes.clone()).await {
            Ok(checksum) => checksum,
            Err(reason) => {
                self.observer
                    .on_checksum_unavailable(descriptor.chunk_number, &reason);
                String::new()
            }
        };
        let request = ChunkRequest {
            descriptor,
            file_name,
            checksum: &checksum,
        };
        transmitter.send(request, progress, cancel).await
    }
}

fn start_out_of_range(start_chunk: u32, total_chunks: u32) -> TransmitError {
    TransmitError {
        code: TransmitErrorCode::UploadFailed,
        message: format!("start chunk {start_chunk} is past the last chunk ({total_chunks} total)"),
        details: ErrorDetails {
            chunk_number: Some(start_chunk),
            ..ErrorDetails::default()
        },
    }
}
