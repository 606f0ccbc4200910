//! Single-chunk transmission with retries, timeout and cancellation.
//!
//! Per chunk: `Pending -> Sending -> {Acked | Retrying -> Sending | Failed | Cancelled}`.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;
use vitals_protocol::ChunkAck;
use vitals_transfer::{ProgressAggregator, RetryPolicy};

use crate::endpoint::{ChunkEndpoint, ChunkRequest};
use crate::error::{EndpointError, TransmitError};
use crate::observer::UploadObserver;

/// Sends chunks to a [`ChunkEndpoint`], retrying retryable failures.
pub struct ChunkTransmitter<'a> {
    endpoint: &'a dyn ChunkEndpoint,
    policy: RetryPolicy,
    attempt_timeout: Duration,
    observer: &'a dyn UploadObserver,
}

impl<'a> ChunkTransmitter<'a> {
    pub fn new(
        endpoint: &'a dyn ChunkEndpoint,
        policy: RetryPolicy,
        attempt_timeout: Duration,
        observer: &'a dyn UploadObserver,
    ) -> Self {
        Self {
            endpoint,
            policy,
            attempt_timeout,
            observer,
        }
    }

    /// Sends one chunk until it is acknowledged, fails for good, or `cancel`
    /// fires.
    ///
    /// An attempt that exceeds the per-attempt timeout counts as a retryable
    /// failure. On success the chunk's bytes are added to `progress` and the
    /// observer is notified.
    pub async fn send(
        &self,
        request: ChunkRequest<'_>,
        progress: &ProgressAggregator,
        cancel: &CancellationToken,
    ) -> Result<ChunkAck, TransmitError> {
        let chunk = request.descriptor.chunk_number;
        let mut attempt = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(TransmitError::cancelled(Some(chunk), attempt));
            }

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(TransmitError::cancelled(Some(chunk), attempt));
                }
                result = tokio::time::timeout(self.attempt_timeout, self.endpoint.send_chunk(request)) => {
                    result.unwrap_or(Err(EndpointError::Timeout))
                }
            };

            let err = match outcome {
                Ok(ack) => {
                    self.acknowledge(request, &ack, progress);
                    return Ok(ack);
                }
                Err(err) => err,
            };

            let Some(delay) = self.policy.next_delay(attempt, err.is_retryable()) else {
                debug!(chunk, attempt, error = %err, "giving up on chunk");
                return Err(TransmitError::from_endpoint(&err, Some(chunk), attempt));
            };
            self.observer.on_retry(chunk, attempt, delay, &err);

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(TransmitError::cancelled(Some(chunk), attempt + 1));
                }
                _ = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }

    fn acknowledge(&self, request: ChunkRequest<'_>, ack: &ChunkAck, progress: &ProgressAggregator) {
        let d = request.descriptor;
        if let Some(remote) = ack.checksum.as_deref() {
            let comparable = !remote.is_empty() && !request.checksum.is_empty();
            if comparable && !remote.eq_ignore_ascii_case(request.checksum) {
                self.observer
                    .on_checksum_mismatch(d.chunk_number, request.checksum, remote);
            }
        }
        self.observer.on_progress(progress.add(d.size));
        self.observer.on_chunk_sent(d.chunk_number, d.total_chunks);
    }
}
