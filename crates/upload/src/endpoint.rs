//! Endpoint traits the pipeline talks to.
//!
//! [`HttpTransport`](crate::HttpTransport) implements both traits over
//! reqwest. Keeping them as traits lets the transmitter and poller run
//! against in-memory mocks in tests.

use std::future::Future;
use std::pin::Pin;

use vitals_protocol::{ChunkAck, ProcessingStatus, StartProcessingResponse};
use vitals_transfer::ChunkDescriptor;

use crate::error::EndpointError;

/// Boxed future returned by endpoint methods.
pub type EndpointFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, EndpointError>> + Send + 'a>>;

/// Everything the chunk endpoint needs for one request.
#[derive(Debug, Clone, Copy)]
pub struct ChunkRequest<'a> {
    pub descriptor: &'a ChunkDescriptor,
    pub file_name: &'a str,
    /// SHA-256 hex digest, empty when unavailable.
    pub checksum: &'a str,
}

/// Accepts file chunks.
pub trait ChunkEndpoint: Send + Sync {
    /// Sends one chunk and returns the server's acknowledgment.
    ///
    /// Non-2xx responses surface as [`EndpointError::Status`].
    fn send_chunk<'a>(&'a self, request: ChunkRequest<'a>) -> EndpointFuture<'a, ChunkAck>;
}

/// Starts and reports on server-side processing jobs.
pub trait ProcessingEndpoint: Send + Sync {
    /// Triggers processing of the uploaded file.
    fn start_processing<'a>(
        &'a self,
        file_name: &'a str,
    ) -> EndpointFuture<'a, StartProcessingResponse>;

    /// Fetches the current status of a job.
    fn fetch_status<'a>(&'a self, processing_id: &'a str) -> EndpointFuture<'a, ProcessingStatus>;
}
