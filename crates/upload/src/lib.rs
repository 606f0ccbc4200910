//! Chunked upload pipeline for Vitals.
//!
//! A file is validated, sliced into chunks and sent in sequential groups of
//! concurrent requests ([`UploadCoordinator`]). Each chunk is retried with
//! exponential backoff ([`ChunkTransmitter`]). Once the last chunk is
//! acknowledged, a server-side processing job is started and polled with an
//! adaptive interval ([`ProcessingJobPoller`]). [`UploadPipeline`] runs both
//! steps; [`PresignedUploader`] is the single-request alternative for small
//! files.
//!
//! Lifecycle events go to an injected [`UploadObserver`].

mod checksum;
mod config;
mod coordinator;
mod endpoint;
mod error;
mod http;
mod observer;
mod pipeline;
mod poller;
mod presigned;
mod transmitter;
mod types;

#[cfg(test)]
mod testutil;

pub use checksum::digest_chunk;
pub use config::{
    ClientConfig, DEFAULT_CHUNK_TIMEOUT_SECS, DEFAULT_MAX_PARALLEL_UPLOADS,
    DEFAULT_STATUS_TIMEOUT_SECS,
};
pub use coordinator::UploadCoordinator;
pub use endpoint::{ChunkEndpoint, ChunkRequest, EndpointFuture, ProcessingEndpoint};
pub use error::{EndpointError, ErrorDetails, TransmitError, TransmitErrorCode, UploadError};
pub use http::HttpTransport;
pub use observer::{
    ChannelObserver, NoopObserver, TracingObserver, UploadEvent, UploadObserver, drain_events,
};
pub use pipeline::UploadPipeline;
pub use poller::{
    COMPLETED_MESSAGE, DEFAULT_REQUEST_TIMEOUT, ProcessingJobPoller, STILL_RUNNING_MESSAGE,
    WAITING_MESSAGE,
};
pub use presigned::PresignedUploader;
pub use transmitter::ChunkTransmitter;
pub use types::{FinalAck, JobState, ProcessingJob, ProcessingResult, UploadOptions};
