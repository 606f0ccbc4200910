//! Wire types for the Vitals upload-and-process endpoints.
//!
//! The chunk endpoint takes a multipart body (field names in [`constants`]);
//! every other endpoint speaks JSON with camelCase keys.

pub mod constants;
pub mod messages;

pub use messages::{
    ChunkAck, ErrorBody, ProcessingResultEntry, ProcessingStatus, SignedUrlRequest,
    SignedUrlResponse, StartProcessingRequest, StartProcessingResponse,
};
