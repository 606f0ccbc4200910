//! Single-request upload through a presigned URL.
//!
//! No chunking, retries or checksums: the whole file goes out in one `PUT`
//! and progress follows the bytes handed to the connection.

use std::sync::Arc;

use bytes::Bytes;
use futures_util::StreamExt;
use reqwest::Body;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::info;
use vitals_protocol::{SignedUrlRequest, SignedUrlResponse};
use vitals_transfer::{KIB, ProgressAggregator, UploadFile, validate_upload};

use crate::error::{EndpointError, TransmitError, UploadError};
use crate::http::{HttpTransport, success_body};
use crate::observer::UploadObserver;

/// Size of the body pieces fed to the connection; one progress step each.
const STREAM_PIECE: u64 = 64 * KIB;

/// Uploads whole files to presigned storage URLs.
pub struct PresignedUploader<'a> {
    transport: &'a HttpTransport,
    observer: &'a dyn UploadObserver,
}

impl<'a> PresignedUploader<'a> {
    pub fn new(transport: &'a HttpTransport, observer: &'a dyn UploadObserver) -> Self {
        Self {
            transport,
            observer,
        }
    }

    /// Uploads `file` and returns the storage key it was written to.
    pub async fn upload(
        &self,
        file: &UploadFile,
        cancel: &CancellationToken,
    ) -> Result<String, UploadError> {
        validate_upload(Some(file), self.transport.config().max_file_size)?;

        let target = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TransmitError::cancelled(None, 0).into()),
            r = self.request_url(file) => r.map_err(|e| TransmitError::from_endpoint(&e, None, 0))?,
        };
        info!(file = %file.name, key = %target.key, "uploading through presigned URL");

        let progress = Arc::new(ProgressAggregator::new(file.size(), 0));
        let (progress_tx, mut progress_rx) = watch::channel(progress.snapshot());
        let counter = Arc::clone(&progress);
        let body = futures_util::stream::iter(pieces(&file.data)).map(move |piece| {
            progress_tx.send_replace(counter.add(piece.len() as u64));
            Ok::<_, std::io::Error>(piece)
        });

        let request = self
            .transport
            .storage_client()
            .put(&target.url)
            .header(CONTENT_TYPE, file.content_type.as_str())
            .header(CONTENT_LENGTH, file.size())
            .body(Body::wrap_stream(body))
            .send();
        tokio::pin!(request);

        let mut body_done = false;
        let response = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TransmitError::cancelled(None, 0).into()),
                r = &mut request => break r,
                changed = progress_rx.changed(), if !body_done => match changed {
                    Ok(()) => self.observer.on_progress(*progress_rx.borrow_and_update()),
                    Err(_) => body_done = true,
                },
            }
        };

        let put_result: Result<Bytes, EndpointError> = match response {
            Ok(resp) => success_body(resp).await,
            Err(e) => Err(e.into()),
        };
        put_result.map_err(|e| TransmitError::from_endpoint(&e, None, 0))?;

        self.observer.on_progress(progress.snapshot());
        info!(file = %file.name, key = %target.key, "presigned upload complete");
        Ok(target.key)
    }

    async fn request_url(&self, file: &UploadFile) -> Result<SignedUrlResponse, EndpointError> {
        let body = SignedUrlRequest {
            file_name: file.name.clone(),
            content_type: file.content_type.clone(),
        };
        let resp = self
            .transport
            .client()
            .post(self.transport.config().signed_url_url())
            .json(&body)
            .send()
            .await?;
        let bytes = success_body(resp).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

fn pieces(data: &Bytes) -> Vec<Bytes> {
    let len = data.len();
    (0..len)
        .step_by(STREAM_PIECE as usize)
        .map(|start| data.slice(start..(start + STREAM_PIECE as usize).min(len)))
        .collect()
}
