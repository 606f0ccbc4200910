use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use vitals_transfer::UploadFile;

use crate::config::ClientConfig;
use crate::coordinator::UploadCoordinator;
use crate::endpoint::{ChunkEndpoint, ProcessingEndpoint};
use crate::error::UploadError;
use crate::http::HttpTransport;
use crate::observer::{TracingObserver, UploadObserver};
use crate::poller::ProcessingJobPoller;
use crate::types::{FinalAck, ProcessingResult, UploadOptions};

/// Chunked upload followed by server-side processing.
pub struct UploadPipeline<E> {
    endpoint: E,
    config: ClientConfig,
    observer: Arc<dyn UploadObserver>,
}

impl UploadPipeline<HttpTransport> {
    /// Creates a pipeline talking to the configured server over HTTP.
    pub fn http(config: ClientConfig) -> Result<Self, UploadError> {
        let transport = HttpTransport::new(config.clone())?;
        Ok(Self::new(transport, config))
    }
}

impl<E: ChunkEndpoint + ProcessingEndpoint> UploadPipeline<E> {
    /// Creates a pipeline that logs lifecycle events through `tracing`.
    pub fn new(endpoint: E, config: ClientConfig) -> Self {
        Self {
            endpoint,
            config,
            observer: Arc::new(TracingObserver),
        }
    }

    /// Replaces the lifecycle observer.
    pub fn with_observer(mut self, observer: Arc<dyn UploadObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Uploads `file` in chunks.
    pub async fn upload(
        &self,
        file: &UploadFile,
        options: &UploadOptions,
    ) -> Result<FinalAck, UploadError> {
        UploadCoordinator::new(&self.endpoint, &self.config, self.observer.as_ref())
            .upload(file, options)
            .await
    }

    /// Starts processing of an uploaded file and polls it to completion.
    pub async fn process(
        &self,
        file_name: &str,
        cancel: &CancellationToken,
    ) -> Result<ProcessingResult, UploadError> {
        ProcessingJobPoller::new(
            &self.endpoint,
            self.config.poll_policy(),
            self.observer.as_ref(),
        )
        .with_request_timeout(self.config.status_timeout())
        .run(file_name, cancel)
        .await
    }

    /// Uploads `file`, then processes it.
    ///
    /// Processing starts only after the final chunk was acknowledged.
    pub async fn run(
        &self,
        file: &UploadFile,
        options: &UploadOptions,
    ) -> Result<ProcessingResult, UploadError> {
        let final_ack = self.upload(file, options).await?;
        self.process(&final_ack.file_name, &options.cancel).await
    }
}
