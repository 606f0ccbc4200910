//! reqwest transport for the chunk and processing endpoints.

use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use vitals_protocol::constants::{
    FIELD_CHECKSUM, FIELD_CHUNK, FIELD_CHUNK_NUMBER, FIELD_FILE_NAME, FIELD_IS_LAST_CHUNK,
    FIELD_TOTAL_CHUNKS, PARAM_PROCESSING_ID, bool_field,
};
use vitals_protocol::{
    ChunkAck, ErrorBody, ProcessingStatus, StartProcessingRequest, StartProcessingResponse,
};

use crate::config::ClientConfig;
use crate::endpoint::{ChunkEndpoint, ChunkRequest, EndpointFuture, ProcessingEndpoint};
use crate::error::{EndpointError, UploadError};

/// HTTP client for the upload server.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    /// Client for third-party storage URLs; never carries the app token.
    storage: reqwest::Client,
    config: ClientConfig,
}

impl HttpTransport {
    /// Builds the clients, adding a Bearer header to the app-server one when
    /// a token is configured.
    pub fn new(config: ClientConfig) -> Result<Self, UploadError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = config.bearer_token.as_deref().filter(|t| !t.is_empty()) {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {token}"))
                    .map_err(|_| UploadError::InvalidToken)?,
            );
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;
        let storage = reqwest::Client::builder().build()?;

        Ok(Self {
            http,
            storage,
            config,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) fn client(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn storage_client(&self) -> &reqwest::Client {
        &self.storage
    }

    async fn post_chunk(&self, request: ChunkRequest<'_>) -> Result<ChunkAck, EndpointError> {
        let d = request.descriptor;
        let part = Part::stream_with_length(d.bytes.clone(), d.size)
            .file_name(request.file_name.to_string())
            .mime_str("application/octet-stream")?;
        let form = Form::new()
            .part(FIELD_CHUNK, part)
            .text(FIELD_CHUNK_NUMBER, d.chunk_number.to_string())
            .text(FIELD_TOTAL_CHUNKS, d.total_chunks.to_string())
            .text(FIELD_IS_LAST_CHUNK, bool_field(d.is_last_chunk))
            .text(FIELD_FILE_NAME, request.file_name.to_string())
            .text(FIELD_CHECKSUM, request.checksum.to_string());

        let resp = self
            .http
            .post(self.config.chunk_url())
            .multipart(form)
            .send()
            .await?;
        parse_json_or_default(success_body(resp).await?)
    }

    async fn post_start(&self, file_name: &str) -> Result<StartProcessingResponse, EndpointError> {
        let body = StartProcessingRequest {
            file_name: file_name.to_string(),
        };
        let resp = self
            .http
            .post(self.config.start_url())
            .json(&body)
            .send()
            .await?;
        parse_json_or_default(success_body(resp).await?)
    }

    async fn get_status(&self, processing_id: &str) -> Result<ProcessingStatus, EndpointError> {
        let resp = self
            .http
            .get(self.config.status_url())
            .query(&[(PARAM_PROCESSING_ID, processing_id)])
            .send()
            .await?;
        parse_json_or_default(success_body(resp).await?)
    }
}

impl ChunkEndpoint for HttpTransport {
    fn send_chunk<'a>(&'a self, request: ChunkRequest<'a>) -> EndpointFuture<'a, ChunkAck> {
        Box::pin(self.post_chunk(request))
    }
}

impl ProcessingEndpoint for HttpTransport {
    fn start_processing<'a>(
        &'a self,
        file_name: &'a str,
    ) -> EndpointFuture<'a, StartProcessingResponse> {
        Box::pin(self.post_start(file_name))
    }

    fn fetch_status<'a>(&'a self, processing_id: &'a str) -> EndpointFuture<'a, ProcessingStatus> {
        Box::pin(self.get_status(processing_id))
    }
}

/// Returns the body of a 2xx response, or a status error built from it.
pub(crate) async fn success_body(resp: reqwest::Response) -> Result<Bytes, EndpointError> {
    let status = resp.status();
    let body = resp.bytes().await?;
    if status.is_success() {
        return Ok(body);
    }

    let message = ErrorBody::from_slice(&body).describe().unwrap_or_else(|| {
        let text = String::from_utf8_lossy(&body).trim().to_string();
        if text.is_empty() {
            status.canonical_reason().unwrap_or("request failed").to_string()
        } else {
            text
        }
    });
    Err(EndpointError::Status {
        status: status.as_u16(),
        message,
    })
}

/// Parses a JSON body; an empty body yields the default value.
fn parse_json_or_default<T: DeserializeOwned + Default>(body: Bytes) -> Result<T, EndpointError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    Ok(serde_json::from_slice(&body)?)
}
