//! Upload error types.

use std::fmt;

use vitals_transfer::TransferError;

/// Machine-readable category of a failed chunk transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransmitErrorCode {
    /// Server rejected the payload as too large (HTTP 413).
    FileTooLarge,
    /// Credentials missing or expired (HTTP 401).
    Unauthorized,
    /// Credentials valid but not allowed (HTTP 403).
    Forbidden,
    /// Retry budget exhausted on a retryable failure.
    UploadFailed,
    /// Caller cancelled the upload.
    Cancelled,
}

impl fmt::Display for TransmitErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::FileTooLarge => "FILE_TOO_LARGE",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::UploadFailed => "UPLOAD_FAILED",
            Self::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

/// Context attached to a [`TransmitError`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorDetails {
    pub chunk_number: Option<u32>,
    /// 0-based attempt that produced the error.
    pub attempt: Option<u32>,
    /// HTTP status of the last response, if any.
    pub status: Option<u16>,
}

/// Unrecovered failure of a chunk transmission.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct TransmitError {
    pub code: TransmitErrorCode,
    pub message: String,
    pub details: ErrorDetails,
}

impl TransmitError {
    /// Builds a cancellation error for `chunk_number`.
    pub fn cancelled(chunk_number: Option<u32>, attempt: u32) -> Self {
        Self {
            code: TransmitErrorCode::Cancelled,
            message: "upload cancelled".into(),
            details: ErrorDetails {
                chunk_number,
                attempt: Some(attempt),
                status: None,
            },
        }
    }

    /// Maps a request failure to its final transmit error.
    ///
    /// 413/401/403 keep their own codes; everything else is `UploadFailed`.
    pub fn from_endpoint(err: &EndpointError, chunk_number: Option<u32>, attempt: u32) -> Self {
        let status = err.status();
        let code = match status {
            Some(413) => TransmitErrorCode::FileTooLarge,
            Some(401) => TransmitErrorCode::Unauthorized,
            Some(403) => TransmitErrorCode::Forbidden,
            _ => TransmitErrorCode::UploadFailed,
        };
        let message = match chunk_number {
            Some(n) => format!("chunk {n} failed after {} attempt(s): {err}", attempt + 1),
            None => format!("upload failed: {err}"),
        };
        Self {
            code,
            message,
            details: ErrorDetails {
                chunk_number,
                attempt: Some(attempt),
                status,
            },
        }
    }

    /// Returns `true` for user-initiated aborts.
    pub fn is_cancelled(&self) -> bool {
        self.code == TransmitErrorCode::Cancelled
    }
}

/// Failure of a single request to one of the upload endpoints.
#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl EndpointError {
    /// HTTP status, when the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Payload-too-large and auth failures will not improve on retry.
    pub fn is_retryable(&self) -> bool {
        !matches!(self.status(), Some(413 | 401 | 403))
    }
}

impl From<reqwest::Error> for EndpointError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::InvalidResponse(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for EndpointError {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidResponse(e.to_string())
    }
}

/// Errors produced by the upload-and-process pipeline.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("invalid file: {0}")]
    Validation(#[from] TransferError),

    #[error(transparent)]
    Transmit(#[from] TransmitError),

    #[error("failed to start processing: {0}")]
    StartFailed(String),

    #[error("processing failed: {0}")]
    ProcessingFailed(String),

    #[error("status check failed: {0}")]
    StatusCheck(EndpointError),

    #[error("cancelled")]
    Cancelled,

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid bearer token")]
    InvalidToken,
}

impl UploadError {
    /// Returns `true` when the caller cancelled, as opposed to a failure.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::Transmit(e) => e.is_cancelled(),
            _ => false,
        }
    }
}
