use serde::{Deserialize, Deserializer, Serialize};

/// Reads an explicit JSON `null` as the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Chunk endpoint
// ---------------------------------------------------------------------------

/// Success body of the chunk endpoint.
///
/// Servers may echo the checksum they computed; any other fields are kept
/// in `extra` so the final acknowledgment can be handed to the caller intact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkAck {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Error body returned with non-2xx responses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorBody {
    /// Parses an error body, tolerating empty or non-JSON payloads.
    pub fn from_slice(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }

    /// Joins `error` and `details` into one human-readable line.
    pub fn describe(&self) -> Option<String> {
        match (&self.error, &self.details) {
            (Some(e), Some(d)) => Some(format!("{e}: {d}")),
            (Some(e), None) => Some(e.clone()),
            (None, Some(d)) => Some(d.clone()),
            (None, None) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Processing endpoints
// ---------------------------------------------------------------------------

/// Body of the processing trigger request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartProcessingRequest {
    pub file_name: String,
}

/// Response of the processing trigger endpoint.
///
/// Success carries `processingId`; failure carries `error`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartProcessingResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StartProcessingResponse {
    /// Returns the processing id, or the server's error message.
    pub fn into_result(self) -> Result<String, String> {
        if let Some(err) = self.error {
            return Err(err);
        }
        match self.processing_id {
            Some(id) if !id.is_empty() => Ok(id),
            _ => Err("response did not include a processingId".into()),
        }
    }
}

/// One entry of a completed job's result list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessingResultEntry {
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
}

/// Body of the processing status endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessingStatus {
    #[serde(default, deserialize_with = "null_as_default")]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub results: Vec<ProcessingResultEntry>,
}

// ---------------------------------------------------------------------------
// Signed-URL endpoint
// ---------------------------------------------------------------------------

/// Requests a presigned PUT URL for a whole file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedUrlRequest {
    pub file_name: String,
    pub content_type: String,
}

/// Presigned PUT target and the storage key it writes to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedUrlResponse {
    pub url: String,
    pub key: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_ack_keeps_unknown_fields() {
        let json = r#"{"checksum":"abc","fileKey":"uploads/x.csv","received":3}"#;
        let ack: ChunkAck = serde_json::from_str(json).unwrap();
        assert_eq!(ack.checksum.as_deref(), Some("abc"));
        assert!(ack.message.is_none());
        assert_eq!(ack.extra["fileKey"], "uploads/x.csv");
        assert_eq!(ack.extra["received"], 3);
    }

    #[test]
    fn chunk_ack_empty_object() {
        let ack: ChunkAck = serde_json::from_str("{}").unwrap();
        assert_eq!(ack, ChunkAck::default());
    }

    #[test]
    fn error_body_describe() {
        let body = ErrorBody::from_slice(br#"{"error":"Upload failed","details":"disk full"}"#);
        assert_eq!(body.describe().as_deref(), Some("Upload failed: disk full"));

        let only_error = ErrorBody::from_slice(br#"{"error":"nope"}"#);
        assert_eq!(only_error.describe().as_deref(), Some("nope"));
    }

    #[test]
    fn error_body_tolerates_garbage() {
        let body = ErrorBody::from_slice(b"<html>502 Bad Gateway</html>");
        assert!(body.describe().is_none());
        let empty = ErrorBody::from_slice(b"");
        assert!(empty.describe().is_none());
    }

    #[test]
    fn start_response_success() {
        let resp: StartProcessingResponse =
            serde_json::from_str(r#"{"processingId":"job-42"}"#).unwrap();
        assert_eq!(resp.into_result(), Ok("job-42".to_string()));
    }

    #[test]
    fn start_response_error_wins() {
        let resp: StartProcessingResponse =
            serde_json::from_str(r#"{"processingId":"job-42","error":"quota exceeded"}"#)
                .unwrap();
        assert_eq!(resp.into_result(), Err("quota exceeded".to_string()));
    }

    #[test]
    fn start_response_missing_id() {
        let resp: StartProcessingResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.into_result().is_err());
    }

    #[test]
    fn status_defaults() {
        let status: ProcessingStatus = serde_json::from_str("{}").unwrap();
        assert!(!status.completed);
        assert!(status.error.is_none());
        assert!(status.results.is_empty());
    }

    #[test]
    fn status_completed_with_results() {
        let json = r#"{"completed":true,"message":"Imported","results":[{"message":"done"},{"message":"12 rows"}]}"#;
        let status: ProcessingStatus = serde_json::from_str(json).unwrap();
        assert!(status.completed);
        assert_eq!(status.message.as_deref(), Some("Imported"));
        assert_eq!(status.results.len(), 2);
        assert_eq!(status.results[0].message, "done");
    }

    #[test]
    fn status_tolerates_null_results() {
        let status: ProcessingStatus =
            serde_json::from_str(r#"{"completed":true,"results":null}"#).unwrap();
        assert!(status.completed);
        assert!(status.results.is_empty());

        let status: ProcessingStatus =
            serde_json::from_str(r#"{"completed":null,"progress":"Parsing"}"#).unwrap();
        assert!(!status.completed);
    }

    #[test]
    fn result_entry_without_message() {
        let json = r#"{"completed":true,"results":[{},{"message":null},{"message":"12 rows","rows":12}]}"#;
        let status: ProcessingStatus = serde_json::from_str(json).unwrap();
        let messages: Vec<&str> = status.results.iter().map(|r| r.message.as_str()).collect();
        assert_eq!(messages, vec!["", "", "12 rows"]);
    }

    #[test]
    fn signed_url_request_camel_case() {
        let req = SignedUrlRequest {
            file_name: "labs.pdf".into(),
            content_type: "application/pdf".into(),
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"fileName\":\"labs.pdf\""));
        assert!(json.contains("\"contentType\":\"application/pdf\""));
    }
}
