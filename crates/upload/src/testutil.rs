//! Scripted endpoints and a tiny HTTP server for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use vitals_protocol::{ChunkAck, ProcessingStatus, StartProcessingResponse};

use crate::endpoint::{ChunkEndpoint, ChunkRequest, EndpointFuture, ProcessingEndpoint};
use crate::error::EndpointError;

// ---------------------------------------------------------------------------
// Chunk endpoint
// ---------------------------------------------------------------------------

/// What the scripted chunk endpoint does for one call.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Acknowledge, echoing the request checksum.
    Ack,
    /// Acknowledge with a fixed checksum.
    AckWith(String),
    /// Fail with an HTTP status.
    Status(u16),
    /// Fail with a network error.
    Network,
    /// Never answer.
    Hang,
}

#[derive(Debug, Clone)]
pub struct SentChunk {
    pub chunk_number: u32,
    pub total_chunks: u32,
    pub is_last_chunk: bool,
    pub size: u64,
    pub checksum: String,
    pub at: Instant,
}

/// Chunk endpoint answering from a per-chunk script, `Ack` once exhausted.
#[derive(Default)]
pub struct ScriptedChunks {
    script: Mutex<HashMap<u32, VecDeque<Reply>>>,
    calls: Mutex<Vec<SentChunk>>,
}

impl ScriptedChunks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, chunk_number: u32, replies: Vec<Reply>) -> Self {
        self.script
            .lock()
            .unwrap()
            .insert(chunk_number, replies.into());
        self
    }

    pub fn calls(&self) -> Vec<SentChunk> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, chunk_number: u32) -> Vec<SentChunk> {
        self.calls()
            .into_iter()
            .filter(|c| c.chunk_number == chunk_number)
            .collect()
    }

    fn next_reply(&self, chunk_number: u32) -> Reply {
        self.script
            .lock()
            .unwrap()
            .get_mut(&chunk_number)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Reply::Ack)
    }
}

impl ChunkEndpoint for ScriptedChunks {
    fn send_chunk<'a>(&'a self, request: ChunkRequest<'a>) -> EndpointFuture<'a, ChunkAck> {
        Box::pin(async move {
            let d = request.descriptor;
            self.calls.lock().unwrap().push(SentChunk {
                chunk_number: d.chunk_number,
                total_chunks: d.total_chunks,
                is_last_chunk: d.is_last_chunk,
                size: d.size,
                checksum: request.checksum.to_string(),
                at: Instant::now(),
            });
            match self.next_reply(d.chunk_number) {
                Reply::Ack => Ok(ChunkAck {
                    checksum: Some(request.checksum.to_string()),
                    message: Some(format!("chunk {} stored", d.chunk_number)),
                    ..ChunkAck::default()
                }),
                Reply::AckWith(checksum) => Ok(ChunkAck {
                    checksum: Some(checksum),
                    ..ChunkAck::default()
                }),
                Reply::Status(status) => Err(EndpointError::Status {
                    status,
                    message: "scripted failure".into(),
                }),
                Reply::Network => Err(EndpointError::Network("connection reset".into())),
                Reply::Hang => std::future::pending().await,
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Processing endpoint
// ---------------------------------------------------------------------------

/// One scripted answer of the status endpoint.
pub enum StatusReply {
    Status(ProcessingStatus),
    Fail(u16),
    /// Never answer.
    Hang,
}

pub fn pending(progress: Option<&str>) -> StatusReply {
    StatusReply::Status(ProcessingStatus {
        progress: progress.map(str::to_string),
        ..ProcessingStatus::default()
    })
}

pub fn completed(results: &[&str]) -> StatusReply {
    StatusReply::Status(ProcessingStatus {
        completed: true,
        message: Some("Imported".into()),
        results: results
            .iter()
            .map(|m| vitals_protocol::ProcessingResultEntry {
                message: m.to_string(),
            })
            .collect(),
        ..ProcessingStatus::default()
    })
}

pub fn failed(error: &str) -> StatusReply {
    StatusReply::Status(ProcessingStatus {
        error: Some(error.to_string()),
        ..ProcessingStatus::default()
    })
}

/// Processing endpoint answering from a script; pending once exhausted.
pub struct ScriptedProcessing {
    start: Mutex<Option<Result<StartProcessingResponse, u16>>>,
    start_hangs: bool,
    statuses: Mutex<VecDeque<StatusReply>>,
    started_with: Mutex<Vec<String>>,
    checks: Mutex<Vec<(String, Instant)>>,
}

impl ScriptedProcessing {
    pub fn new(statuses: Vec<StatusReply>) -> Self {
        Self {
            start: Mutex::new(Some(Ok(StartProcessingResponse {
                processing_id: Some("job-1".into()),
                error: None,
            }))),
            start_hangs: false,
            statuses: Mutex::new(statuses.into()),
            started_with: Mutex::new(Vec::new()),
            checks: Mutex::new(Vec::new()),
        }
    }

    pub fn with_start(self, start: Result<StartProcessingResponse, u16>) -> Self {
        *self.start.lock().unwrap() = Some(start);
        self
    }

    pub fn with_hanging_start(mut self) -> Self {
        self.start_hangs = true;
        self
    }

    pub fn started_with(&self) -> Vec<String> {
        self.started_with.lock().unwrap().clone()
    }

    pub fn checks(&self) -> Vec<(String, Instant)> {
        self.checks.lock().unwrap().clone()
    }
}

impl ProcessingEndpoint for ScriptedProcessing {
    fn start_processing<'a>(
        &'a self,
        file_name: &'a str,
    ) -> EndpointFuture<'a, StartProcessingResponse> {
        Box::pin(async move {
            self.started_with.lock().unwrap().push(file_name.to_string());
            if self.start_hangs {
                return std::future::pending().await;
            }
            match self.start.lock().unwrap().take() {
                Some(Ok(resp)) => Ok(resp),
                Some(Err(status)) => Err(EndpointError::Status {
                    status,
                    message: "start rejected".into(),
                }),
                None => Err(EndpointError::InvalidResponse("started twice".into())),
            }
        })
    }

    fn fetch_status<'a>(&'a self, processing_id: &'a str) -> EndpointFuture<'a, ProcessingStatus> {
        Box::pin(async move {
            self.checks
                .lock()
                .unwrap()
                .push((processing_id.to_string(), Instant::now()));
            let next = self.statuses.lock().unwrap().pop_front();
            match next {
                Some(StatusReply::Hang) => std::future::pending().await,
                Some(StatusReply::Status(s)) => Ok(s),
                Some(StatusReply::Fail(status)) => Err(EndpointError::Status {
                    status,
                    message: "status unavailable".into(),
                }),
                None => Ok(ProcessingStatus::default()),
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Mock HTTP server
// ---------------------------------------------------------------------------

/// A request captured by [`MockServer`].
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    /// Path including the query string.
    pub target: String,
    /// Header names are lowercase.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Serves one canned response per connection, in order, then stops.
pub struct MockServer {
    pub url: String,
    listener: Option<TcpListener>,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    handle: Option<JoinHandle<()>>,
}

impl MockServer {
    /// Binds to a free local port without serving yet.
    pub async fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        Self {
            url: format!("http://127.0.0.1:{port}"),
            listener: Some(listener),
            requests: Arc::new(Mutex::new(Vec::new())),
            handle: None,
        }
    }

    /// Binds and serves `responses` as `(status, json body)` pairs.
    pub async fn start(responses: Vec<(u16, String)>) -> Self {
        let mut server = Self::bind().await;
        server.serve(responses);
        server
    }

    pub fn serve(&mut self, responses: Vec<(u16, String)>) {
        let listener = self.listener.take().unwrap();
        let requests = Arc::clone(&self.requests);
        self.handle = Some(tokio::spawn(async move {
            for (status, body) in responses {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                if let Some(req) = read_request(&mut stream).await {
                    requests.lock().unwrap().push(req);
                }
                let resp = format!(
                    "HTTP/1.1 {status} Mock\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(resp.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        }));
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

async fn read_request(stream: &mut TcpStream) -> Option<CapturedRequest> {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 8192];

    let header_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
        let n = stream.read(&mut tmp).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&tmp[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();
    let header = |name: &str| {
        headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
    };

    let mut body = buf[header_end..].to_vec();
    if let Some(len) = header("content-length").and_then(|v| v.parse::<usize>().ok()) {
        while body.len() < len {
            let n = stream.read(&mut tmp).await.ok()?;
            if n == 0 {
                break;
            }
            body.extend_from_slice(&tmp[..n]);
        }
    } else if header("transfer-encoding").is_some_and(|v| v.eq_ignore_ascii_case("chunked")) {
        while !body.ends_with(b"0\r\n\r\n") {
            let n = stream.read(&mut tmp).await.ok()?;
            if n == 0 {
                break;
            }
            body.extend_from_slice(&tmp[..n]);
        }
        body = decode_chunked(&body);
    }

    Some(CapturedRequest {
        method,
        target,
        headers,
        body,
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn decode_chunked(mut raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    while let Some(line_end) = find(raw, b"\r\n") {
        let size_str = String::from_utf8_lossy(&raw[..line_end]);
        let size = usize::from_str_radix(size_str.trim(), 16).unwrap_or(0);
        if size == 0 {
            break;
        }
        let start = line_end + 2;
        let end = (start + size).min(raw.len());
        out.extend_from_slice(&raw[start..end]);
        raw = &raw[(end + 2).min(raw.len())..];
    }
    out
}
