//! Data types for the upload-and-process flow.

use std::fmt;

use tokio_util::sync::CancellationToken;
use vitals_protocol::ChunkAck;

/// Per-call overrides for an upload.
///
/// `None` fields fall back to the [`ClientConfig`](crate::ClientConfig).
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    /// Fixed chunk size instead of the tiered policy.
    pub chunk_size: Option<u64>,
    /// Retries per chunk after the first attempt.
    pub max_retries: Option<u32>,
    /// Chunks sent concurrently per group.
    pub max_parallel_uploads: Option<usize>,
    /// First chunk to send; earlier chunks are assumed held by the server.
    pub start_chunk: u32,
    /// Cancels the upload (and the processing poll) when triggered.
    pub cancel: CancellationToken,
}

/// Acknowledgment of the final chunk, used to start processing.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalAck {
    pub file_name: String,
    pub file_size: u64,
    pub total_chunks: u32,
    /// Server body returned for the last chunk.
    pub ack: ChunkAck,
}

/// Lifecycle state of a server-side processing job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Started,
    Polling,
    Completed,
    Failed,
    TimedOut,
}

impl JobState {
    /// Returns `true` once no further transition can happen.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::TimedOut)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Started => "started",
            Self::Polling => "polling",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
        };
        f.write_str(s)
    }
}

/// A processing job tracked by the poller.
///
/// Mutated only by the poll loop.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingJob {
    pub processing_id: String,
    pub state: JobState,
    pub last_progress_message: String,
    pub results: Vec<String>,
    /// Status checks performed so far.
    pub checks: u32,
}

impl ProcessingJob {
    pub(crate) fn new(processing_id: String) -> Self {
        Self {
            processing_id,
            state: JobState::Started,
            last_progress_message: String::new(),
            results: Vec::new(),
            checks: 0,
        }
    }
}

/// Non-error outcome of a processing job.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingResult {
    pub processing_id: String,
    /// [`JobState::Completed`] or [`JobState::TimedOut`].
    pub state: JobState,
    /// Server message on completion, advisory text on timeout.
    pub message: String,
    /// Result messages in server order (empty on timeout).
    pub results: Vec<String>,
    /// Status checks performed.
    pub checks: u32,
}

impl ProcessingResult {
    /// Returns `true` when polling gave up while the job may still be running.
    pub fn is_still_running(&self) -> bool {
        self.state == JobState::TimedOut
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(!JobState::Started.is_terminal());
        assert!(!JobState::Polling.is_terminal());
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(JobState::TimedOut.is_terminal());
    }

    #[test]
    fn job_starts_in_started_state() {
        let job = ProcessingJob::new("p1".into());
        assert_eq!(job.state, JobState::Started);
        assert_eq!(job.checks, 0);
        assert!(job.results.is_empty());
    }

    #[test]
    fn timed_out_result_is_still_running() {
        let result = ProcessingResult {
            processing_id: "p1".into(),
            state: JobState::TimedOut,
            message: String::new(),
            results: Vec::new(),
            checks: 60,
        };
        assert!(result.is_still_running());
    }
}
