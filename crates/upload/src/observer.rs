//! Lifecycle hooks for the upload pipeline.
//!
//! Per-chunk and per-job events are reported to an injected
//! [`UploadObserver`]. [`TracingObserver`] turns them into `tracing` events;
//! [`ChannelObserver`] forwards them over an mpsc channel for UIs.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use vitals_transfer::UploadProgress;

use crate::error::EndpointError;
use crate::types::JobState;

/// Receives pipeline lifecycle events. Every method defaults to a no-op.
pub trait UploadObserver: Send + Sync {
    /// Aggregate progress after a chunk was acknowledged.
    fn on_progress(&self, _progress: UploadProgress) {}

    /// A chunk was acknowledged by the server.
    fn on_chunk_sent(&self, _chunk_number: u32, _total_chunks: u32) {}

    /// The 0-based `attempt` of a chunk failed; the next one runs after `delay`.
    fn on_retry(&self, _chunk_number: u32, _attempt: u32, _delay: Duration, _error: &EndpointError) {
    }

    /// The server echoed a different checksum than the one sent.
    fn on_checksum_mismatch(&self, _chunk_number: u32, _local: &str, _remote: &str) {}

    /// No checksum could be computed; the chunk is sent without one.
    fn on_checksum_unavailable(&self, _chunk_number: u32, _reason: &str) {}

    /// A processing job changed state.
    fn on_job_state(&self, _processing_id: &str, _state: JobState) {}

    /// Human-readable status text while a job runs.
    fn on_job_status(&self, _message: &str) {}
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl UploadObserver for NoopObserver {}

/// Observer that emits structured `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl UploadObserver for TracingObserver {
    fn on_progress(&self, progress: UploadProgress) {
        debug!(
            loaded = progress.loaded,
            total = progress.total,
            percent = format_args!("{:.1}", progress.percentage),
            "upload progress"
        );
    }

    fn on_chunk_sent(&self, chunk_number: u32, total_chunks: u32) {
        debug!(chunk = chunk_number, total = total_chunks, "chunk acknowledged");
    }

    fn on_retry(&self, chunk_number: u32, attempt: u32, delay: Duration, error: &EndpointError) {
        warn!(
            chunk = chunk_number,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "chunk upload failed, retrying"
        );
    }

    fn on_checksum_mismatch(&self, chunk_number: u32, local: &str, remote: &str) {
        warn!(chunk = chunk_number, local, remote, "checksum mismatch");
    }

    fn on_checksum_unavailable(&self, chunk_number: u32, reason: &str) {
        warn!(chunk = chunk_number, reason, "sending chunk without checksum");
    }

    fn on_job_state(&self, processing_id: &str, state: JobState) {
        info!(processing_id, state = %state, "processing job state");
    }

    fn on_job_status(&self, message: &str) {
        debug!(status = message, "processing status");
    }
}

/// Owned copy of an observer callback.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadEvent {
    Progress(UploadProgress),
    ChunkSent {
        chunk_number: u32,
        total_chunks: u32,
    },
    Retry {
        chunk_number: u32,
        attempt: u32,
        delay: Duration,
        error: String,
    },
    ChecksumMismatch {
        chunk_number: u32,
        local: String,
        remote: String,
    },
    ChecksumUnavailable {
        chunk_number: u32,
        reason: String,
    },
    JobState {
        processing_id: String,
        state: JobState,
    },
    JobStatus(String),
}

/// Observer that forwards events over a bounded channel.
///
/// Uses `try_send`: when the receiver lags, events are dropped rather than
/// stalling the upload.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::Sender<UploadEvent>,
}

impl ChannelObserver {
    /// Creates an observer and the receiving half of its channel.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<UploadEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    fn emit(&self, event: UploadEvent) {
        if let Err(e) = self.tx.try_send(event) {
            debug!("dropping upload event: {e}");
        }
    }
}

impl UploadObserver for ChannelObserver {
    fn on_progress(&self, progress: UploadProgress) {
        self.emit(UploadEvent::Progress(progress));
    }

    fn on_chunk_sent(&self, chunk_number: u32, total_chunks: u32) {
        self.emit(UploadEvent::ChunkSent {
            chunk_number,
            total_chunks,
        });
    }

    fn on_retry(&self, chunk_number: u32, attempt: u32, delay: Duration, error: &EndpointError) {
        self.emit(UploadEvent::Retry {
            chunk_number,
            attempt,
            delay,
            error: error.to_string(),
        });
    }

    fn on_checksum_mismatch(&self, chunk_number: u32, local: &str, remote: &str) {
        self.emit(UploadEvent::ChecksumMismatch {
            chunk_number,
            local: local.to_string(),
            remote: remote.to_string(),
        });
    }

    fn on_checksum_unavailable(&self, chunk_number: u32, reason: &str) {
        self.emit(UploadEvent::ChecksumUnavailable {
            chunk_number,
            reason: reason.to_string(),
        });
    }

    fn on_job_state(&self, processing_id: &str, state: JobState) {
        self.emit(UploadEvent::JobState {
            processing_id: processing_id.to_string(),
            state,
        });
    }

    fn on_job_status(&self, message: &str) {
        self.emit(UploadEvent::JobStatus(message.to_string()));
    }
}

/// Drains every event currently buffered in `rx`.
pub fn drain_events(rx: &mut mpsc::Receiver<UploadEvent>) -> Vec<UploadEvent> {
    let mut events = Vec::new();
    while let Ok(e) = rx.try_recv() {
        events.push(e);
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_observer_forwards_events() {
        let (observer, mut rx) = ChannelObserver::channel(16);
        observer.on_chunk_sent(0, 3);
        observer.on_progress(UploadProgress::new(10, 30));
        observer.on_job_state("p1", JobState::Polling);
        observer.on_job_status("Parsing rows");

        let events = drain_events(&mut rx);
        assert_eq!(
            events,
            vec![
                UploadEvent::ChunkSent {
                    chunk_number: 0,
                    total_chunks: 3
                },
                UploadEvent::Progress(UploadProgress::new(10, 30)),
                UploadEvent::JobState {
                    processing_id: "p1".into(),
                    state: JobState::Polling
                },
                UploadEvent::JobStatus("Parsing rows".into()),
            ]
        );
    }

    #[test]
    fn channel_observer_drops_when_full() {
        let (observer, mut rx) = ChannelObserver::channel(1);
        observer.on_job_status("first");
        observer.on_job_status("second");
        let events = drain_events(&mut rx);
        assert_eq!(events, vec![UploadEvent::JobStatus("first".into())]);
    }

    #[test]
    fn retry_event_carries_error_text() {
        let (observer, mut rx) = ChannelObserver::channel(4);
        observer.on_retry(2, 1, Duration::from_secs(1), &EndpointError::Timeout);
        match rx.try_recv().unwrap() {
            UploadEvent::Retry {
                chunk_number,
                attempt,
                error,
                ..
            } => {
                assert_eq!(chunk_number, 2);
                assert_eq!(attempt, 1);
                assert_eq!(error, "request timed out");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn noop_and_tracing_observers_accept_everything() {
        for observer in [&NoopObserver as &dyn UploadObserver, &TracingObserver] {
            observer.on_progress(UploadProgress::new(1, 2));
            observer.on_chunk_sent(0, 1);
            observer.on_checksum_mismatch(0, "a", "b");
            observer.on_checksum_unavailable(0, "join error");
            observer.on_job_state("p", JobState::Completed);
            observer.on_job_status("done");
        }
    }
}
