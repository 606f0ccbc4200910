//! Processing-job polling with adaptive backoff.
//!
//! `Started -> Polling -> {Completed | Failed | TimedOut}`. The poller sleeps
//! before every status check; running out of checks is reported as a
//! still-running job, not as an error.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use vitals_transfer::RetryPolicy;

use crate::endpoint::{EndpointFuture, ProcessingEndpoint};
use crate::error::{EndpointError, UploadError};
use crate::observer::UploadObserver;
use crate::types::{JobState, ProcessingJob, ProcessingResult};

/// Status text used when a running job reports no progress.
pub const WAITING_MESSAGE: &str = "Waiting for processing progress...";

/// Message used when a completed job carries none.
pub const COMPLETED_MESSAGE: &str = "Processing completed";

/// Advisory returned when polling gives up on a running job.
pub const STILL_RUNNING_MESSAGE: &str =
    "Processing is taking longer than expected. It may still be running; check back later.";

/// Default bound on a single trigger or status request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Starts a processing job and polls it to a terminal state.
pub struct ProcessingJobPoller<'a> {
    endpoint: &'a dyn ProcessingEndpoint,
    policy: RetryPolicy,
    request_timeout: Duration,
    observer: &'a dyn UploadObserver,
}

impl<'a> ProcessingJobPoller<'a> {
    pub fn new(
        endpoint: &'a dyn ProcessingEndpoint,
        policy: RetryPolicy,
        observer: &'a dyn UploadObserver,
    ) -> Self {
        Self {
            endpoint,
            policy,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            observer,
        }
    }

    /// Bounds each trigger and status request; an expired status request
    /// counts as a failed check.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Triggers processing of `file_name` and waits for the outcome.
    ///
    /// A failed trigger is not retried. Status fetches that fail with a
    /// retryable error use up a check; auth and payload errors end polling.
    pub async fn run(
        &self,
        file_name: &str,
        cancel: &CancellationToken,
    ) -> Result<ProcessingResult, UploadError> {
        if cancel.is_cancelled() {
            return Err(UploadError::Cancelled);
        }
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(UploadError::Cancelled),
            r = self.bounded(self.endpoint.start_processing(file_name)) => r,
        };
        let processing_id = response
            .map_err(|e| UploadError::StartFailed(e.to_string()))?
            .into_result()
            .map_err(UploadError::StartFailed)?;

        let mut job = ProcessingJob::new(processing_id);
        self.observer.on_job_state(&job.processing_id, job.state);
        self.transition(&mut job, JobState::Polling);

        for attempt in 0..self.policy.max_attempts {
            let delay = self.policy.backoff.delay(attempt);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(UploadError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }

            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(UploadError::Cancelled),
                r = self.bounded(self.endpoint.fetch_status(&job.processing_id)) => r,
            };
            job.checks += 1;

            let status = match fetched {
                Ok(status) => status,
                Err(e) if e.is_retryable() => {
                    warn!(
                        processing_id = %job.processing_id,
                        check = job.checks,
                        error = %e,
                        "status check failed"
                    );
                    continue;
                }
                Err(e) => {
                    self.transition(&mut job, JobState::Failed);
                    return Err(UploadError::StatusCheck(e));
                }
            };

            if status.completed {
                job.results = status.results.into_iter().map(|r| r.message).collect();
                self.transition(&mut job, JobState::Completed);
                return Ok(ProcessingResult {
                    processing_id: job.processing_id,
                    state: job.state,
                    message: status
                        .message
                        .filter(|m| !m.is_empty())
                        .unwrap_or_else(|| COMPLETED_MESSAGE.into()),
                    results: job.results,
                    checks: job.checks,
                });
            }

            if let Some(error) = status.error {
                self.transition(&mut job, JobState::Failed);
                return Err(UploadError::ProcessingFailed(error));
            }

            job.last_progress_message = status
                .progress
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| WAITING_MESSAGE.into());
            debug!(
                processing_id = %job.processing_id,
                check = job.checks,
                next_delay_ms = self.policy.backoff.delay(attempt + 1).as_millis() as u64,
                "job still running"
            );
            self.observer.on_job_status(&job.last_progress_message);
        }

        self.transition(&mut job, JobState::TimedOut);
        Ok(ProcessingResult {
            processing_id: job.processing_id,
            state: job.state,
            message: STILL_RUNNING_MESSAGE.into(),
            results: Vec::new(),
            checks: job.checks,
        })
    }

    async fn bounded<T>(&self, request: EndpointFuture<'_, T>) -> Result<T, EndpointError> {
        tokio::time::timeout(self.request_timeout, request)
            .await
            .unwrap_or(Err(EndpointError::Timeout))
    }

    fn transition(&self, job: &mut ProcessingJob, state: JobState) {
        job.state = state;
        self.observer.on_job_state(&job.processing_id, state);
    }
}
