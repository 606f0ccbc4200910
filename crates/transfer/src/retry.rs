use std::time::Duration;

/// Exponential backoff curve: `min(initial * factor^attempt, max)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    /// Delay for attempt 0.
    pub initial_delay: Duration,
    /// Cap applied to every delay.
    pub max_delay: Duration,
    /// Multiplier for each subsequent attempt.
    pub factor: f64,
}

impl Backoff {
    /// Returns the delay for a 0-based `attempt`.
    ///
    /// Deterministic (no jitter) and non-decreasing in `attempt`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exp = attempt.min(63) as i32;
        let ms = self.initial_delay.as_secs_f64() * 1000.0 * self.factor.powi(exp);
        let capped = ms.min(self.max_delay.as_secs_f64() * 1000.0);
        Duration::from_micros((capped * 1000.0).round() as u64)
    }
}

/// Attempt budget plus backoff, shared by chunk retries and job polling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts allowed, including the first.
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// Default retries for a chunk send.
    pub const DEFAULT_CHUNK_RETRIES: u32 = 3;

    /// Default number of status checks for a processing job.
    pub const DEFAULT_POLL_ATTEMPTS: u32 = 60;

    /// Chunk sends: `max_retries` extra attempts, 1 s doubling to at most 10 s.
    pub fn chunk_upload(max_retries: u32) -> Self {
        Self {
            max_attempts: max_retries.saturating_add(1),
            backoff: Backoff {
                initial_delay: Duration::from_millis(1000),
                max_delay: Duration::from_millis(10_000),
                factor: 2.0,
            },
        }
    }

    /// Job polling: 60 checks, 2 s growing by 1.5x to at most 30 s.
    pub fn job_polling() -> Self {
        Self {
            max_attempts: Self::DEFAULT_POLL_ATTEMPTS,
            backoff: Backoff {
                initial_delay: Duration::from_millis(2000),
                max_delay: Duration::from_millis(30_000),
                factor: 1.5,
            },
        }
    }

    /// Number of retries after the first attempt.
    pub fn max_retries(&self) -> u32 {
        self.max_attempts.saturating_sub(1)
    }

    /// Decides whether to retry after the 0-based `attempt` failed.
    ///
    /// Returns the delay to wait before the next attempt, or `None` when the
    /// failure is not retryable or the budget is spent.
    pub fn next_delay(&self, attempt: u32, retryable: bool) -> Option<Duration> {
        if !retryable || attempt.saturating_add(1) >= self.max_attempts {
            return None;
        }
        Some(self.backoff.delay(attempt))
    }

    /// Sum of every delay the policy can schedule.
    pub fn total_budget(&self) -> Duration {
        (0..self.max_attempts).map(|a| self.backoff.delay(a)).sum()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::chunk_upload(Self::DEFAULT_CHUNK_RETRIES)
    }
}
