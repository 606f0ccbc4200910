//! Client configuration shared by the transport, coordinator and poller.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use vitals_protocol::constants::{
    DEFAULT_CHUNK_PATH, DEFAULT_SIGNED_URL_PATH, DEFAULT_START_PATH, DEFAULT_STATUS_PATH,
};
use vitals_transfer::{Backoff, DEFAULT_MAX_FILE_SIZE, RetryPolicy};

/// Default number of chunks sent concurrently per group.
pub const DEFAULT_MAX_PARALLEL_UPLOADS: usize = 3;

/// Default per-attempt timeout for a chunk request, in seconds.
pub const DEFAULT_CHUNK_TIMEOUT_SECS: u64 = 30;

/// Default timeout for a processing trigger or status request, in seconds.
pub const DEFAULT_STATUS_TIMEOUT_SECS: u64 = 30;

/// Upload client configuration.
///
/// Every field has a default, so a partial file deserializes cleanly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Server origin, e.g. `https://vitals.example.com`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_chunk_path")]
    pub chunk_path: String,

    #[serde(default = "default_start_path")]
    pub start_path: String,

    #[serde(default = "default_status_path")]
    pub status_path: String,

    #[serde(default = "default_signed_url_path")]
    pub signed_url_path: String,

    /// Sent as `Authorization: Bearer <token>` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer_token: Option<String>,

    /// Largest accepted file, in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    #[serde(default = "default_max_parallel_uploads")]
    pub max_parallel_uploads: usize,

    /// Retries per chunk after the first attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_chunk_timeout_secs")]
    pub chunk_timeout_secs: u64,

    /// Status checks before a job is reported as still running.
    #[serde(default = "default_poll_max_attempts")]
    pub poll_max_attempts: u32,

    #[serde(default = "default_poll_initial_delay_ms")]
    pub poll_initial_delay_ms: u64,

    #[serde(default = "default_poll_max_delay_ms")]
    pub poll_max_delay_ms: u64,

    /// Bound on each processing trigger and status request, in seconds.
    #[serde(default = "default_status_timeout_secs")]
    pub status_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:3000".into()
}

fn default_chunk_path() -> String {
    DEFAULT_CHUNK_PATH.into()
}

fn default_start_path() -> String {
    DEFAULT_START_PATH.into()
}

fn default_status_path() -> String {
    DEFAULT_STATUS_PATH.into()
}

fn default_signed_url_path() -> String {
    DEFAULT_SIGNED_URL_PATH.into()
}

fn default_max_file_size() -> u64 {
    DEFAULT_MAX_FILE_SIZE
}

fn default_max_parallel_uploads() -> usize {
    DEFAULT_MAX_PARALLEL_UPLOADS
}

fn default_max_retries() -> u32 {
    RetryPolicy::DEFAULT_CHUNK_RETRIES
}

fn default_chunk_timeout_secs() -> u64 {
    DEFAULT_CHUNK_TIMEOUT_SECS
}

fn default_poll_max_attempts() -> u32 {
    RetryPolicy::DEFAULT_POLL_ATTEMPTS
}

fn default_poll_initial_delay_ms() -> u64 {
    2000
}

fn default_poll_max_delay_ms() -> u64 {
    30_000
}

fn default_status_timeout_secs() -> u64 {
    DEFAULT_STATUS_TIMEOUT_SECS
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            chunk_path: default_chunk_path(),
            start_path: default_start_path(),
            status_path: default_status_path(),
            signed_url_path: default_signed_url_path(),
            bearer_token: None,
            max_file_size: default_max_file_size(),
            max_parallel_uploads: default_max_parallel_uploads(),
            max_retries: default_max_retries(),
            chunk_timeout_secs: default_chunk_timeout_secs(),
            poll_max_attempts: default_poll_max_attempts(),
            poll_initial_delay_ms: default_poll_initial_delay_ms(),
            poll_max_delay_ms: default_poll_max_delay_ms(),
            status_timeout_secs: default_status_timeout_secs(),
        }
    }
}

impl ClientConfig {
    /// Creates a default configuration pointed at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Per-attempt timeout for chunk requests.
    pub fn chunk_timeout(&self) -> Duration {
        Duration::from_secs(self.chunk_timeout_secs)
    }

    /// Bound on each processing trigger and status request.
    pub fn status_timeout(&self) -> Duration {
        Duration::from_secs(self.status_timeout_secs)
    }

    /// Chunk retry policy, with an optional per-call retry override.
    pub fn chunk_policy(&self, max_retries: Option<u32>) -> RetryPolicy {
        RetryPolicy::chunk_upload(max_retries.unwrap_or(self.max_retries))
    }

    /// Job polling policy (backoff factor fixed at 1.5).
    pub fn poll_policy(&self) -> RetryPolicy {
        let defaults = RetryPolicy::job_polling();
        RetryPolicy {
            max_attempts: self.poll_max_attempts,
            backoff: Backoff {
                initial_delay: Duration::from_millis(self.poll_initial_delay_ms),
                max_delay: Duration::from_millis(self.poll_max_delay_ms),
                factor: defaults.backoff.factor,
            },
        }
    }

    pub fn chunk_url(&self) -> String {
        self.url(&self.chunk_path)
    }

    pub fn start_url(&self) -> String {
        self.url(&self.start_path)
    }

    pub fn status_url(&self) -> String {
        self.url(&self.status_path)
    }

    pub fn signed_url_url(&self) -> String {
        self.url(&self.signed_url_path)
    }

    fn url(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.max_file_size, 500 * 1024 * 1024);
        assert_eq!(config.max_parallel_uploads, 3);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.chunk_timeout(), Duration::from_secs(30));
        assert_eq!(config.status_timeout(), Duration::from_secs(30));
        assert_eq!(config.poll_policy(), RetryPolicy::job_polling());
        assert_eq!(config.chunk_policy(None), RetryPolicy::chunk_upload(3));
        assert!(config.bearer_token.is_none());
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"base_url":"https://api.test","max_retries":5}"#).unwrap();
        assert_eq!(config.base_url, "https://api.test");
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.chunk_path, "/api/upload/chunk");
        assert_eq!(config.poll_max_attempts, 60);
    }

    #[test]
    fn chunk_policy_override_wins() {
        let config = ClientConfig::default();
        assert_eq!(config.chunk_policy(Some(0)).max_attempts, 1);
    }

    #[test]
    fn custom_poll_policy() {
        let config = ClientConfig {
            poll_max_attempts: 5,
            poll_initial_delay_ms: 100,
            poll_max_delay_ms: 200,
            ..ClientConfig::default()
        };
        let policy = config.poll_policy();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.backoff.delay(0), Duration::from_millis(100));
        assert_eq!(policy.backoff.delay(1), Duration::from_millis(150));
        assert_eq!(policy.backoff.delay(2), Duration::from_millis(200));
    }

    #[test]
    fn urls_join_cleanly() {
        let config = ClientConfig::new("https://api.test/");
        assert_eq!(config.chunk_url(), "https://api.test/api/upload/chunk");
        assert_eq!(config.status_url(), "https://api.test/api/process/status");

        let config = ClientConfig {
            start_path: "start".into(),
            ..ClientConfig::new("https://api.test")
        };
        assert_eq!(config.start_url(), "https://api.test/start");
    }

    #[test]
    fn token_is_omitted_when_unset() {
        let json = serde_json::to_string(&ClientConfig::default()).unwrap();
        assert!(!json.contains("bearer_token"));
    }
}
