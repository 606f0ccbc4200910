use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::UploadProgress;

// ---------------------------------------------------------------------------
// ProgressAggregator
// ---------------------------------------------------------------------------

/// Sums acknowledged chunk sizes into an overall [`UploadProgress`].
///
/// `loaded` only grows, so snapshots taken in order never go backwards.
#[derive(Debug)]
pub struct ProgressAggregator {
    total: u64,
    loaded: AtomicU64,
}

impl ProgressAggregator {
    /// Creates an aggregator for `total` bytes, `already_loaded` of which
    /// the server already holds.
    pub fn new(total: u64, already_loaded: u64) -> Self {
        Self {
            total,
            loaded: AtomicU64::new(already_loaded.min(total)),
        }
    }

    /// Records `bytes` as acknowledged and returns the new snapshot.
    pub fn add(&self, bytes: u64) -> UploadProgress {
        let prev = self.loaded.fetch_add(bytes, Ordering::AcqRel);
        UploadProgress::new(prev.saturating_add(bytes), self.total)
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> UploadProgress {
        UploadProgress::new(self.loaded.load(Ordering::Acquire), self.total)
    }
}

// ---------------------------------------------------------------------------
// SpeedCalculator
// ---------------------------------------------------------------------------

/// Transfer rate over a sliding time window.
///
/// Fed with per-event byte deltas; used for rate and ETA display only.
pub struct SpeedCalculator {
    window: Duration,
    capacity: usize,
    samples: Mutex<VecDeque<(Instant, u64)>>,
}

impl Default for SpeedCalculator {
    /// 5 s window, at most 100 samples.
    fn default() -> Self {
        Self::new(Duration::from_secs(5), 100)
    }
}

impl SpeedCalculator {
    pub fn new(window: Duration, capacity: usize) -> Self {
        Self {
            window,
            capacity: capacity.max(2),
            samples: Mutex::new(VecDeque::new()),
        }
    }

    /// Records `bytes` moved just now.
    pub fn add_sample(&self, bytes: u64) {
        let Ok(mut samples) = self.samples.lock() else {
            return;
        };
        let now = Instant::now();
        samples.push_back((now, bytes));
        while samples
            .front()
            .is_some_and(|(at, _)| now.duration_since(*at) > self.window)
        {
            samples.pop_front();
        }
        while samples.len() > self.capacity {
            samples.pop_front();
        }
    }

    /// Bytes per second across the window; 0 until two samples exist.
    pub fn bytes_per_second(&self) -> f64 {
        let Ok(samples) = self.samples.lock() else {
            return 0.0;
        };
        let (Some((first, _)), Some((last, _))) = (samples.front(), samples.back()) else {
            return 0.0;
        };
        let elapsed = last.duration_since(*first);
        if samples.len() < 2 || elapsed.is_zero() {
            return 0.0;
        }
        let bytes: u64 = samples.iter().map(|(_, b)| b).sum();
        bytes as f64 / elapsed.as_secs_f64()
    }

    /// Time left for `remaining` bytes at the current rate.
    pub fn eta(&self, remaining: u64) -> Option<Duration> {
        let rate = self.bytes_per_second();
        (rate > 0.0).then(|| Duration::from_secs_f64(remaining as f64 / rate))
    }

    pub fn reset(&self) {
        if let Ok(mut samples) = self.samples.lock() {
            samples.clear();
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.samples.lock().map(|s| s.len()).unwrap_or(0)
    }
}
