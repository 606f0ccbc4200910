//! Terminal rendering of upload events.

use std::io::Write;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use vitals_transfer::{SpeedCalculator, UploadProgress};
use vitals_upload::UploadEvent;

/// Turns upload events into status lines, tracking transfer speed.
pub struct ProgressRenderer {
    speed: SpeedCalculator,
    last_loaded: Option<u64>,
}

impl Default for ProgressRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressRenderer {
    pub fn new() -> Self {
        Self {
            speed: SpeedCalculator::default(),
            last_loaded: None,
        }
    }

    /// Handles one event and returns the line to display, if any.
    pub fn handle(&mut self, event: &UploadEvent) -> Option<String> {
        match event {
            UploadEvent::Progress(p) => {
                // The first snapshot may include bytes skipped on resume.
                let delta = self.last_loaded.map_or(0, |last| p.loaded.saturating_sub(last));
                self.last_loaded = Some(p.loaded);
                self.speed.add_sample(delta);
                let bps = self.speed.bytes_per_second();
                let eta = self.speed.eta(p.total.saturating_sub(p.loaded));
                Some(progress_line(p, bps, eta))
            }
            UploadEvent::Retry {
                chunk_number,
                attempt,
                delay,
                error,
            } => {
                tracing::warn!(
                    chunk = chunk_number,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "retrying chunk"
                );
                None
            }
            UploadEvent::ChecksumMismatch {
                chunk_number,
                local,
                remote,
            } => {
                tracing::warn!(chunk = chunk_number, %local, %remote, "checksum mismatch");
                None
            }
            UploadEvent::ChecksumUnavailable {
                chunk_number,
                reason,
            } => {
                tracing::warn!(chunk = chunk_number, %reason, "chunk sent without checksum");
                None
            }
            UploadEvent::JobState {
                processing_id,
                state,
            } => {
                tracing::info!(%processing_id, %state, "processing job");
                None
            }
            UploadEvent::JobStatus(message) => Some(format!("processing: {message}")),
            UploadEvent::ChunkSent { .. } => None,
        }
    }
}

/// Drains `rx` until every sender is gone, writing status lines to stderr.
pub async fn render(mut rx: mpsc::Receiver<UploadEvent>) {
    let mut renderer = ProgressRenderer::new();
    let mut stderr = std::io::stderr();
    while let Some(event) = rx.recv().await {
        if let Some(line) = renderer.handle(&event) {
            let _ = writeln!(stderr, "{line}");
        }
    }
}

/// Waits for the renderer task, logging it if it panicked or was aborted.
///
/// Returns whether the renderer finished cleanly.
pub async fn finish(renderer: JoinHandle<()>) -> bool {
    match renderer.await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "progress renderer failed");
            false
        }
    }
}

fn progress_line(p: &UploadProgress, bytes_per_second: f64, eta: Option<Duration>) -> String {
    let mut line = format!(
        "{:5.1}%  {} / {}",
        p.percentage,
        format_bytes(p.loaded),
        format_bytes(p.total)
    );
    if bytes_per_second > 0.0 {
        line.push_str(&format!("  {}/s", format_bytes(bytes_per_second as u64)));
    }
    if let Some(eta) = eta.filter(|_| !p.is_complete()) {
        line.push_str(&format!("  eta {}s", eta.as_secs()));
    }
    line
}

/// Formats a byte count with a binary unit.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
