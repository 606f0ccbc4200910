use std::path::PathBuf;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use vitals_upload::UploadOptions;

use crate::config::UploaderConfig;

/// Upload an activity file to a Vitals server and wait for it to be processed.
#[derive(Parser, Debug)]
#[clap(name = "vitals-uploader", version)]
pub struct Cli {
    /// File to upload.
    pub file: PathBuf,

    /// Configuration file (default: ~/.config/vitals/uploader.toml).
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Server origin, overriding the configured one.
    #[clap(long)]
    pub server: Option<String>,

    /// Bearer token, overriding the configured one.
    #[clap(long)]
    pub token: Option<String>,

    /// Upload in a single PUT through a presigned URL instead of chunks.
    #[clap(long)]
    pub presigned: bool,

    /// Print the SHA-256 of the file before uploading.
    #[clap(long)]
    pub verify: bool,

    /// Chunk size in bytes (default: chosen from the file size).
    #[clap(long)]
    pub chunk_size: Option<u64>,

    /// Retries per chunk after the first attempt.
    #[clap(long)]
    pub retries: Option<u32>,

    /// Chunks uploaded concurrently.
    #[clap(long)]
    pub parallel: Option<usize>,

    /// Skip chunks the server already holds.
    #[clap(long, default_value_t = 0)]
    pub start_chunk: u32,

    /// Upload only; do not start a processing job.
    #[clap(long)]
    pub no_process: bool,
}

impl Cli {
    /// Applies command-line overrides to the loaded configuration.
    pub fn apply(&self, config: &mut UploaderConfig) {
        if let Some(server) = &self.server {
            config.server.base_url = server.clone();
        }
        if let Some(token) = &self.token {
            config.server.bearer_token = Some(token.clone());
        }
        if let Some(retries) = self.retries {
            config.server.max_retries = retries;
        }
        if let Some(parallel) = self.parallel {
            config.server.max_parallel_uploads = parallel;
        }
        if self.no_process {
            config.process_after_upload = false;
        }
    }

    /// Per-upload options for the chunked path.
    pub fn options(&self, cancel: CancellationToken) -> UploadOptions {
        UploadOptions {
            chunk_size: self.chunk_size,
            max_retries: self.retries,
            max_parallel_uploads: self.parallel,
            start_chunk: self.start_chunk,
            cancel,
        }
    }
}
