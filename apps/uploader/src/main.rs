//! Vitals uploader entry point.

mod cli;
mod config;
mod progress;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use vitals_transfer::{UploadFile, checksum_file};
use vitals_upload::{
    ChannelObserver, HttpTransport, PresignedUploader, UploadError, UploadObserver, UploadPipeline,
};

use crate::cli::Cli;
use crate::config::UploaderConfig;

fn main() -> anyhow::Result<()> {
    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = UploaderConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    tracing::info!(server = %config.server.base_url, "configuration loaded");

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(cli, config))
}

async fn run(cli: Cli, config: UploaderConfig) -> anyhow::Result<()> {
    if cli.verify {
        let path = cli.file.clone();
        let digest = tokio::task::spawn_blocking(move || checksum_file(&path)).await??;
        println!("sha256  {digest}  {}", cli.file.display());
    }

    let file = UploadFile::open(&cli.file, config.server.max_file_size)
        .await
        .with_context(|| format!("failed to read {}", cli.file.display()))?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, cancelling upload");
            on_signal.cancel();
        }
    });

    let (observer, events) = ChannelObserver::channel(config.event_buffer);
    let renderer = tokio::spawn(progress::render(events));

    let outcome = if cli.presigned {
        upload_presigned(&file, &config, observer, &cancel).await
    } else {
        upload_chunked(&cli, &file, &config, Arc::new(observer), cancel).await
    };
    // Every observer handle is gone once the upload returns.
    progress::finish(renderer).await;

    match outcome {
        Ok(()) => Ok(()),
        Err(e) if e.is_cancelled() => {
            tracing::warn!("upload cancelled");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

async fn upload_presigned(
    file: &UploadFile,
    config: &UploaderConfig,
    observer: ChannelObserver,
    cancel: &CancellationToken,
) -> Result<(), UploadError> {
    let transport = HttpTransport::new(config.server.clone())?;
    let key = PresignedUploader::new(&transport, &observer)
        .upload(file, cancel)
        .await?;
    println!("stored as {key}");
    Ok(())
}

async fn upload_chunked(
    cli: &Cli,
    file: &UploadFile,
    config: &UploaderConfig,
    observer: Arc<dyn UploadObserver>,
    cancel: CancellationToken,
) -> Result<(), UploadError> {
    let pipeline = UploadPipeline::http(config.server.clone())?.with_observer(observer);
    let options = cli.options(cancel);

    if !config.process_after_upload {
        let ack = pipeline.upload(file, &options).await?;
        println!(
            "uploaded {} ({} bytes, {} chunks)",
            ack.file_name, ack.file_size, ack.total_chunks
        );
        return Ok(());
    }

    let result = pipeline.run(file, &options).await?;
    if result.is_still_running() {
        println!("{}", result.message);
        println!("processing id: {}", result.processing_id);
        return Ok(());
    }
    println!("{}", result.message);
    for line in &result.results {
        println!("  {line}");
    }
    Ok(())
}
