//! Forward Collision Warning service - Main Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use fcw_core::FcwEngine;
use fcw_service::reader::open_input;
use fcw_service::{init_logging, load_camera_config, load_fcw_config, Args, Clock, FrameReader, FrameWorker};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::sync::mpsc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.json_logs);

    info!("=== FCW service v{} ===", env!("CARGO_PKG_VERSION"));

    if let Some(addr) = args.metrics_addr {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("Failed to start metrics exporter")?;
        info!("Serving metrics on {}", addr);
    }

    let config = load_fcw_config(&args.config)?;
    let camera = load_camera_config(&args.camera)?;
    let fps = args.effective_fps();

    info!("Initializing forward collision guard");
    let engine = FcwEngine::new(&camera, &config).context("Failed to initialize FCW engine")?;

    let clock = Clock::new();
    let queue_size = args.queue_size.max(1);
    info!("The size of the queue set to: {}", queue_size);
    let (tx, rx) = mpsc::channel(queue_size);

    let worker = FrameWorker::new(engine, config.tracker.min_hits, fps, clock);
    let worker_task = tokio::spawn(worker.run(rx, tokio::io::stdout()));

    let input = open_input(&args.input).await?;
    let reader = FrameReader::new(clock, args.realtime);

    // Dropping the reader closes the queue; the worker drains what is left
    tokio::select! {
        result = reader.run(input, tx) => result?,
        _ = tokio::signal::ctrl_c() => info!("Interrupted, stopping"),
    }

    let latency = worker_task.await.context("Frame worker panicked")??;
    latency.log_summary();
    Ok(())
}
