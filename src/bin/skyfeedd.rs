//! skyfeedd - drone camera detection relay
//!
//! This daemon:
//! 1. Serves the HTTP status endpoints and the `/ws` push channel
//! 2. Opens the configured camera and detector backend
//! 3. Runs the broadcast loop on a dedicated thread until Ctrl-C
//!
//! If the loop stops on an error the server stays up, reporting the error on
//! `/status`, until the process is interrupted.
//!
//! The default configuration reads `/dev/video0` through the `tract` backend,
//! so a full build needs both features:
//!
//! ```text
//! cargo run --release --features ingest-v4l2,backend-tract --bin skyfeedd
//! ```
//!
//! A featureless build runs against the synthetic source and the CPU backend:
//!
//! ```text
//! SKYFEED_CAMERA=stub://drone SKYFEED_BACKEND=cpu cargo run --bin skyfeedd
//! ```

use anyhow::{anyhow, Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};

use skyfeed::{
    api::{ApiConfig, ApiServer},
    build_registry, open_source, BroadcastLoop, EventHub, HeatmapRenderer, MockGps,
    PipelineStatus, SkyfeedConfig, SystemClock,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = SkyfeedConfig::load()?;
    log::info!(
        "skyfeedd {} starting (camera {}, backend {}, interval {:?})",
        env!("CARGO_PKG_VERSION"),
        config.camera.device_path(),
        config.detector.backend,
        config.stream.interval
    );

    let hub = Arc::new(EventHub::new(config.stream.channel_capacity));
    let status = Arc::new(PipelineStatus::new());

    let api_config = ApiConfig {
        addr: config.server.addr.clone(),
        ..ApiConfig::default()
    };
    let api_handle = ApiServer::new(api_config, hub.clone(), status.clone()).spawn()?;
    log::info!("dashboard endpoint: ws://{}/ws", api_handle.addr);

    let source = open_source(&config.camera)?;
    let registry = build_registry(&config.detector)?;
    let detector = registry
        .default_backend()
        .ok_or_else(|| anyhow!("no detector backend available"))?;
    log::info!(
        "detector backends: {} (using {})",
        registry.list().join(", "),
        registry.default_name().unwrap_or("none")
    );

    let shutdown = Arc::new(AtomicBool::new(false));
    let (tx, rx) = mpsc::channel();
    let shutdown_handler = shutdown.clone();
    ctrlc::set_handler(move || {
        shutdown_handler.store(true, Ordering::SeqCst);
        let _ = tx.send(());
    })
    .map_err(|e| anyhow!("error setting Ctrl-C handler: {}", e))?;

    let mut pipeline = BroadcastLoop::new(source, detector, hub)
        .with_interval(config.stream.interval)
        .with_position(Box::new(MockGps::new(&config.gps)))
        .with_heatmap(HeatmapRenderer::new(config.heatmap.radius))
        .with_clock(Arc::new(SystemClock))
        .with_shutdown(shutdown.clone())
        .with_status(status);

    let loop_thread = std::thread::Builder::new()
        .name("skyfeed-loop".to_string())
        .spawn(move || {
            if let Err(err) = pipeline.run() {
                log::error!("{}; server stays up until Ctrl-C", err);
            }
        })
        .context("failed to spawn broadcast loop thread")?;

    log::info!("skyfeedd running, waiting for shutdown signal (Ctrl-C)...");
    let _ = rx.recv();
    log::info!("shutdown signal received, stopping...");
    shutdown.store(true, Ordering::SeqCst);

    loop_thread
        .join()
        .map_err(|_| anyhow!("broadcast loop thread panicked"))?;
    api_handle.stop()?;
    log::info!("skyfeedd stopped");
    Ok(())
}
