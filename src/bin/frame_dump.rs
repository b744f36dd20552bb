//! frame_dump - run the broadcast loop for a fixed number of frames and write
//! every emitted payload to disk.
//!
//! For each frame N the output directory receives `frame_N_annotated.jpg`,
//! `frame_N_heatmap.jpg` and `frame_N.json` (the payload with image data
//! replaced by the file names).

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use skyfeed::config::{CameraSettings, DetectorSettings, GpsSettings};
use skyfeed::render::MAX_RADIUS;
use skyfeed::{
    build_registry, data_uri_bytes, open_source, BroadcastLoop, BroadcastPayload, Broadcaster,
    HeatmapRenderer, LoopExit, MockGps,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Number of frames to process.
    #[arg(long, default_value_t = 5)]
    frames: u64,
    /// Output directory.
    #[arg(long, default_value = "frame_dump_out")]
    out: String,
    /// Camera device (`stub://name`, `/dev/videoN`, `http://...`, or a directory of JPEGs).
    #[arg(long, env = "SKYFEED_CAMERA", default_value = "stub://frame_dump")]
    camera: String,
    #[arg(long, default_value_t = 640)]
    width: u32,
    #[arg(long, default_value_t = 480)]
    height: u32,
    /// Detector backend (`cpu`, or `tract` when built with backend-tract).
    #[arg(long, env = "SKYFEED_BACKEND", default_value = "cpu")]
    backend: String,
    /// ONNX model for the tract backend.
    #[arg(long, env = "SKYFEED_MODEL", default_value = "yolov8n.onnx")]
    model: PathBuf,
    /// Heatmap disc radius in pixels.
    #[arg(long, default_value_t = 50)]
    radius: u32,
    /// Pause between frames in milliseconds.
    #[arg(long, default_value_t = 0)]
    interval_ms: u64,
    /// Optional deterministic seed for GPS jitter.
    #[arg(long)]
    seed: Option<u64>,
}

/// Broadcaster that writes each payload into a directory.
struct DirectorySink {
    dir: PathBuf,
    written: AtomicU64,
}

impl DirectorySink {
    fn write_payload(&self, index: u64, payload: &BroadcastPayload) -> Result<()> {
        let annotated = format!("frame_{}_annotated.jpg", index);
        let heatmap = format!("frame_{}_heatmap.jpg", index);
        fs::write(
            self.dir.join(&annotated),
            data_uri_bytes(&payload.annotated_image)?,
        )?;
        fs::write(self.dir.join(&heatmap), data_uri_bytes(&payload.heatmap_image)?)?;

        let summary = BroadcastPayload {
            annotated_image: annotated,
            heatmap_image: heatmap,
            ..payload.clone()
        };
        let json = serde_json::to_vec_pretty(&summary)?;
        fs::write(self.dir.join(format!("frame_{}.json", index)), json)?;
        Ok(())
    }
}

impl Broadcaster for DirectorySink {
    fn emit(&self, event: &str, payload: &BroadcastPayload) -> Result<usize> {
        let index = self.written.fetch_add(1, Ordering::SeqCst) + 1;
        self.write_payload(index, payload)
            .with_context(|| format!("failed to write {} event #{}", event, index))?;
        println!(
            "frame {}: {} detections, gps ({:.6}, {:.6})",
            index,
            payload.detections.first().map(|g| g.len()).unwrap_or(0),
            payload.gps.latitude,
            payload.gps.longitude
        );
        Ok(1)
    }

    fn subscriber_count(&self) -> usize {
        1
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if args.frames == 0 {
        return Err(anyhow!("frames must be >= 1"));
    }
    if args.radius == 0 || args.radius > MAX_RADIUS {
        return Err(anyhow!("radius must be within [1, {}]", MAX_RADIUS));
    }

    let out_dir = PathBuf::from(&args.out);
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    let camera = CameraSettings {
        device: Some(args.camera.clone()),
        width: args.width,
        height: args.height,
        ..CameraSettings::default()
    };
    let detector_settings = DetectorSettings {
        backend: args.backend.clone(),
        model_path: args.model.clone(),
        ..DetectorSettings::default()
    };

    let source = open_source(&camera)?;
    let registry = build_registry(&detector_settings)?;
    let detector = registry
        .default_backend()
        .ok_or_else(|| anyhow!("no detector backend available"))?;

    let gps = match args.seed {
        Some(seed) => MockGps::with_seed(&GpsSettings::default(), seed),
        None => MockGps::new(&GpsSettings::default()),
    };
    let sink = Arc::new(DirectorySink {
        dir: out_dir.clone(),
        written: AtomicU64::new(0),
    });

    let mut pipeline = BroadcastLoop::new(source, detector, sink.clone())
        .with_interval(Duration::from_millis(args.interval_ms))
        .with_position(Box::new(gps))
        .with_heatmap(HeatmapRenderer::new(args.radius))
        .with_max_iterations(args.frames);

    let exit = pipeline.run()?;
    let written = sink.written.load(Ordering::SeqCst);
    if exit != LoopExit::IterationLimit {
        return Err(anyhow!("loop stopped early ({:?})", exit));
    }
    println!("wrote {} frames to {}", written, out_dir.display());
    Ok(())
}
