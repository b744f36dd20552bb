//! The detection-and-broadcast loop.
//!
//! One iteration reads a frame, runs the detector, renders the annotated and
//! heatmap images, attaches a position fix, encodes both images as data URIs
//! and emits a single `detections` event. The loop then sleeps a fixed
//! interval. The first failing stage ends the loop; there is no retry.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use thiserror::Error;

use crate::clock::{Clock, SystemClock};
use crate::config::GpsSettings;
use crate::detect::{Detection, SharedBackend, PERSON_CLASS_ID};
use crate::encode::jpeg_data_uri;
use crate::gps::{MockGps, PositionSource};
use crate::hub::Broadcaster;
use crate::ingest::FrameSource;
use crate::payload::{BroadcastPayload, DetectionGroup, DETECTIONS_EVENT};
use crate::render::{annotate, HeatmapRenderer};

const DEFAULT_INTERVAL: Duration = Duration::from_millis(600);
const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("capture failed: {0:#}")]
    Capture(anyhow::Error),
    #[error("detection failed: {0:#}")]
    Detection(anyhow::Error),
    #[error("encoding failed: {0:#}")]
    Encoding(anyhow::Error),
    #[error("broadcast failed: {0:#}")]
    Broadcast(anyhow::Error),
}

/// Why a loop that did not fail came to a stop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopExit {
    Shutdown,
    IterationLimit,
}

/// Loop state shared with the HTTP server.
#[derive(Debug, Default)]
pub struct PipelineStatus {
    running: AtomicBool,
    frames_emitted: AtomicU64,
    last_error: Mutex<Option<String>>,
}

impl PipelineStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn frames_emitted(&self) -> u64 {
        self.frames_emitted.load(Ordering::SeqCst)
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    fn record_emit(&self) {
        self.frames_emitted.fetch_add(1, Ordering::SeqCst);
    }

    fn record_error(&self, err: &PipelineError) {
        let mut guard = self
            .last_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Some(err.to_string());
    }
}

pub struct BroadcastLoop {
    source: Box<dyn FrameSource>,
    detector: SharedBackend,
    broadcaster: Arc<dyn Broadcaster>,
    position: Box<dyn PositionSource>,
    heatmap: HeatmapRenderer,
    clock: Arc<dyn Clock>,
    interval: Duration,
    max_iterations: Option<u64>,
    shutdown: Arc<AtomicBool>,
    status: Arc<PipelineStatus>,
}

impl BroadcastLoop {
    /// Loop over `source` with the default cadence, heatmap and mock GPS.
    ///
    /// The source is connected by `run()` and released when the loop is dropped.
    pub fn new(
        source: Box<dyn FrameSource>,
        detector: SharedBackend,
        broadcaster: Arc<dyn Broadcaster>,
    ) -> Self {
        Self {
            source,
            detector,
            broadcaster,
            position: Box::new(MockGps::new(&GpsSettings::default())),
            heatmap: HeatmapRenderer::default(),
            clock: Arc::new(SystemClock),
            interval: DEFAULT_INTERVAL,
            max_iterations: None,
            shutdown: Arc::new(AtomicBool::new(false)),
            status: Arc::new(PipelineStatus::new()),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u64) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    pub fn with_shutdown(mut self, shutdown: Arc<AtomicBool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_position(mut self, position: Box<dyn PositionSource>) -> Self {
        self.position = position;
        self
    }

    pub fn with_heatmap(mut self, heatmap: HeatmapRenderer) -> Self {
        self.heatmap = heatmap;
        self
    }

    pub fn with_status(mut self, status: Arc<PipelineStatus>) -> Self {
        self.status = status;
        self
    }

    pub fn status(&self) -> Arc<PipelineStatus> {
        Arc::clone(&self.status)
    }

    /// Connect the source and loop until shutdown, the iteration limit, or the
    /// first stage failure.
    pub fn run(&mut self) -> Result<LoopExit, PipelineError> {
        self.status.set_running(true);
        log::info!(
            "broadcast loop starting (source {}, interval {:?})",
            self.source.stats().source,
            self.interval
        );

        let result = self.run_inner();
        self.status.set_running(false);

        match &result {
            Ok(exit) => log::info!(
                "broadcast loop stopped ({:?}) after {} frames",
                exit,
                self.status.frames_emitted()
            ),
            Err(err) => {
                log::error!("broadcast loop stopped: {}", err);
                self.status.record_error(err);
            }
        }
        result
    }

    fn run_inner(&mut self) -> Result<LoopExit, PipelineError> {
        self.source.connect().map_err(PipelineError::Capture)?;

        let mut iterations = 0u64;
        let mut last_health = self.clock.now();
        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                return Ok(LoopExit::Shutdown);
            }
            if let Some(max) = self.max_iterations {
                if iterations >= max {
                    return Ok(LoopExit::IterationLimit);
                }
            }

            self.step()?;
            iterations += 1;

            let now = self.clock.now();
            if now.saturating_duration_since(last_health) >= HEALTH_LOG_INTERVAL {
                self.log_health();
                last_health = now;
            }
            self.clock.sleep(self.interval);
        }
    }

    /// Run one capture → detect → render → encode → emit pass and return the
    /// payload that was broadcast.
    pub fn step(&mut self) -> Result<BroadcastPayload, PipelineError> {
        let frame = self.source.capture().map_err(PipelineError::Capture)?;
        let sequence = frame.sequence();

        let detections = {
            let mut detector = self
                .detector
                .lock()
                .map_err(|_| PipelineError::Detection(anyhow!("detector lock poisoned")))?;
            detector
                .detect(&frame)
                .map_err(|e| PipelineError::Detection(e.context(format!("frame {}", sequence))))?
        };
        let group = DetectionGroup::from_detections(&detections);
        if group.contains_class(PERSON_CLASS_ID) {
            let people = detections.iter().filter(|d| d.is_person()).count();
            log::info!("frame {}: {} person(s) in view", sequence, people);
        }

        let annotated = annotate(frame.image(), &detections);
        let heatmap = self.heatmap.render(frame.image(), &detections);
        let render_latency = frame.age();
        drop(frame);

        let gps = self.position.current_fix();

        let annotated_image = jpeg_data_uri(&annotated).map_err(PipelineError::Encoding)?;
        let heatmap_image = jpeg_data_uri(&heatmap).map_err(PipelineError::Encoding)?;

        let payload = BroadcastPayload {
            annotated_image,
            heatmap_image,
            detections: vec![group],
            gps,
        };
        let delivered = self
            .broadcaster
            .emit(DETECTIONS_EVENT, &payload)
            .map_err(PipelineError::Broadcast)?;
        self.status.record_emit();
        log::debug!(
            "frame {}: [{}] rendered {:?} after capture, sent to {} subscribers",
            sequence,
            detection_labels(&detections),
            render_latency,
            delivered
        );
        Ok(payload)
    }

    fn log_health(&self) {
        let stats = self.source.stats();
        log::info!(
            "health: frames_emitted={} subscribers={} source={} healthy={} captured={}",
            self.status.frames_emitted(),
            self.broadcaster.subscriber_count(),
            stats.source,
            self.source.is_healthy(),
            stats.frames_captured
        );
    }
}

fn detection_labels(detections: &[Detection]) -> String {
    detections
        .iter()
        .map(|det| format!("{} {:.2}", det.label(), det.confidence))
        .collect::<Vec<_>>()
        .join(", ")
}
