//! Skyfeed: drone camera detection relay
//!
//! This crate reads frames from a camera, runs an object detector on each one
//! and pushes the results to dashboard clients over a WebSocket.
//!
//! # Architecture
//!
//! One broadcast loop drives a linear per-frame pipeline:
//!
//! 1. **Capture**: a `FrameSource` yields one owned RGB frame.
//! 2. **Detect**: the selected `DetectorBackend` returns boxes, confidences and classes.
//! 3. **Render**: an annotated copy and a detection-density heatmap are drawn.
//! 4. **Encode**: both images become base64 JPEG data URIs.
//! 5. **Broadcast**: one `detections` event, with a mock GPS fix, goes to every subscriber.
//!
//! The loop then sleeps a fixed interval. Nothing is carried between frames.
//!
//! # Module Structure
//!
//! - `ingest`: frame sources (synthetic, image directory, V4L2, MJPEG over HTTP)
//! - `detect`: detector backends and the backend registry
//! - `render`: box annotation and heatmap overlay
//! - `encode`: JPEG and data URI encoding
//! - `gps`: position sources
//! - `hub`: subscriber fan-out
//! - `pipeline`: the broadcast loop
//! - `api`: HTTP and WebSocket server
//! - `config`: daemon configuration

pub mod api;
pub mod clock;
pub mod config;
pub mod detect;
pub mod encode;
pub mod frame;
pub mod gps;
pub mod hub;
pub mod ingest;
pub mod payload;
pub mod pipeline;
pub mod render;

pub use api::{ApiConfig, ApiHandle, ApiServer, StatusReport};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    CameraSettings, DetectorSettings, GpsSettings, HeatmapSettings, ServerSettings,
    SkyfeedConfig, StreamSettings,
};
pub use detect::{
    build_registry, BackendRegistry, BoundingBox, CpuBackend, Detection, DetectorBackend,
    FixedBackend, SharedBackend,
};
pub use encode::{data_uri_bytes, decode_data_uri, encode_jpeg, jpeg_data_uri};
pub use frame::Frame;
pub use gps::{GpsFix, MockGps, PositionSource};
pub use hub::{Broadcaster, EventHub};
pub use ingest::{open_source, FrameSource, SourceStats};
pub use payload::{BroadcastPayload, DetectionGroup, DETECTIONS_EVENT};
pub use pipeline::{BroadcastLoop, LoopExit, PipelineError, PipelineStatus};
pub use render::HeatmapRenderer;
