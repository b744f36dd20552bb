//! Frame ingestion sources.
//!
//! This module provides the sources a broadcast loop can read from:
//! - Synthetic frames (`stub://<name>`) for tests and hardware-free demos
//! - Local image sequences (a directory of JPEG files)
//! - USB/V4L2 cameras (feature: ingest-v4l2)
//! - MJPEG-over-HTTP drone and IP cameras (feature: ingest-mjpeg)
//!
//! Every source produces owned `Frame` values, one per `capture()` call. A
//! failed capture is final for the current run: the loop does not retry or
//! reconnect. Sources own their device handle and release it on drop.

pub mod file;
#[cfg(feature = "ingest-mjpeg")]
pub mod mjpeg;
#[cfg(feature = "ingest-v4l2")]
mod normalize;
pub mod synthetic;
#[cfg(feature = "ingest-v4l2")]
pub mod v4l2;

use anyhow::{anyhow, Result};
use std::path::Path;

use crate::config::CameraSettings;
use crate::frame::Frame;

pub use file::{ImageSequenceConfig, ImageSequenceSource};
#[cfg(feature = "ingest-mjpeg")]
pub use mjpeg::{MjpegConfig, MjpegSource};
pub use synthetic::{SyntheticConfig, SyntheticSource};
#[cfg(feature = "ingest-v4l2")]
pub use v4l2::{V4l2Config, V4l2Source};

/// A camera-like producer of frames.
pub trait FrameSource: Send {
    /// Open the underlying device. Called once before the first capture.
    fn connect(&mut self) -> Result<()>;

    /// Capture the next frame.
    ///
    /// An error means the device yielded no frame (disconnected, end of stream,
    /// or hardware fault).
    fn capture(&mut self) -> Result<Frame>;

    /// Check if the source is healthy.
    fn is_healthy(&self) -> bool;

    /// Get frame statistics.
    fn stats(&self) -> SourceStats;
}

/// Statistics for a frame source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub source: String,
}

/// Open the source named by the camera settings.
///
/// - `stub://...` selects the synthetic source
/// - `http://` / `https://` selects the MJPEG source
/// - an existing directory selects the image sequence source
/// - anything else is treated as a V4L2 device node
pub fn open_source(settings: &CameraSettings) -> Result<Box<dyn FrameSource>> {
    let device = settings.device_path();
    if device.starts_with("stub://") {
        return Ok(Box::new(SyntheticSource::new(SyntheticConfig {
            name: device,
            width: settings.width,
            height: settings.height,
            max_frames: None,
        })));
    }
    if device.starts_with("http://") || device.starts_with("https://") {
        #[cfg(feature = "ingest-mjpeg")]
        {
            return Ok(Box::new(MjpegSource::new(MjpegConfig {
                url: device,
                target_fps: settings.target_fps,
            })?));
        }
        #[cfg(not(feature = "ingest-mjpeg"))]
        {
            return Err(anyhow!(
                "http camera {} requires the ingest-mjpeg feature",
                device
            ));
        }
    }
    if Path::new(&device).is_dir() {
        return Ok(Box::new(ImageSequenceSource::new(ImageSequenceConfig {
            dir: device.into(),
            repeat: false,
        })));
    }
    if device.contains("://") {
        return Err(anyhow!("unsupported camera scheme in '{}'", device));
    }

    #[cfg(feature = "ingest-v4l2")]
    {
        Ok(Box::new(V4l2Source::new(V4l2Config {
            device,
            target_fps: settings.target_fps,
            width: settings.width,
            height: settings.height,
        })))
    }
    #[cfg(not(feature = "ingest-v4l2"))]
    {
        Err(anyhow!(
            "camera device {} requires the ingest-v4l2 feature",
            device
        ))
    }
}
