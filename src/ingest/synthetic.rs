//! Synthetic frame source.
//!
//! `SyntheticSource` generates frames in-memory for tests and for running the
//! daemon without a camera attached. Each frame is a dim gradient background
//! with one bright square target that drifts across the frame, so the `cpu`
//! detector backend has something to find.

use anyhow::{anyhow, Result};
use image::{Rgb, RgbImage};

use super::{FrameSource, SourceStats};
use crate::frame::Frame;

/// Side length of the bright target square in pixels.
pub const TARGET_SIZE: u32 = 40;
/// Horizontal drift of the target per frame in pixels.
const TARGET_STEP: u32 = 12;
/// Background channels stay below this value.
const BACKGROUND_MAX: u32 = 120;

/// Configuration for a synthetic source.
#[derive(Clone, Debug)]
pub struct SyntheticConfig {
    /// Source name (e.g., "stub://front_camera").
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Fail with end-of-stream after this many frames. `None` never ends.
    pub max_frames: Option<u64>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            name: "stub://camera".to_string(),
            width: 640,
            height: 480,
            max_frames: None,
        }
    }
}

pub struct SyntheticSource {
    config: SyntheticConfig,
    connected: bool,
    frame_count: u64,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig) -> Self {
        Self {
            config,
            connected: false,
            frame_count: 0,
        }
    }

    /// Box `(x1, y1, x2, y2)` covered by the target in the given frame
    /// (1-based, matching `Frame::sequence`). Bounds are exclusive on the right
    /// and bottom.
    pub fn target_box(&self, sequence: u64) -> (u32, u32, u32, u32) {
        let size = TARGET_SIZE
            .min(self.config.width)
            .min(self.config.height);
        let travel = (self.config.width - size).max(1) as u64;
        let x1 = ((sequence * TARGET_STEP as u64) % travel) as u32;
        let y1 = (self.config.height - size) / 2;
        (x1, y1, x1 + size, y1 + size)
    }

    fn generate_frame(&self) -> RgbImage {
        let width = self.config.width;
        let height = self.config.height;
        let shade = ((self.frame_count * 3) % BACKGROUND_MAX as u64) as u8;
        let mut image = RgbImage::from_fn(width, height, |x, y| {
            Rgb([
                (x * BACKGROUND_MAX / width.max(1)) as u8,
                (y * BACKGROUND_MAX / height.max(1)) as u8,
                shade,
            ])
        });

        let (x1, y1, x2, y2) = self.target_box(self.frame_count);
        for y in y1..y2 {
            for x in x1..x2 {
                image.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }
        image
    }
}

impl FrameSource for SyntheticSource {
    /// Synthetic sources are always "connected".
    fn connect(&mut self) -> Result<()> {
        if self.config.width == 0 || self.config.height == 0 {
            return Err(anyhow!(
                "synthetic source {} has empty dimensions {}x{}",
                self.config.name,
                self.config.width,
                self.config.height
            ));
        }
        self.connected = true;
        log::info!(
            "SyntheticSource: connected to {} ({}x{})",
            self.config.name,
            self.config.width,
            self.config.height
        );
        Ok(())
    }

    fn capture(&mut self) -> Result<Frame> {
        if !self.connected {
            return Err(anyhow!(
                "synthetic source {} not connected; call connect() first",
                self.config.name
            ));
        }
        if let Some(max) = self.config.max_frames {
            if self.frame_count >= max {
                return Err(anyhow!(
                    "synthetic source {} reached end of stream after {} frames",
                    self.config.name,
                    self.frame_count
                ));
            }
        }
        self.frame_count += 1;
        Ok(Frame::new(self.generate_frame(), self.frame_count))
    }

    fn is_healthy(&self) -> bool {
        self.connected
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            source: self.config.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub_config() -> SyntheticConfig {
        SyntheticConfig {
            name: "stub://test".to_string(),
            width: 320,
            height: 240,
            max_frames: Some(2),
        }
    }

    #[test]
    fn synthetic_source_produces_frames() -> Result<()> {
        let mut source = SyntheticSource::new(stub_config());
        source.connect()?;

        let frame = source.capture()?;
        assert_eq!(frame.width(), 320);
        assert_eq!(frame.height(), 240);
        assert_eq!(frame.sequence(), 1);

        Ok(())
    }

    #[test]
    fn capture_before_connect_fails() {
        let mut source = SyntheticSource::new(stub_config());
        assert!(source.capture().is_err());
        assert!(!source.is_healthy());
    }

    #[test]
    fn end_of_stream_after_max_frames() -> Result<()> {
        let mut source = SyntheticSource::new(stub_config());
        source.connect()?;
        source.capture()?;
        source.capture()?;
        let err = source.capture().unwrap_err();
        assert!(err.to_string().contains("end of stream"));
        assert_eq!(source.stats().frames_captured, 2);
        Ok(())
    }

    #[test]
    fn target_is_painted_white() -> Result<()> {
        let mut source = SyntheticSource::new(stub_config());
        source.connect()?;
        let frame = source.capture()?;
        let (x1, y1, x2, y2) = source.target_box(frame.sequence());
        assert_eq!(frame.image().get_pixel(x1, y1).0, [255, 255, 255]);
        assert_eq!(frame.image().get_pixel(x2 - 1, y2 - 1).0, [255, 255, 255]);
        // Background never reaches target brightness.
        let corner = frame.image().get_pixel(0, 0).0;
        assert!(corner.iter().all(|&c| c < 200));
        Ok(())
    }

    #[test]
    fn target_moves_between_frames() {
        let source = SyntheticSource::new(stub_config());
        assert_ne!(source.target_box(1), source.target_box(2));
    }
}
