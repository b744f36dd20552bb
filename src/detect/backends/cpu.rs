use anyhow::Result;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{BoundingBox, Detection, PERSON_CLASS_ID};
use crate::frame::Frame;

const DEFAULT_LUMA_THRESHOLD: u8 = 200;
const DEFAULT_MIN_PIXELS: usize = 16;

/// Model-free CPU backend.
///
/// Reports one person detection covering every pixel at or above a luma threshold.
/// Confidence is the share of the box that is actually bright, so a solid
/// target scores 1.0 and scattered highlights score low. Pairs with the
/// synthetic source when no ONNX model is available.
#[derive(Clone, Debug)]
pub struct CpuBackend {
    luma_threshold: u8,
    min_pixels: usize,
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self {
            luma_threshold: DEFAULT_LUMA_THRESHOLD,
            min_pixels: DEFAULT_MIN_PIXELS,
        }
    }
}

impl CpuBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DetectorBackend for CpuBackend {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        let mut bounds: Option<(u32, u32, u32, u32)> = None;
        let mut bright = 0usize;

        for (x, y, pixel) in frame.image().enumerate_pixels() {
            if luma(pixel.0) < self.luma_threshold {
                continue;
            }
            bright += 1;
            bounds = Some(match bounds {
                None => (x, y, x, y),
                Some((x1, y1, x2, y2)) => (x1.min(x), y1.min(y), x2.max(x), y2.max(y)),
            });
        }

        let Some((x1, y1, x2, y2)) = bounds else {
            return Ok(Vec::new());
        };
        if bright < self.min_pixels {
            return Ok(Vec::new());
        }

        // Right and bottom edges are exclusive.
        let bbox = BoundingBox::new(x1 as f32, y1 as f32, (x2 + 1) as f32, (y2 + 1) as f32);
        let confidence = (bright as f32 / bbox.area()).clamp(0.0, 1.0);
        Ok(vec![Detection::new(bbox, confidence, PERSON_CLASS_ID)])
    }
}

/// ITU-R BT.601 luma.
fn luma([r, g, b]: [u8; 3]) -> u8 {
    (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32).round() as u8
}
