use anyhow::Result;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{BoundingBox, Detection};
use crate::frame::Frame;

/// Backend that reports the same detections for every frame.
///
/// Used to drive the pipeline deterministically without a model.
#[derive(Clone, Debug, Default)]
pub struct FixedBackend {
    detections: Vec<Detection>,
    calls: u64,
}

impl FixedBackend {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self {
            detections,
            calls: 0,
        }
    }

    /// Shorthand for a backend that always reports one box.
    pub fn single(bbox: [f32; 4], confidence: f32, class_id: u32) -> Self {
        let [x1, y1, x2, y2] = bbox;
        Self::new(vec![Detection::new(
            BoundingBox::new(x1, y1, x2, y2),
            confidence,
            class_id,
        )])
    }

    /// Number of frames seen so far.
    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl DetectorBackend for FixedBackend {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>> {
        self.calls += 1;
        Ok(self.detections.clone())
    }
}
