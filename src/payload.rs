//! Wire shape of the `detections` event.

use serde::{Deserialize, Serialize};

use crate::detect::Detection;
use crate::gps::GpsFix;

/// Event name used for every broadcast.
pub const DETECTIONS_EVENT: &str = "detections";

/// Column-oriented detections for one frame.
///
/// `boxes`, `confidences` and `classes` always have the same length. Classes
/// are floats on the wire so dashboards written against float tensors keep
/// working.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionGroup {
    pub boxes: Vec<[f32; 4]>,
    pub confidences: Vec<f32>,
    pub classes: Vec<f32>,
}

impl DetectionGroup {
    pub fn from_detections(detections: &[Detection]) -> Self {
        let mut group = Self {
            boxes: Vec::with_capacity(detections.len()),
            confidences: Vec::with_capacity(detections.len()),
            classes: Vec::with_capacity(detections.len()),
        };
        for det in detections {
            group.boxes.push(det.bbox.to_array());
            group.confidences.push(det.confidence);
            group.classes.push(det.class_id as f32);
        }
        group
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    pub fn contains_class(&self, class_id: u32) -> bool {
        self.classes.iter().any(|c| *c == class_id as f32)
    }
}

/// Everything pushed to clients for one frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BroadcastPayload {
    pub annotated_image: String,
    pub heatmap_image: String,
    /// Exactly one group per frame.
    pub detections: Vec<DetectionGroup>,
    pub gps: GpsFix,
}

/// `{"event": ..., "data": ...}` envelope sent over the push channel.
#[derive(Debug, Serialize, Deserialize)]
pub struct EventEnvelope<T> {
    pub event: String,
    pub data: T,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BoundingBox;

    #[test]
    fn group_columns_have_equal_length() {
        let dets = vec![
            Detection::new(BoundingBox::new(10.0, 10.0, 30.0, 30.0), 0.9, 0),
            Detection::new(BoundingBox::new(1.0, 2.0, 3.0, 4.0), 0.4, 7),
        ];
        let group = DetectionGroup::from_detections(&dets);
        assert_eq!(group.len(), 2);
        assert_eq!(group.confidences.len(), 2);
        assert_eq!(group.classes, vec![0.0, 7.0]);
        assert_eq!(group.boxes[0], [10.0, 10.0, 30.0, 30.0]);
        assert!(group.contains_class(0));
        assert!(!group.contains_class(3));
    }

    #[test]
    fn payload_serializes_to_wire_shape() -> anyhow::Result<()> {
        let payload = BroadcastPayload {
            annotated_image: "data:image/jpeg;base64,AA".to_string(),
            heatmap_image: "data:image/jpeg;base64,BB".to_string(),
            detections: vec![DetectionGroup::default()],
            gps: GpsFix {
                latitude: 24.7136,
                longitude: 46.6753,
            },
        };
        let value = serde_json::to_value(EventEnvelope {
            event: DETECTIONS_EVENT.to_string(),
            data: &payload,
        })?;
        assert_eq!(value["event"], "detections");
        assert_eq!(value["data"]["detections"][0]["boxes"], serde_json::json!([]));
        assert_eq!(value["data"]["gps"]["latitude"], 24.7136);
        assert!(value["data"]["annotated_image"].is_string());
        Ok(())
    }
}
