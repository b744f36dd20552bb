//! Per-frame image rendering.
//!
//! Both renderers are pure functions of one frame and the detections found in
//! it. Nothing is accumulated between frames.

mod annotate;
mod heatmap;

pub use annotate::{annotate, class_color, BOX_THICKNESS, LABEL_TAB_HEIGHT};
pub use heatmap::{blend, center_points, colorize, jet, HeatmapRenderer, MAX_RADIUS};
