use image::{GrayImage, Luma, Rgb, RgbImage};

use crate::detect::Detection;

const DEFAULT_RADIUS: u32 = 50;
const INTENSITY: u8 = 255;
const FRAME_WEIGHT: f32 = 0.6;
const HEAT_WEIGHT: f32 = 0.4;

/// Largest disc radius accepted from configuration.
pub const MAX_RADIUS: u32 = 4096;

/// Detection-density overlay.
///
/// Every iteration starts from a zeroed canvas, paints one saturated disc per
/// detection center, maps the canvas through the jet color ramp and blends it
/// over the source frame.
#[derive(Clone, Debug)]
pub struct HeatmapRenderer {
    radius: u32,
}

impl Default for HeatmapRenderer {
    fn default() -> Self {
        Self {
            radius: DEFAULT_RADIUS,
        }
    }
}

impl HeatmapRenderer {
    pub fn new(radius: u32) -> Self {
        Self { radius }
    }

    /// Single-channel canvas with one filled disc per center.
    ///
    /// Discs overwrite rather than add, so overlapping detections saturate at
    /// the fill intensity. Pixels outside the frame are clipped.
    pub fn canvas(&self, width: u32, height: u32, centers: &[(i32, i32)]) -> GrayImage {
        let mut canvas = GrayImage::new(width, height);
        // Any radius past width + height already covers the whole frame.
        let r = (self.radius as i64).min(width as i64 + height as i64);
        let r2 = r.saturating_mul(r);

        for &(cx, cy) in centers {
            let (cx, cy) = (cx as i64, cy as i64);
            let y0 = (cy - r).max(0);
            let y1 = (cy + r).min(height as i64 - 1);
            let x0 = (cx - r).max(0);
            let x1 = (cx + r).min(width as i64 - 1);
            for y in y0..=y1 {
                let dy = y - cy;
                for x in x0..=x1 {
                    let dx = x - cx;
                    if dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy)) <= r2 {
                        canvas.put_pixel(x as u32, y as u32, Luma([INTENSITY]));
                    }
                }
            }
        }

        canvas
    }

    /// Render the blended heatmap for one frame.
    pub fn render(&self, frame: &RgbImage, detections: &[Detection]) -> RgbImage {
        let centers = center_points(detections);
        let canvas = self.canvas(frame.width(), frame.height(), &centers);
        blend(frame, &colorize(&canvas), FRAME_WEIGHT, HEAT_WEIGHT)
    }
}

/// Integer box midpoints, truncated toward zero.
pub fn center_points(detections: &[Detection]) -> Vec<(i32, i32)> {
    detections.iter().map(|det| det.bbox.center()).collect()
}

/// Jet color ramp: 0 is dark blue `(0, 0, 128)`, 255 is dark red `(128, 0, 0)`.
pub fn jet(value: u8) -> Rgb<u8> {
    let t = value as f32 / 255.0;
    let channel = |offset: f32| -> u8 {
        let v = (1.5 - (4.0 * t - offset).abs()).clamp(0.0, 1.0);
        (v * 255.0).round() as u8
    };
    Rgb([channel(3.0), channel(2.0), channel(1.0)])
}

/// Map a single-channel canvas through `jet`.
pub fn colorize(canvas: &GrayImage) -> RgbImage {
    let lut: Vec<Rgb<u8>> = (0..=255u8).map(jet).collect();
    RgbImage::from_fn(canvas.width(), canvas.height(), |x, y| {
        lut[canvas.get_pixel(x, y)[0] as usize]
    })
}

/// Per-channel `round(a * frame_weight + b * heat_weight)`, saturating.
///
/// Both images must have the same dimensions.
pub fn blend(frame: &RgbImage, heat: &RgbImage, frame_weight: f32, heat_weight: f32) -> RgbImage {
    debug_assert_eq!(frame.dimensions(), heat.dimensions());
    let mut out = RgbImage::new(frame.width(), frame.height());
    for ((dst, a), b) in out.pixels_mut().zip(frame.pixels()).zip(heat.pixels()) {
        for c in 0..3 {
            let v = a[c] as f32 * frame_weight + b[c] as f32 * heat_weight;
            dst[c] = v.round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BoundingBox;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 3 % 256) as u8, (y * 5 % 256) as u8, ((x + y) % 256) as u8])
        })
    }

    #[test]
    fn jet_endpoints() {
        assert_eq!(jet(0), Rgb([0, 0, 128]));
        assert_eq!(jet(255), Rgb([128, 0, 0]));
        let mid = jet(128);
        assert!(mid[1] > 200, "middle of the ramp is green-ish: {:?}", mid);
    }

    #[test]
    fn zero_detections_blend_uniform_cold_color() {
        let frame = gradient(48, 32);
        let heat = HeatmapRenderer::default().render(&frame, &[]);
        let cold = RgbImage::from_pixel(48, 32, jet(0));
        assert_eq!(heat, blend(&frame, &cold, 0.6, 0.4));

        let p = frame.get_pixel(7, 3);
        let expected = Rgb([
            (p[0] as f32 * 0.6).round() as u8,
            (p[1] as f32 * 0.6).round() as u8,
            (p[2] as f32 * 0.6 + 128.0 * 0.4).round() as u8,
        ]);
        assert_eq!(*heat.get_pixel(7, 3), expected);
    }

    #[test]
    fn single_disc_is_centered_with_configured_radius() {
        let renderer = HeatmapRenderer::default();
        let det = Detection::new(BoundingBox::new(100.0, 100.0, 201.0, 161.0), 0.8, 0);
        let centers = center_points(&[det]);
        assert_eq!(centers, vec![(150, 130)]);

        let canvas = renderer.canvas(320, 240, &centers);
        assert_eq!(canvas.get_pixel(150, 130)[0], 255);
        assert_eq!(canvas.get_pixel(200, 130)[0], 255);
        assert_eq!(canvas.get_pixel(150, 80)[0], 255);
        assert_eq!(canvas.get_pixel(201, 130)[0], 0);
        assert_eq!(canvas.get_pixel(150, 181)[0], 0);
        // (35, 36) is just outside r = 50
        assert_eq!(canvas.get_pixel(185, 166)[0], 0);
        assert_eq!(canvas.get_pixel(184, 165)[0], 255);
        assert_eq!(canvas.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn overlapping_discs_saturate() {
        let canvas = HeatmapRenderer::new(10).canvas(40, 40, &[(20, 20), (22, 20)]);
        assert_eq!(canvas.get_pixel(21, 20)[0], 255);
        assert!(canvas.pixels().all(|p| p[0] == 0 || p[0] == 255));
    }

    #[test]
    fn discs_near_edges_are_clipped() {
        let canvas = HeatmapRenderer::new(50).canvas(20, 20, &[(-5, -5), (1000, 1000)]);
        assert_eq!(canvas.get_pixel(0, 0)[0], 255);
        assert_eq!(canvas.get_pixel(19, 19)[0], 255);
        assert_eq!(canvas.dimensions(), (20, 20));
    }

    #[test]
    fn oversized_radius_fills_the_frame() {
        let canvas = HeatmapRenderer::new(u32::MAX).canvas(8, 8, &[(4, 4)]);
        assert!(canvas.pixels().all(|p| p[0] == 255));

        let canvas = HeatmapRenderer::new(u32::MAX).canvas(8, 8, &[(i32::MIN, i32::MAX)]);
        assert_eq!(canvas.dimensions(), (8, 8));
    }
}
