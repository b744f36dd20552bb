use image::{Rgb, RgbImage};

use crate::detect::Detection;

/// Outline thickness in pixels.
pub const BOX_THICKNESS: u32 = 2;
/// Height of the confidence tab drawn above each box.
pub const LABEL_TAB_HEIGHT: u32 = 6;

const PALETTE: [[u8; 3]; 10] = [
    [255, 56, 56],
    [255, 157, 151],
    [255, 112, 31],
    [255, 178, 29],
    [207, 210, 49],
    [72, 249, 10],
    [26, 147, 52],
    [0, 212, 187],
    [52, 69, 147],
    [203, 56, 255],
];

/// Stable per-class outline color.
pub fn class_color(class_id: u32) -> Rgb<u8> {
    Rgb(PALETTE[class_id as usize % PALETTE.len()])
}

/// Copy of `frame` with every detection outlined.
///
/// Each box gets a filled tab on its top edge whose width is the box width
/// scaled by confidence. Boxes are clamped to the frame and empty boxes are
/// skipped.
pub fn annotate(frame: &RgbImage, detections: &[Detection]) -> RgbImage {
    let mut out = frame.clone();
    let (width, height) = out.dimensions();

    for det in detections {
        let bbox = det.bbox.clamp(width, height);
        let x1 = bbox.x1.floor() as u32;
        let y1 = bbox.y1.floor() as u32;
        let x2 = (bbox.x2.ceil() as u32).min(width);
        let y2 = (bbox.y2.ceil() as u32).min(height);
        if x2 <= x1 || y2 <= y1 {
            continue;
        }
        let color = class_color(det.class_id);

        // top, bottom, left, right
        fill_rect(&mut out, x1, y1, x2, y1 + BOX_THICKNESS, color);
        fill_rect(&mut out, x1, y2.saturating_sub(BOX_THICKNESS), x2, y2, color);
        fill_rect(&mut out, x1, y1, x1 + BOX_THICKNESS, y2, color);
        fill_rect(&mut out, x2.saturating_sub(BOX_THICKNESS), y1, x2, y2, color);

        let tab_width = (((x2 - x1) as f32) * det.confidence.clamp(0.0, 1.0))
            .round()
            .max(1.0) as u32;
        let (tab_top, tab_bottom) = if y1 >= LABEL_TAB_HEIGHT {
            (y1 - LABEL_TAB_HEIGHT, y1)
        } else {
            (y1, y1 + LABEL_TAB_HEIGHT)
        };
        fill_rect(&mut out, x1, tab_top, x1 + tab_width, tab_bottom, color);
    }

    out
}

/// Fill `[x0, x1) x [y0, y1)`, clipped to the image.
fn fill_rect(image: &mut RgbImage, x0: u32, y0: u32, x1: u32, y1: u32, color: Rgb<u8>) {
    let x1 = x1.min(image.width());
    let y1 = y1.min(image.height());
    for y in y0..y1 {
        for x in x0..x1 {
            image.put_pixel(x, y, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BoundingBox;

    const BG: Rgb<u8> = Rgb([0, 0, 0]);

    fn det(b: [f32; 4], confidence: f32, class_id: u32) -> Detection {
        Detection::new(BoundingBox::new(b[0], b[1], b[2], b[3]), confidence, class_id)
    }

    #[test]
    fn no_detections_leaves_frame_untouched() {
        let frame = RgbImage::from_pixel(32, 32, Rgb([9, 8, 7]));
        assert_eq!(annotate(&frame, &[]), frame);
    }

    #[test]
    fn outline_is_drawn_and_interior_kept() {
        let frame = RgbImage::from_pixel(64, 64, BG);
        let out = annotate(&frame, &[det([10.0, 10.0, 30.0, 30.0], 0.9, 0)]);
        let color = class_color(0);

        assert_eq!(*out.get_pixel(10, 20), color);
        assert_eq!(*out.get_pixel(11, 20), color);
        assert_eq!(*out.get_pixel(29, 20), color);
        assert_eq!(*out.get_pixel(20, 29), color);
        assert_eq!(*out.get_pixel(20, 20), BG);
        assert_eq!(*out.get_pixel(12, 20), BG);
        assert_eq!(*out.get_pixel(40, 40), BG);
    }

    #[test]
    fn tab_width_tracks_confidence() {
        let frame = RgbImage::from_pixel(64, 64, BG);
        let out = annotate(&frame, &[det([10.0, 20.0, 30.0, 40.0], 0.5, 3)]);
        let color = class_color(3);

        // 20 px wide box at 50% gives a 10 px tab ending at x = 19.
        assert_eq!(*out.get_pixel(19, 16), color);
        assert_eq!(*out.get_pixel(20, 16), BG);
    }

    #[test]
    fn boxes_outside_frame_are_clipped_or_skipped() {
        let frame = RgbImage::from_pixel(16, 16, BG);
        let out = annotate(
            &frame,
            &[
                det([-10.0, -10.0, 100.0, 100.0], 1.0, 1),
                det([20.0, 20.0, 40.0, 40.0], 1.0, 2),
            ],
        );
        assert_eq!(*out.get_pixel(0, 8), class_color(1));
        assert_eq!(*out.get_pixel(15, 8), class_color(1));
        assert_eq!(*out.get_pixel(8, 8), BG);
    }
}
