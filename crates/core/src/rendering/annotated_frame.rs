use image::{Rgb, RgbImage};

use crate::rendering::overlay::{OverlayBatch, OverlayElement};
use crate::shared::constants::KEYPOINT_RADIUS;
use crate::shared::frame::Frame;

pub const HIGHLIGHT_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
/// Highlighter tint while a snapshot of the face is uploading.
pub const BUSY_COLOR: Rgb<u8> = Rgb([255, 191, 0]);
pub const HIGHLIGHT_ALPHA: f32 = 0.25;
pub const BORDER_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

pub const LABEL_COLOR: Rgb<u8> = Rgb([0, 114, 255]);
pub const LABEL_ALPHA: f32 = 0.7;
/// Height of the label band; it ends just above the highlighter.
pub const LABEL_HEIGHT: f64 = 24.0;

pub const KEYPOINT_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// Draws `batch` over `frame` the way it appears on screen.
///
/// The frame is scaled to the batch's display size and mirrored, since
/// element positions are in mirrored display space. Label text is not
/// rasterized; the label is drawn as its background band.
pub fn annotate(
    frame: &Frame,
    batch: &OverlayBatch,
) -> Result<RgbImage, Box<dyn std::error::Error>> {
    if frame.channels() != 3 {
        return Err(format!("Expected an RGB frame, got {} channels", frame.channels()).into());
    }
    let img = RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
        .ok_or("Frame data does not match its dimensions")?;

    let display = batch.display();
    let w = (display.width.round() as u32).max(1);
    let h = (display.height.round() as u32).max(1);
    let mut img = if (w, h) == img.dimensions() {
        img
    } else {
        image::imageops::resize(&img, w, h, image::imageops::FilterType::Triangle)
    };
    image::imageops::flip_horizontal_in_place(&mut img);

    for element in batch.elements() {
        match *element {
            OverlayElement::Highlighter {
                left,
                top,
                width,
                height,
                busy,
            } => {
                let tint = if busy { BUSY_COLOR } else { HIGHLIGHT_COLOR };
                blend_rect(&mut img, left, top, width, height, tint, HIGHLIGHT_ALPHA);
                outline_rect(&mut img, left, top, width, height, BORDER_COLOR);
            }
            OverlayElement::ConfidenceLabel {
                left, top, width, ..
            } => {
                blend_rect(
                    &mut img,
                    left,
                    top,
                    width,
                    LABEL_HEIGHT,
                    LABEL_COLOR,
                    LABEL_ALPHA,
                );
            }
            OverlayElement::KeyPoint { left, top } => {
                let size = KEYPOINT_RADIUS * 2.0;
                blend_rect(&mut img, left, top, size, size, KEYPOINT_COLOR, 1.0);
            }
        }
    }
    Ok(img)
}

/// Pixel span `[start, end)` of `pos..pos+len`, clipped to `0..limit`.
fn span(pos: f64, len: f64, limit: u32) -> (u32, u32) {
    let start = pos.round().max(0.0) as i64;
    let end = (pos + len).round().min(limit as f64) as i64;
    if end <= start {
        (0, 0)
    } else {
        (start as u32, end as u32)
    }
}

fn blend(dst: Rgb<u8>, src: Rgb<u8>, alpha: f32) -> Rgb<u8> {
    let mix = |d: u8, s: u8| (d as f32 * (1.0 - alpha) + s as f32 * alpha).round() as u8;
    Rgb([
        mix(dst[0], src[0]),
        mix(dst[1], src[1]),
        mix(dst[2], src[2]),
    ])
}

fn blend_rect(
    img: &mut RgbImage,
    left: f64,
    top: f64,
    width: f64,
    height: f64,
    color: Rgb<u8>,
    alpha: f32,
) {
    let (x0, x1) = span(left, width, img.width());
    let (y0, y1) = span(top, height, img.height());
    for y in y0..y1 {
        for x in x0..x1 {
            let px = img.get_pixel_mut(x, y);
            *px = blend(*px, color, alpha);
        }
    }
}

fn outline_rect(
    img: &mut RgbImage,
    left: f64,
    top: f64,
    width: f64,
    height: f64,
    color: Rgb<u8>,
) {
    blend_rect(img, left, top, width, 1.0, color, 1.0);
    blend_rect(img, left, top + height - 1.0, width, 1.0, color, 1.0);
    blend_rect(img, left, top, 1.0, height, color, 1.0);
    blend_rect(img, left + width - 1.0, top, 1.0, height, color, 1.0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::overlay::{DisplaySize, OverlayRenderer};
    use crate::shared::detection::{BoundingBox, Category, Detection, Keypoint};

    const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

    fn black_frame(width: u32, height: u32) -> Frame {
        Frame::new(vec![0u8; (width * height * 3) as usize], width, height, 3, 0.0)
    }

    fn face(keypoint: Keypoint) -> Detection {
        Detection {
            bounding_box: Some(BoundingBox {
                origin_x: 4.0,
                origin_y: 10.0,
                width: 20.0,
                height: 12.0,
            }),
            categories: vec![Category {
                score: 0.9,
                index: 0,
            }],
            keypoints: vec![keypoint],
        }
    }

    #[test]
    fn test_draws_highlighter_label_and_keypoint() {
        let mut renderer = OverlayRenderer::new(DisplaySize::new(40.0, 40.0));
        // Mirrored box: left 16, top 10, 10x12. Key point at (27, 27), 6x6.
        let batch = renderer.render(&[face(Keypoint { x: 0.25, y: 0.75 })], false);
        let img = annotate(&black_frame(40, 40), batch).unwrap();

        assert_eq!(*img.get_pixel(16, 10), BORDER_COLOR);
        assert_eq!(*img.get_pixel(25, 21), BORDER_COLOR);
        assert_eq!(
            *img.get_pixel(20, 15),
            blend(BLACK, HIGHLIGHT_COLOR, HIGHLIGHT_ALPHA)
        );
        // Label band runs from y = -20 to 4, clipped at the top edge.
        assert_eq!(*img.get_pixel(20, 2), blend(BLACK, LABEL_COLOR, LABEL_ALPHA));
        assert_eq!(*img.get_pixel(20, 6), BLACK);
        assert_eq!(*img.get_pixel(29, 29), KEYPOINT_COLOR);
        assert_eq!(*img.get_pixel(2, 35), BLACK);
        // Unmirrored box position stays untouched.
        assert_eq!(*img.get_pixel(6, 15), BLACK);
    }

    #[test]
    fn test_busy_highlighter_uses_busy_tint() {
        let mut renderer = OverlayRenderer::new(DisplaySize::new(40.0, 40.0));
        let batch = renderer.render(&[face(Keypoint { x: 0.0, y: 0.0 })], true);
        let img = annotate(&black_frame(40, 40), batch).unwrap();
        assert_eq!(*img.get_pixel(20, 15), blend(BLACK, BUSY_COLOR, HIGHLIGHT_ALPHA));
    }

    #[test]
    fn test_frame_is_mirrored() {
        // Left half red, right half blue.
        let mut data = Vec::new();
        for _ in 0..4 {
            for x in 0..8 {
                data.extend_from_slice(if x < 4 { &[255, 0, 0] } else { &[0, 0, 255] });
            }
        }
        let frame = Frame::new(data, 8, 4, 3, 0.0);
        let renderer = OverlayRenderer::new(DisplaySize::new(8.0, 4.0));
        let img = annotate(&frame, renderer.current()).unwrap();

        assert_eq!(*img.get_pixel(0, 0), Rgb([0, 0, 255]));
        assert_eq!(*img.get_pixel(7, 3), Rgb([255, 0, 0]));
    }

    #[test]
    fn test_scales_to_display_size() {
        let renderer = OverlayRenderer::new(DisplaySize::new(20.0, 10.0));
        let img = annotate(&black_frame(40, 20), renderer.current()).unwrap();
        assert_eq!(img.dimensions(), (20, 10));
    }

    #[test]
    fn test_rejects_non_rgb_frame() {
        let frame = Frame::new(vec![0u8; 16], 2, 2, 4, 0.0);
        let renderer = OverlayRenderer::new(DisplaySize::new(2.0, 2.0));
        assert!(annotate(&frame, renderer.current()).is_err());
    }

    #[test]
    fn test_offscreen_elements_are_clipped() {
        let mut renderer = OverlayRenderer::new(DisplaySize::new(10.0, 10.0));
        let mut d = face(Keypoint { x: 2.0, y: -1.0 });
        d.bounding_box = Some(BoundingBox {
            origin_x: -50.0,
            origin_y: -50.0,
            width: 200.0,
            height: 200.0,
        });
        let batch = renderer.render(&[d], false);
        assert!(annotate(&black_frame(10, 10), batch).is_ok());
    }
}
