//! Overlay drawing: bounding boxes and emotion labels burned into the raster.

use std::io::Cursor;
use std::sync::OnceLock;

use ab_glyph::{FontRef, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use mood_models::DetectedFace;

use crate::error::{VisionError, VisionResult};

/// Fixed highlight color for boxes and labels.
const HIGHLIGHT: Rgb<u8> = Rgb([255, 0, 0]);

/// Stroke width of the box outline, in pixels.
const STROKE_WIDTH: i32 = 2;

/// Label text height in pixels.
const LABEL_HEIGHT: f32 = 16.0;

static LABEL_FONT_BYTES: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");
static LABEL_FONT: OnceLock<Option<FontRef<'static>>> = OnceLock::new();

fn label_font() -> VisionResult<&'static FontRef<'static>> {
    LABEL_FONT
        .get_or_init(|| FontRef::try_from_slice(LABEL_FONT_BYTES).ok())
        .as_ref()
        .ok_or_else(|| VisionError::internal("embedded label font failed to parse"))
}

/// Draw box outlines and top-emotion labels for every face, in place.
///
/// Each face gets a 2 px hollow rectangle at its bounding box and the text
/// `"<emotion> (<score>)"` slightly above the box's top edge. Faces with an
/// empty score map get only the box. An empty slice leaves the raster
/// untouched.
pub fn annotate_faces(img: &mut RgbImage, faces: &[DetectedFace]) -> VisionResult<()> {
    if faces.is_empty() {
        return Ok(());
    }
    let font = label_font()?;

    for face in faces {
        let Some(bbox) = face.bbox.clamped(img.width(), img.height()) else {
            continue;
        };

        // Nested 1 px rectangles build up the stroke width.
        for inset in 0..STROKE_WIDTH {
            let w = bbox.w as i32 - 2 * inset;
            let h = bbox.h as i32 - 2 * inset;
            if w <= 0 || h <= 0 {
                break;
            }
            let rect = Rect::at(bbox.x + inset, bbox.y + inset).of_size(w as u32, h as u32);
            draw_hollow_rect_mut(img, rect, HIGHLIGHT);
        }

        if let Some((emotion, score)) = face.scores.top() {
            let text = format!("{} ({:.2})", emotion, score);
            let text_y = (bbox.y - LABEL_HEIGHT as i32 - 2).max(0);
            draw_text_mut(
                img,
                HIGHLIGHT,
                bbox.x,
                text_y,
                PxScale::from(LABEL_HEIGHT),
                font,
                &text,
            );
        }
    }

    Ok(())
}

/// Encode a raster as PNG for serving.
pub fn encode_png(img: &RgbImage) -> VisionResult<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, image::ImageFormat::Png)
        .map_err(|e| VisionError::internal(format!("failed to encode PNG: {}", e)))?;
    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mood_models::{EmotionScores, FaceBox};

    fn blank(width: u32, height: u32) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([0, 0, 0]))
    }

    #[test]
    fn no_faces_leaves_raster_untouched() {
        let mut img = blank(64, 64);
        let before = img.clone();
        annotate_faces(&mut img, &[]).unwrap();
        assert_eq!(img, before);
    }

    #[test]
    fn annotated_face_changes_pixels_inside_box() {
        let mut img = blank(64, 64);
        let face = DetectedFace::new(
            FaceBox::new(10, 20, 30, 30),
            EmotionScores::from_pairs([("happy", 0.9)]),
        );
        annotate_faces(&mut img, std::slice::from_ref(&face)).unwrap();

        // Box corner carries the highlight color
        assert_eq!(*img.get_pixel(10, 20), HIGHLIGHT);
        // Interior of the hollow rect stays black
        assert_eq!(*img.get_pixel(25, 35), Rgb([0, 0, 0]));
    }

    #[test]
    fn dimensions_are_preserved() {
        let mut img = blank(100, 40);
        let face = DetectedFace::new(
            FaceBox::new(-5, -5, 30, 30),
            EmotionScores::from_pairs([("sad", 0.4)]),
        );
        annotate_faces(&mut img, std::slice::from_ref(&face)).unwrap();
        assert_eq!(img.dimensions(), (100, 40));
    }

    #[test]
    fn encode_png_produces_png_magic() {
        let img = blank(4, 4);
        let png = encode_png(&img).unwrap();
        assert_eq!(&png[..8], &[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n']);
    }
}
