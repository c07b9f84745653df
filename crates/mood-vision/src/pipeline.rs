//! Per-image annotation and batch aggregation.
//!
//! One uploaded image flows decode → detect → top-emotion rows → overlay.
//! The batch runner concatenates rows in upload order and isolates per-image
//! failures: a corrupt upload among several never aborts the pass.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use mood_models::{FaceResult, ResultTable};

use crate::annotate::{annotate_faces, encode_png};
use crate::decode::decode_image;
use crate::detector::EmotionDetector;
use crate::error::VisionResult;

/// One uploaded file: raw bytes plus the name shown back to the user.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadedImage {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}

/// The annotated rendition of one successfully processed image.
#[derive(Debug, Clone)]
pub struct AnnotatedImage {
    /// Original file name
    pub file_name: String,
    /// Number of faces found in this image
    pub face_count: usize,
    /// PNG-encoded raster with the overlay burned in
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// An upload that could not be processed, with the reason shown to the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedImage {
    pub file_name: String,
    pub reason: String,
}

/// Everything one batch of uploads produced.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Annotated images, in upload order
    pub images: Vec<AnnotatedImage>,
    /// All face rows, in upload order then detection order
    pub table: ResultTable,
    /// Uploads that failed, each isolated from the rest of the batch
    pub skipped: Vec<SkippedImage>,
}

impl BatchOutcome {
    /// True when no face was found in any successfully processed image.
    ///
    /// Not an error: the caller surfaces it as an informational state and
    /// suppresses the summary chart and CSV export.
    pub fn no_faces(&self) -> bool {
        self.table.is_empty()
    }
}

/// Annotate a single image.
///
/// Returns the annotated rendition plus one [`FaceResult`] row per detected
/// face, in detection order. Zero faces is a valid outcome with an output
/// raster pixel-identical to the input.
pub fn annotate_image(
    detector: &dyn EmotionDetector,
    file_name: &str,
    bytes: &[u8],
) -> VisionResult<(AnnotatedImage, Vec<FaceResult>)> {
    let mut raster = decode_image(bytes)?;
    let faces = detector.detect(&raster)?;

    let mut rows = Vec::with_capacity(faces.len());
    for (face_index, face) in faces.iter().enumerate() {
        match FaceResult::from_face(file_name, face_index, face) {
            Some(row) => rows.push(row),
            // A face with no scores has no top emotion to record.
            None => warn!(file_name, face_index, "face carried an empty score map"),
        }
    }

    annotate_faces(&mut raster, &faces)?;

    let (width, height) = raster.dimensions();
    let png = encode_png(&raster)?;

    debug!(file_name, faces = faces.len(), "image annotated");

    Ok((
        AnnotatedImage {
            file_name: file_name.to_string(),
            face_count: faces.len(),
            png,
            width,
            height,
        },
        rows,
    ))
}

/// Process a batch of uploads sequentially, in upload order.
///
/// Failures are per-image: a decode or detection error lands the file in
/// `skipped` and the remaining uploads still process.
pub fn process_batch(detector: &dyn EmotionDetector, uploads: Vec<UploadedImage>) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();

    for upload in uploads {
        match annotate_image(detector, &upload.file_name, &upload.bytes) {
            Ok((annotated, rows)) => {
                outcome.table.extend(rows);
                outcome.images.push(annotated);
            }
            Err(e) => {
                warn!(file_name = %upload.file_name, error = %e, "skipping image");
                outcome.skipped.push(SkippedImage {
                    file_name: upload.file_name,
                    reason: e.to_string(),
                });
            }
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use image::{Rgb, RgbImage};
    use mood_models::{DetectedFace, EmotionScores, EmotionSummary, FaceBox};

    use super::*;
    use crate::error::VisionError;

    /// Scripted detector: returns the queued face lists in call order.
    struct FakeDetector {
        responses: Mutex<Vec<Vec<DetectedFace>>>,
    }

    impl FakeDetector {
        fn new(responses: Vec<Vec<DetectedFace>>) -> Self {
            Self {
                responses: Mutex::new(responses),
            }
        }
    }

    impl EmotionDetector for FakeDetector {
        fn detect(&self, _image: &RgbImage) -> VisionResult<Vec<DetectedFace>> {
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Err(VisionError::inference("no scripted response left"));
            }
            Ok(responses.remove(0))
        }

        fn name(&self) -> &'static str {
            "fake"
        }
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([120, 120, 120]));
        encode_png(&img).unwrap()
    }

    fn face(x: i32, y: i32, pairs: &[(&str, f32)]) -> DetectedFace {
        DetectedFace::new(
            FaceBox::new(x, y, 16, 16),
            EmotionScores::from_pairs(pairs.iter().map(|&(l, s)| (l, s))),
        )
    }

    #[test]
    fn two_faces_yield_two_rows_with_top_emotions() {
        let detector = FakeDetector::new(vec![vec![
            face(4, 4, &[("happy", 0.9), ("sad", 0.1)]),
            face(40, 4, &[("angry", 0.7), ("neutral", 0.3)]),
        ]]);
        let uploads = vec![UploadedImage::new("photo.jpg", png_bytes(64, 64))];

        let outcome = process_batch(&detector, uploads);

        assert!(outcome.skipped.is_empty());
        assert_eq!(outcome.table.len(), 2);

        let rows = outcome.table.rows();
        assert_eq!((rows[0].face_index, rows[0].emotion.as_str()), (0, "happy"));
        assert_eq!(rows[0].scores.get("happy"), Some(0.9));
        assert_eq!(rows[0].scores.get("sad"), Some(0.1));
        assert_eq!((rows[1].face_index, rows[1].emotion.as_str()), (1, "angry"));

        let summary = EmotionSummary::from_table(&outcome.table);
        let entries: Vec<_> = summary.iter().map(|e| (e.label.as_str(), e.count)).collect();
        assert_eq!(entries, vec![("angry", 1), ("happy", 1)]);
    }

    #[test]
    fn zero_faces_contributes_no_rows_and_identical_pixels() {
        let detector = FakeDetector::new(vec![vec![]]);
        let input = png_bytes(32, 24);

        let (annotated, rows) = annotate_image(&detector, "empty.png", &input).unwrap();

        assert!(rows.is_empty());
        assert_eq!(annotated.face_count, 0);
        let output = decode_image(&annotated.png).unwrap();
        let original = decode_image(&input).unwrap();
        assert_eq!(output, original);
    }

    #[test]
    fn batch_preserves_upload_then_detection_order() {
        let detector = FakeDetector::new(vec![
            vec![face(0, 0, &[("happy", 0.8)]), face(20, 0, &[("sad", 0.6)])],
            vec![face(0, 0, &[("angry", 0.9)])],
        ]);
        let uploads = vec![
            UploadedImage::new("a.jpg", png_bytes(48, 48)),
            UploadedImage::new("b.jpg", png_bytes(48, 48)),
        ];

        let outcome = process_batch(&detector, uploads);

        let order: Vec<_> = outcome
            .table
            .iter()
            .map(|r| (r.image.as_str(), r.face_index))
            .collect();
        assert_eq!(order, vec![("a.jpg", 0), ("a.jpg", 1), ("b.jpg", 0)]);
    }

    #[test]
    fn corrupt_upload_is_isolated_from_the_batch() {
        let detector = FakeDetector::new(vec![vec![face(0, 0, &[("happy", 0.8)])]]);
        let uploads = vec![
            UploadedImage::new("broken.jpg", b"not an image".to_vec()),
            UploadedImage::new("good.jpg", png_bytes(32, 32)),
        ];

        let outcome = process_batch(&detector, uploads);

        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].file_name, "broken.jpg");
        assert_eq!(outcome.images.len(), 1);
        assert_eq!(outcome.table.len(), 1);
        assert_eq!(outcome.table.rows()[0].image, "good.jpg");
    }

    #[test]
    fn detector_failure_is_isolated_like_a_decode_failure() {
        // Second detect call errors out (no scripted response left)
        let detector = FakeDetector::new(vec![vec![face(0, 0, &[("neutral", 0.5)])]]);
        let uploads = vec![
            UploadedImage::new("first.png", png_bytes(16, 16)),
            UploadedImage::new("second.png", png_bytes(16, 16)),
        ];

        let outcome = process_batch(&detector, uploads);

        assert_eq!(outcome.table.len(), 1);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].file_name, "second.png");
    }

    #[test]
    fn no_faces_flag_reflects_the_whole_batch() {
        let detector = FakeDetector::new(vec![vec![], vec![face(0, 0, &[("happy", 0.9)])]]);
        let uploads = vec![
            UploadedImage::new("empty.png", png_bytes(16, 16)),
            UploadedImage::new("one.png", png_bytes(16, 16)),
        ];

        let outcome = process_batch(&detector, uploads);

        // One face exists globally, so the empty-result state does not apply
        assert!(!outcome.no_faces());
        assert_eq!(outcome.table.len(), 1);

        let empty_only = process_batch(&FakeDetector::new(vec![vec![]]), vec![
            UploadedImage::new("empty.png", png_bytes(16, 16)),
        ]);
        assert!(empty_only.no_faces());
    }
}
