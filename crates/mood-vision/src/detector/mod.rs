//! Detector trait and implementations.

pub mod onnx;

use image::RgbImage;
use mood_models::DetectedFace;

use crate::error::VisionResult;

/// A face-and-emotion detector.
///
/// Takes an RGB raster and returns every face found in it, each with a
/// bounding box and a map of emotion confidences. Zero faces is a valid,
/// non-error outcome. Implementations are constructed once at startup and
/// shared behind `Arc<dyn EmotionDetector>`; tests inject fakes.
pub trait EmotionDetector: Send + Sync {
    /// Detect faces and score their emotions.
    fn detect(&self, image: &RgbImage) -> VisionResult<Vec<DetectedFace>>;

    /// Detector name for logging.
    fn name(&self) -> &'static str;
}
