//! Face and emotion detection for MoodScan.
//!
//! This crate provides:
//! - The [`EmotionDetector`] trait and its ONNX-backed implementation
//! - Image decoding from uploaded bytes
//! - Overlay drawing (bounding boxes and emotion labels)
//! - The per-image annotation pipeline with per-image failure isolation

pub mod annotate;
pub mod decode;
pub mod detector;
pub mod error;
pub mod pipeline;

pub use annotate::{annotate_faces, encode_png};
pub use decode::decode_image;
pub use detector::onnx::{
    EmotionClassifierConfig, FaceDetectorConfig, OnnxMoodDetector, EMOTION_LABELS,
};
pub use detector::EmotionDetector;
pub use error::{VisionError, VisionResult};
pub use pipeline::{
    annotate_image, process_batch, AnnotatedImage, BatchOutcome, SkippedImage, UploadedImage,
};
