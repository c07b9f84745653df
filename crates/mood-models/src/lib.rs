//! Shared data models for the MoodScan backend.
//!
//! This crate provides Serde-serializable types for:
//! - Face bounding boxes and per-face emotion scores
//! - Per-face result rows and the aggregated result table
//! - Emotion frequency summaries
//! - CSV export of the result table
//!
//! Everything here is plain data with pure operations; detection and HTTP
//! concerns live in `mood-vision` and `mood-api`.

pub mod export;
pub mod face;
pub mod result;
pub mod summary;

// Re-export common types
pub use export::{parse_csv, write_csv, ExportError, EXPORT_FILE_NAME, EXPORT_MIME};
pub use face::{DetectedFace, EmotionScore, EmotionScores, FaceBox};
pub use result::{FaceResult, ResultTable};
pub use summary::{EmotionCount, EmotionSummary};
