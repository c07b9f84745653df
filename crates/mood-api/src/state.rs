//! Application state.

use std::sync::Arc;

use mood_vision::{
    EmotionClassifierConfig, EmotionDetector, FaceDetectorConfig, OnnxMoodDetector, VisionError,
};

use crate::config::ApiConfig;
use crate::services::SessionStore;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    /// The process-wide detector, constructed once at startup.
    pub detector: Arc<dyn EmotionDetector>,
    pub sessions: SessionStore,
}

impl AppState {
    /// Create application state with the ONNX detector.
    ///
    /// Fails when either model cannot be loaded; the caller treats this as
    /// fatal and exits before binding the listener.
    pub fn new(config: ApiConfig) -> Result<Self, VisionError> {
        let face_config = FaceDetectorConfig {
            model_path: config.face_model_path.clone(),
            ..Default::default()
        };
        let emotion_config = EmotionClassifierConfig {
            model_path: config.emotion_model_path.clone(),
            ..Default::default()
        };
        let detector = OnnxMoodDetector::new(face_config, emotion_config)?;
        Ok(Self::with_detector(config, Arc::new(detector)))
    }

    /// Create application state with an injected detector (used in tests).
    pub fn with_detector(config: ApiConfig, detector: Arc<dyn EmotionDetector>) -> Self {
        Self {
            config,
            detector,
            sessions: SessionStore::new(),
        }
    }
}
