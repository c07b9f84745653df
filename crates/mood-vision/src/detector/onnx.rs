//! ONNX-backed face localization and emotion classification.
//!
//! Two pretrained models are treated as black boxes:
//! - a face localizer with YOLO-style output `[1, 5, N]`
//!   (4 bbox values + 1 face confidence per candidate)
//! - an emotion classifier producing one logit per label in
//!   [`EMOTION_LABELS`] for a cropped face
//!
//! Execution provider selection: CUDA on Linux (when the `cuda` feature is
//! enabled), CoreML on macOS, CPU fallback everywhere.

use std::path::Path;
use std::sync::Mutex;

use image::{imageops, RgbImage};
use ndarray::Array;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{Tensor, Value};
use tracing::{debug, info};

use mood_models::{DetectedFace, EmotionScores, FaceBox};

use crate::detector::EmotionDetector;
use crate::error::{VisionError, VisionResult};

/// The label set emitted by the emotion classifier, in emission order.
pub const EMOTION_LABELS: [&str; 7] = [
    "angry", "disgust", "fear", "happy", "neutral", "sad", "surprise",
];

/// ImageNet channel means/stds used to normalize classifier input.
const CHANNEL_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const CHANNEL_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Configuration for the face localizer.
#[derive(Debug, Clone)]
pub struct FaceDetectorConfig {
    /// Path to the ONNX model file
    pub model_path: String,
    /// Confidence threshold for face candidates
    pub confidence_threshold: f32,
    /// IoU threshold for NMS
    pub nms_threshold: f32,
    /// Input image size (model expects square input)
    pub input_size: u32,
    /// Name of the detection output tensor
    pub output_name: String,
}

impl Default for FaceDetectorConfig {
    fn default() -> Self {
        Self {
            model_path: "models/face/yolov8n-face.onnx".to_string(),
            confidence_threshold: 0.5,
            nms_threshold: 0.45,
            input_size: 640,
            output_name: "output0".to_string(),
        }
    }
}

/// Configuration for the emotion classifier.
#[derive(Debug, Clone)]
pub struct EmotionClassifierConfig {
    /// Path to the ONNX model file
    pub model_path: String,
    /// Input crop size (model expects square input)
    pub input_size: u32,
    /// Name of the logits output tensor
    pub output_name: String,
}

impl Default for EmotionClassifierConfig {
    fn default() -> Self {
        Self {
            model_path: "models/emotion/fer7.onnx".to_string(),
            input_size: 224,
            output_name: "output".to_string(),
        }
    }
}

/// A face candidate in pixel coordinates, before conversion to [`FaceBox`].
#[derive(Debug, Clone, Copy)]
struct RawFace {
    x: f32,
    y: f32,
    w: f32,
    h: f32,
    confidence: f32,
}

impl RawFace {
    fn iou(&self, other: &RawFace) -> f32 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.w).min(other.x + other.w);
        let y2 = (self.y + self.h).min(other.y + other.h);

        let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        let union = self.w * self.h + other.w * other.h - intersection;

        if union > 0.0 {
            intersection / union
        } else {
            0.0
        }
    }
}

/// Face and emotion detector backed by two ONNX Runtime sessions.
///
/// Construction is expensive (model load + graph optimization) and happens
/// once per process; the instance is read-only afterwards apart from the
/// interior session locks required by ONNX Runtime.
#[derive(Debug)]
pub struct OnnxMoodDetector {
    face: Mutex<Session>,
    emotion: Mutex<Session>,
    face_config: FaceDetectorConfig,
    emotion_config: EmotionClassifierConfig,
}

impl OnnxMoodDetector {
    /// Create a detector from config.
    ///
    /// Returns an error if either model file is missing or cannot be loaded.
    /// Callers treat that as fatal at startup.
    pub fn new(
        face_config: FaceDetectorConfig,
        emotion_config: EmotionClassifierConfig,
    ) -> VisionResult<Self> {
        for path in [&face_config.model_path, &emotion_config.model_path] {
            if !Path::new(path).exists() {
                return Err(VisionError::model_not_found(path.as_str()));
            }
        }

        let face = Mutex::new(create_session(Path::new(&face_config.model_path))?);
        let emotion = Mutex::new(create_session(Path::new(&emotion_config.model_path))?);

        info!(
            face_model = %face_config.model_path,
            emotion_model = %emotion_config.model_path,
            input_size = face_config.input_size,
            "Mood detector initialized"
        );

        Ok(Self {
            face,
            emotion,
            face_config,
            emotion_config,
        })
    }

    /// Locate faces in the raster.
    fn detect_faces(&self, image: &RgbImage) -> VisionResult<Vec<RawFace>> {
        let size = self.face_config.input_size;
        let resized = imageops::resize(image, size, size, imageops::FilterType::Triangle);
        let input = image_to_nchw(&resized, |_, p| p / 255.0)?;

        let raw = run_session(&self.face, &self.face_config.output_name, input)?;

        self.parse_face_output(&raw, image.width(), image.height())
    }

    /// Parse YOLO-style output `[1, 5, N]`: per candidate cx, cy, w, h in
    /// model coordinates plus a face confidence.
    fn parse_face_output(
        &self,
        outputs: &[f32],
        orig_width: u32,
        orig_height: u32,
    ) -> VisionResult<Vec<RawFace>> {
        let num_features = 5;
        if outputs.is_empty() || outputs.len() % num_features != 0 {
            return Err(VisionError::inference(format!(
                "unexpected face output size: {}",
                outputs.len()
            )));
        }
        let num_boxes = outputs.len() / num_features;

        let output_array = Array::from_shape_vec((num_features, num_boxes), outputs.to_vec())
            .map_err(|e| VisionError::inference(format!("failed to reshape face output: {}", e)))?;
        let transposed = output_array.t();

        let input_size = self.face_config.input_size as f32;
        let scale_w = orig_width as f32 / input_size;
        let scale_h = orig_height as f32 / input_size;

        let mut candidates = Vec::new();
        for i in 0..num_boxes {
            let confidence = transposed[[i, 4]];
            if confidence < self.face_config.confidence_threshold {
                continue;
            }

            let cx = transposed[[i, 0]];
            let cy = transposed[[i, 1]];
            let w = transposed[[i, 2]];
            let h = transposed[[i, 3]];

            candidates.push(RawFace {
                x: (cx - w / 2.0) * scale_w,
                y: (cy - h / 2.0) * scale_h,
                w: w * scale_w,
                h: h * scale_h,
                confidence,
            });
        }

        Ok(non_maximum_suppression(
            candidates,
            self.face_config.nms_threshold,
        ))
    }

    /// Score the emotions of one face crop.
    fn classify_face(&self, image: &RgbImage, bbox: &FaceBox) -> VisionResult<EmotionScores> {
        let crop = imageops::crop_imm(image, bbox.x as u32, bbox.y as u32, bbox.w, bbox.h).to_image();
        let size = self.emotion_config.input_size;
        let resized = imageops::resize(&crop, size, size, imageops::FilterType::Triangle);
        let input = image_to_nchw(&resized, |c, p| (p / 255.0 - CHANNEL_MEAN[c]) / CHANNEL_STD[c])?;

        let logits = run_session(&self.emotion, &self.emotion_config.output_name, input)?;
        if logits.len() != EMOTION_LABELS.len() {
            return Err(VisionError::inference(format!(
                "expected {} emotion logits, got {}",
                EMOTION_LABELS.len(),
                logits.len()
            )));
        }

        let probabilities = softmax(&logits);
        Ok(EmotionScores::from_pairs(
            EMOTION_LABELS.iter().copied().zip(probabilities),
        ))
    }
}

impl EmotionDetector for OnnxMoodDetector {
    fn detect(&self, image: &RgbImage) -> VisionResult<Vec<DetectedFace>> {
        let raw_faces = self.detect_faces(image)?;

        let mut faces = Vec::with_capacity(raw_faces.len());
        for raw in raw_faces {
            let bbox = FaceBox::new(
                raw.x.round() as i32,
                raw.y.round() as i32,
                raw.w.round().max(1.0) as u32,
                raw.h.round().max(1.0) as u32,
            );
            // Faces degenerating to nothing inside the frame are dropped.
            let Some(clamped) = bbox.clamped(image.width(), image.height()) else {
                continue;
            };
            let scores = self.classify_face(image, &clamped)?;
            faces.push(DetectedFace::new(bbox, scores));
        }

        debug!(count = faces.len(), "Face detection completed");
        Ok(faces)
    }

    fn name(&self) -> &'static str {
        "onnx"
    }
}

/// Convert an RGB raster to a `[1, 3, H, W]` tensor value.
///
/// `normalize` maps a raw channel byte (as f32) to the model's expected
/// range; it receives the channel index so per-channel statistics can apply.
fn image_to_nchw(img: &RgbImage, normalize: impl Fn(usize, f32) -> f32) -> VisionResult<Value> {
    let (w, h) = (img.width() as usize, img.height() as usize);

    let mut chw_data: Vec<f32> = Vec::with_capacity(3 * h * w);
    for c in 0..3 {
        for y in 0..h {
            for x in 0..w {
                let pixel = img.get_pixel(x as u32, y as u32);
                chw_data.push(normalize(c, pixel[c] as f32));
            }
        }
    }

    let shape = vec![1usize, 3, h, w];
    Tensor::from_array((shape, chw_data.into_boxed_slice()))
        .map(Value::from)
        .map_err(|e| VisionError::internal(format!("failed to create tensor: {}", e)))
}

/// Run one session and extract the named f32 output.
fn run_session(session: &Mutex<Session>, output_name: &str, input: Value) -> VisionResult<Vec<f32>> {
    let mut session = session
        .lock()
        .map_err(|_| VisionError::internal("session lock poisoned"))?;

    let outputs = session
        .run(ort::inputs![input])
        .map_err(|e| VisionError::inference(format!("ONNX inference failed: {}", e)))?;

    let output = outputs
        .get(output_name)
        .ok_or_else(|| VisionError::inference(format!("missing {} tensor", output_name)))?;

    let tensor = output
        .try_extract_tensor::<f32>()
        .map_err(|e| VisionError::inference(format!("failed to extract tensor: {}", e)))?;

    Ok(tensor.1.iter().copied().collect())
}

/// Greedy NMS: sort by confidence descending, suppress overlapping boxes.
fn non_maximum_suppression(mut faces: Vec<RawFace>, iou_threshold: f32) -> Vec<RawFace> {
    if faces.is_empty() {
        return faces;
    }

    faces.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; faces.len()];

    for i in 0..faces.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(faces[i]);

        for j in (i + 1)..faces.len() {
            if suppressed[j] {
                continue;
            }
            if faces[i].iou(&faces[j]) > iou_threshold {
                suppressed[j] = true;
            }
        }
    }

    keep
}

/// Numerically stable softmax.
fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|v| v / sum).collect()
}

/// Create an ONNX Runtime session with execution provider fallback.
fn create_session(model_path: &Path) -> VisionResult<Session> {
    let model_bytes = std::fs::read(model_path)?;

    let mut builder = Session::builder()
        .map_err(|e| VisionError::internal(format!("failed to create session builder: {}", e)))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| VisionError::internal(format!("failed to set optimization level: {}", e)))?;

    // Try CUDA on Linux with cuda feature
    #[cfg(all(target_os = "linux", feature = "cuda"))]
    {
        use ort::execution_providers::CUDAExecutionProvider;
        if let Ok(cuda_builder) = builder
            .clone()
            .with_execution_providers([CUDAExecutionProvider::default().build()])
        {
            if let Ok(session) = cuda_builder.commit_from_memory(&model_bytes) {
                info!("Using CUDA execution provider");
                return Ok(session);
            }
        }
        debug!("CUDA execution provider not available, trying alternatives");
    }

    // Try CoreML on macOS
    #[cfg(target_os = "macos")]
    {
        use ort::execution_providers::CoreMLExecutionProvider;
        if let Ok(coreml_builder) = builder
            .clone()
            .with_execution_providers([CoreMLExecutionProvider::default().build()])
        {
            if let Ok(session) = coreml_builder.commit_from_memory(&model_bytes) {
                info!("Using CoreML execution provider");
                return Ok(session);
            }
        }
        debug!("CoreML execution provider not available, using CPU");
    }

    info!("Using CPU execution provider");
    builder
        .commit_from_memory(&model_bytes)
        .map_err(|e| VisionError::internal(format!("failed to load ONNX model: {}", e)))
}
