//! Face bounding boxes and emotion score maps.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A face bounding box in pixel coordinates.
///
/// `x`/`y` are the top-left corner. Detectors may report corners slightly
/// outside the frame, so the origin is signed; width and height are always
/// positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FaceBox {
    /// X coordinate of the top-left corner
    pub x: i32,
    /// Y coordinate of the top-left corner
    pub y: i32,
    /// Width in pixels
    pub w: u32,
    /// Height in pixels
    pub h: u32,
}

impl FaceBox {
    /// Create a new bounding box.
    pub fn new(x: i32, y: i32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// X coordinate of the right edge (exclusive).
    pub fn right(&self) -> i32 {
        self.x + self.w as i32
    }

    /// Y coordinate of the bottom edge (exclusive).
    pub fn bottom(&self) -> i32 {
        self.y + self.h as i32
    }

    /// Clamp the box to an image of the given dimensions.
    ///
    /// Returns `None` if the box lies entirely outside the image.
    pub fn clamped(&self, image_width: u32, image_height: u32) -> Option<FaceBox> {
        let x0 = self.x.max(0);
        let y0 = self.y.max(0);
        let x1 = self.right().min(image_width as i32);
        let y1 = self.bottom().min(image_height as i32);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(FaceBox::new(x0, y0, (x1 - x0) as u32, (y1 - y0) as u32))
    }
}

/// A single emotion label with its confidence score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EmotionScore {
    /// Emotion label, e.g. "happy"
    pub label: String,
    /// Confidence in [0, 1]
    pub score: f32,
}

/// Ordered mapping of emotion label to confidence score.
///
/// The order is the detector's emission order and is preserved so CSV column
/// ordering stays stable across runs with identical input.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct EmotionScores(Vec<EmotionScore>);

impl EmotionScores {
    /// Build from `(label, score)` pairs, keeping their order.
    pub fn from_pairs<L>(pairs: impl IntoIterator<Item = (L, f32)>) -> Self
    where
        L: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(label, score)| EmotionScore {
                    label: label.into(),
                    score,
                })
                .collect(),
        )
    }

    /// Look up the score for a label.
    pub fn get(&self, label: &str) -> Option<f32> {
        self.0.iter().find(|e| e.label == label).map(|e| e.score)
    }

    /// The top emotion: maximum score, ties broken by the lexicographically
    /// smaller label.
    ///
    /// Returns `None` only for an empty map.
    pub fn top(&self) -> Option<(&str, f32)> {
        let mut best: Option<&EmotionScore> = None;
        for entry in &self.0 {
            best = match best {
                None => Some(entry),
                Some(current) => {
                    if entry.score > current.score
                        || (entry.score == current.score && entry.label < current.label)
                    {
                        Some(entry)
                    } else {
                        Some(current)
                    }
                }
            };
        }
        best.map(|e| (e.label.as_str(), e.score))
    }

    /// Labels in emission order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|e| e.label.as_str())
    }

    /// Entries in emission order.
    pub fn iter(&self) -> impl Iterator<Item = &EmotionScore> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One face found by the detector: where it is and how it scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DetectedFace {
    /// Bounding box in pixel coordinates
    pub bbox: FaceBox,
    /// Per-emotion confidence scores
    pub scores: EmotionScores,
}

impl DetectedFace {
    pub fn new(bbox: FaceBox, scores: EmotionScores) -> Self {
        Self { bbox, scores }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_emotion_is_argmax() {
        let scores = EmotionScores::from_pairs([("happy", 0.9), ("sad", 0.1)]);
        assert_eq!(scores.top(), Some(("happy", 0.9)));
    }

    #[test]
    fn top_emotion_tie_breaks_lexicographically() {
        let scores = EmotionScores::from_pairs([("sad", 0.5), ("angry", 0.5), ("happy", 0.1)]);
        assert_eq!(scores.top(), Some(("angry", 0.5)));

        // Order of insertion must not matter for ties
        let scores = EmotionScores::from_pairs([("angry", 0.5), ("sad", 0.5)]);
        assert_eq!(scores.top(), Some(("angry", 0.5)));
    }

    #[test]
    fn top_emotion_of_empty_map_is_none() {
        assert_eq!(EmotionScores::default().top(), None);
    }

    #[test]
    fn get_returns_score_for_known_label() {
        let scores = EmotionScores::from_pairs([("neutral", 0.3), ("angry", 0.7)]);
        assert_eq!(scores.get("angry"), Some(0.7));
        assert_eq!(scores.get("happy"), None);
    }

    #[test]
    fn labels_preserve_emission_order() {
        let scores = EmotionScores::from_pairs([("sad", 0.2), ("angry", 0.5), ("happy", 0.3)]);
        let labels: Vec<_> = scores.labels().collect();
        assert_eq!(labels, vec!["sad", "angry", "happy"]);
    }

    #[test]
    fn clamped_box_stays_inside_image() {
        let bbox = FaceBox::new(-10, 5, 50, 200);
        let clamped = bbox.clamped(100, 100).unwrap();
        assert_eq!(clamped, FaceBox::new(0, 5, 40, 95));
    }

    #[test]
    fn clamped_box_outside_image_is_none() {
        let bbox = FaceBox::new(200, 200, 10, 10);
        assert!(bbox.clamped(100, 100).is_none());
    }

    #[test]
    fn scores_serialize_as_ordered_list() {
        let scores = EmotionScores::from_pairs([("happy", 0.9), ("sad", 0.1)]);
        let json: serde_json::Value = serde_json::to_value(&scores).unwrap();
        let entries = json.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["label"], "happy");
        assert_eq!(entries[1]["label"], "sad");

        let restored: EmotionScores = serde_json::from_value(json).unwrap();
        assert_eq!(restored, scores);
    }
}
