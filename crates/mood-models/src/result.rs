//! Per-face result rows and the aggregated result table.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::face::{DetectedFace, EmotionScores, FaceBox};

/// One row of the result table: a single detected face.
///
/// Invariant: `emotion` is a key of `scores` and `score` is the maximum value
/// in `scores`. Rows are only built through [`FaceResult::from_face`], which
/// upholds this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FaceResult {
    /// Source image file name
    pub image: String,
    /// Index of the face within its image, in detection order
    pub face_index: usize,
    /// Bounding box in pixel coordinates
    #[serde(flatten)]
    pub bbox: FaceBox,
    /// Top emotion label
    pub emotion: String,
    /// Score of the top emotion
    pub score: f32,
    /// The full emotion score map for this face
    pub scores: EmotionScores,
}

impl FaceResult {
    /// Build a row from a detected face.
    ///
    /// Returns `None` when the face carries an empty score map (there is no
    /// top emotion to record).
    pub fn from_face(image: impl Into<String>, face_index: usize, face: &DetectedFace) -> Option<Self> {
        let (emotion, score) = face.scores.top()?;
        Some(Self {
            image: image.into(),
            face_index,
            bbox: face.bbox,
            emotion: emotion.to_string(),
            score,
            scores: face.scores.clone(),
        })
    }
}

/// Ordered collection of [`FaceResult`] rows.
///
/// Insertion order is image upload order, then face detection order within an
/// image. The empty table is a valid terminal state ("no faces detected").
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ResultTable {
    rows: Vec<FaceResult>,
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one row.
    pub fn push(&mut self, row: FaceResult) {
        self.rows.push(row);
    }

    /// Append all rows of one image, preserving their order.
    pub fn extend(&mut self, rows: impl IntoIterator<Item = FaceResult>) {
        self.rows.extend(rows);
    }

    pub fn rows(&self) -> &[FaceResult] {
        &self.rows
    }

    pub fn iter(&self) -> impl Iterator<Item = &FaceResult> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct emotion labels across all rows, ordered by first appearance.
    ///
    /// This is the column ordering rule for the CSV export: it keeps output
    /// stable across runs with identical input.
    pub fn emotion_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();
        for row in &self.rows {
            for label in row.scores.labels() {
                if !columns.iter().any(|c| c == label) {
                    columns.push(label.to_string());
                }
            }
        }
        columns
    }
}

impl FromIterator<FaceResult> for ResultTable {
    fn from_iter<T: IntoIterator<Item = FaceResult>>(iter: T) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::face::EmotionScores;

    fn face(scores: EmotionScores) -> DetectedFace {
        DetectedFace::new(FaceBox::new(10, 20, 30, 40), scores)
    }

    #[test]
    fn from_face_records_the_top_emotion() {
        let f = face(EmotionScores::from_pairs([("happy", 0.9), ("sad", 0.1)]));
        let row = FaceResult::from_face("a.jpg", 0, &f).unwrap();
        assert_eq!(row.emotion, "happy");
        assert_eq!(row.score, 0.9);
        // The recorded top emotion is always a key of the score map, at its max
        assert_eq!(row.scores.get(&row.emotion), Some(row.score));
    }

    #[test]
    fn from_face_rejects_empty_scores() {
        let f = face(EmotionScores::default());
        assert!(FaceResult::from_face("a.jpg", 0, &f).is_none());
    }

    #[test]
    fn aggregation_preserves_image_then_detection_order() {
        let mut table = ResultTable::new();
        let f1 = face(EmotionScores::from_pairs([("happy", 0.9)]));
        let f2 = face(EmotionScores::from_pairs([("sad", 0.8)]));
        let f3 = face(EmotionScores::from_pairs([("angry", 0.7)]));

        table.extend([
            FaceResult::from_face("a.jpg", 0, &f1).unwrap(),
            FaceResult::from_face("a.jpg", 1, &f2).unwrap(),
        ]);
        table.extend([FaceResult::from_face("b.jpg", 0, &f3).unwrap()]);

        let order: Vec<_> = table.iter().map(|r| (r.image.as_str(), r.face_index)).collect();
        assert_eq!(order, vec![("a.jpg", 0), ("a.jpg", 1), ("b.jpg", 0)]);
    }

    #[test]
    fn emotion_columns_are_first_appearance_union() {
        let mut table = ResultTable::new();
        let f1 = face(EmotionScores::from_pairs([("happy", 0.9), ("sad", 0.1)]));
        let f2 = face(EmotionScores::from_pairs([("angry", 0.7), ("neutral", 0.3)]));
        table.push(FaceResult::from_face("a.jpg", 0, &f1).unwrap());
        table.push(FaceResult::from_face("a.jpg", 1, &f2).unwrap());

        assert_eq!(table.emotion_columns(), vec!["happy", "sad", "angry", "neutral"]);
    }

    #[test]
    fn empty_table_has_no_columns_and_no_rows() {
        let table = ResultTable::new();
        assert!(table.is_empty());
        assert!(table.emotion_columns().is_empty());
    }
}
