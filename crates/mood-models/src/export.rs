//! CSV export of the result table.
//!
//! Columns are `image,face_index,x,y,w,h,emotion` followed by one column per
//! distinct emotion label present in the data, ordered by first appearance.
//! Output is byte-for-byte reproducible for a given table.

use thiserror::Error;

use crate::face::{EmotionScores, FaceBox};
use crate::result::{FaceResult, ResultTable};

/// Download file name offered to the user.
pub const EXPORT_FILE_NAME: &str = "emotion_detection_results.csv";

/// MIME type of the export.
pub const EXPORT_MIME: &str = "text/csv";

/// The fixed leading columns, before the dynamic per-label columns.
const FIXED_COLUMNS: [&str; 7] = ["image", "face_index", "x", "y", "w", "h", "emotion"];

/// Errors from CSV serialization and parsing.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("export is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("missing column: {0}")]
    MissingColumn(String),

    #[error("malformed row: {0}")]
    MalformedRow(String),
}

/// Serialize the table to CSV.
///
/// An empty table serializes to the header row alone, with just the fixed
/// columns. Scores use Rust's shortest round-trip float formatting, so equal
/// tables always produce identical bytes.
pub fn write_csv(table: &ResultTable) -> Result<String, ExportError> {
    let emotion_columns = table.emotion_columns();

    let mut writer = csv::Writer::from_writer(Vec::new());

    let header: Vec<&str> = FIXED_COLUMNS
        .iter()
        .copied()
        .chain(emotion_columns.iter().map(String::as_str))
        .collect();
    writer.write_record(&header)?;

    for row in table.iter() {
        let mut record: Vec<String> = vec![
            row.image.clone(),
            row.face_index.to_string(),
            row.bbox.x.to_string(),
            row.bbox.y.to_string(),
            row.bbox.w.to_string(),
            row.bbox.h.to_string(),
            row.emotion.clone(),
        ];
        for label in &emotion_columns {
            record.push(match row.scores.get(label) {
                Some(score) => format!("{}", score),
                None => String::new(),
            });
        }
        writer.write_record(&record)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::MalformedRow(e.to_string()))?;
    Ok(String::from_utf8(bytes)?)
}

/// Parse a CSV export back into a table.
///
/// Per-row score maps come back in header-column order; values equal the
/// originals per declared column.
pub fn parse_csv(data: &str) -> Result<ResultTable, ExportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(data.as_bytes());

    let headers = reader.headers()?.clone();
    for (idx, expected) in FIXED_COLUMNS.iter().enumerate() {
        match headers.get(idx) {
            Some(actual) if actual == *expected => {}
            _ => return Err(ExportError::MissingColumn(expected.to_string())),
        }
    }
    let emotion_columns: Vec<String> = headers
        .iter()
        .skip(FIXED_COLUMNS.len())
        .map(str::to_string)
        .collect();

    let mut table = ResultTable::new();
    for record in reader.records() {
        let record = record?;
        let field = |idx: usize| -> Result<&str, ExportError> {
            record
                .get(idx)
                .ok_or_else(|| ExportError::MalformedRow(format!("missing field {}", idx)))
        };
        let parse_int = |idx: usize| -> Result<i64, ExportError> {
            field(idx)?
                .parse()
                .map_err(|_| ExportError::MalformedRow(format!("bad integer in field {}", idx)))
        };

        let image = field(0)?.to_string();
        let face_index = parse_int(1)? as usize;
        let bbox = FaceBox::new(
            parse_int(2)? as i32,
            parse_int(3)? as i32,
            parse_int(4)? as u32,
            parse_int(5)? as u32,
        );
        let emotion = field(6)?.to_string();

        let mut pairs: Vec<(String, f32)> = Vec::new();
        for (offset, label) in emotion_columns.iter().enumerate() {
            let cell = field(FIXED_COLUMNS.len() + offset)?;
            if cell.is_empty() {
                continue;
            }
            let score: f32 = cell
                .parse()
                .map_err(|_| ExportError::MalformedRow(format!("bad score for {}", label)))?;
            pairs.push((label.clone(), score));
        }
        let scores = EmotionScores::from_pairs(pairs);

        let score = scores
            .get(&emotion)
            .ok_or_else(|| ExportError::MalformedRow(format!("emotion {} has no score", emotion)))?;

        table.push(FaceResult {
            image,
            face_index,
            bbox,
            emotion,
            score,
            scores,
        });
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::face::DetectedFace;

    fn row(image: &str, index: usize, bbox: FaceBox, pairs: &[(&str, f32)]) -> FaceResult {
        let face = DetectedFace::new(bbox, EmotionScores::from_pairs(pairs.iter().map(|&(l, s)| (l, s))));
        FaceResult::from_face(image, index, &face).unwrap()
    }

    fn two_face_table() -> ResultTable {
        [
            row("photo.jpg", 0, FaceBox::new(10, 20, 30, 40), &[("happy", 0.9), ("sad", 0.1)]),
            row("photo.jpg", 1, FaceBox::new(50, 60, 70, 80), &[("angry", 0.7), ("neutral", 0.3)]),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn header_lists_fixed_then_first_appearance_columns() {
        let csv = write_csv(&two_face_table()).unwrap();
        let header = csv.lines().next().unwrap();
        assert_eq!(header, "image,face_index,x,y,w,h,emotion,happy,sad,angry,neutral");
        // Header plus one line per face
        assert_eq!(csv.lines().count(), 3);
    }

    #[test]
    fn empty_table_exports_header_only() {
        let csv = write_csv(&ResultTable::new()).unwrap();
        assert_eq!(csv.trim_end(), "image,face_index,x,y,w,h,emotion");
    }

    #[test]
    fn round_trip_preserves_rows_per_declared_column() {
        let table = two_face_table();
        let csv = write_csv(&table).unwrap();
        let parsed = parse_csv(&csv).unwrap();

        assert_eq!(parsed.len(), table.len());
        for (original, restored) in table.iter().zip(parsed.iter()) {
            assert_eq!(restored.image, original.image);
            assert_eq!(restored.face_index, original.face_index);
            assert_eq!(restored.bbox, original.bbox);
            assert_eq!(restored.emotion, original.emotion);
            assert_eq!(restored.score, original.score);
            for label in original.scores.labels() {
                assert_eq!(restored.scores.get(label), original.scores.get(label));
            }
        }
    }

    #[test]
    fn round_trip_of_empty_table() {
        let csv = write_csv(&ResultTable::new()).unwrap();
        let parsed = parse_csv(&csv).unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn export_is_reproducible() {
        let table = two_face_table();
        assert_eq!(write_csv(&table).unwrap(), write_csv(&table).unwrap());
    }

    #[test]
    fn file_names_with_commas_are_quoted() {
        let table: ResultTable = [row(
            "holiday, beach.jpg",
            0,
            FaceBox::new(0, 0, 5, 5),
            &[("happy", 1.0)],
        )]
        .into_iter()
        .collect();

        let csv = write_csv(&table).unwrap();
        assert!(csv.contains("\"holiday, beach.jpg\""));

        let parsed = parse_csv(&csv).unwrap();
        assert_eq!(parsed.rows()[0].image, "holiday, beach.jpg");
    }

    #[test]
    fn missing_fixed_column_is_rejected() {
        let err = parse_csv("image,face_index,x\n").unwrap_err();
        assert!(matches!(err, ExportError::MissingColumn(_)));
    }

    #[test]
    fn rows_without_their_emotion_score_are_rejected() {
        let data = "image,face_index,x,y,w,h,emotion,happy\na.jpg,0,1,2,3,4,sad,0.9\n";
        let err = parse_csv(data).unwrap_err();
        assert!(matches!(err, ExportError::MalformedRow(_)));
    }
}
