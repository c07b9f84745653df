//! Emotion frequency summary over a result table.

use std::collections::HashMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::result::ResultTable;

/// One summary entry: an emotion label and its occurrence count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EmotionCount {
    pub label: String,
    pub count: usize,
}

/// Emotion-label frequency counts across a whole result table.
///
/// Entries are ordered by descending count, ties broken by ascending label,
/// so the summary is deterministic for a fixed table. Labels absent from the
/// table are absent from the summary.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct EmotionSummary {
    entries: Vec<EmotionCount>,
}

impl EmotionSummary {
    /// Count top-emotion occurrences over the table.
    pub fn from_table(table: &ResultTable) -> Self {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for row in table.iter() {
            *counts.entry(row.emotion.as_str()).or_insert(0) += 1;
        }

        let mut entries: Vec<EmotionCount> = counts
            .into_iter()
            .map(|(label, count)| EmotionCount {
                label: label.to_string(),
                count,
            })
            .collect();
        entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));

        Self { entries }
    }

    pub fn entries(&self) -> &[EmotionCount] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &EmotionCount> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all counts. Equals the row count of the source table.
    pub fn total(&self) -> usize {
        self.entries.iter().map(|e| e.count).sum()
    }
}
