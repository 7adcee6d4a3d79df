//! Concrete record types, one set per store, sharing the line-delimited
//! JSON serializer in [`crate::store`].

use serde::{Deserialize, Serialize};

/// A symbolic sequence as read from FASTA or a symbolic JSONL file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolRecord {
    pub id: String,
    pub seq: String,
}

/// One round of the per-sequence exclusion loop: the round's best score and
/// the consecutive-window runs `(start, length)` that attained it. A `None`
/// score means no window remained in any gap and the sequence is exhausted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterRound {
    pub score: Option<f64>,
    pub windows: Vec<(usize, usize)>,
}

/// A numeric sequence together with the rounds already searched on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericRecord {
    pub id: String,
    pub seq: Vec<f64>,
    #[serde(default)]
    pub iter_results: Vec<IterRound>,
}

impl NumericRecord {
    pub fn new(id: impl Into<String>, seq: Vec<f64>) -> Self {
        Self {
            id: id.into(),
            seq,
            iter_results: Vec::new(),
        }
    }
}

/// One selected consecutive-window run. `end_idx` is the inclusive last
/// covered position: `start_idx + consecutive_window_length + window - 2`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedWindow {
    pub seq_id: String,
    pub start_idx: usize,
    pub end_idx: usize,
    pub consecutive_window_length: usize,
    pub score: f64,
    pub score_diff: f64,
}
