// ============================================================
// Annotation Record
// ============================================================
// One line of a JSONL annotation file, e.g.
//
//   {
//     "qid": 7803,
//     "query": "Man in gray top walks from outside to inside.",
//     "duration": 150,
//     "vid": "RoripwjYFp8_360.0_510.0",
//     "relevant_clip_ids": [13, 14, 15, 16, 17],
//     "relevant_windows": [[26, 36]],
//     "saliency_scores": [[4, 4, 2], [3, 4, 2], ...]
//   }
//
// Test splits omit the label fields. TVSum and YouTube Highlights
// records carry a per-clip `label` matrix and a `domain` instead.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Query identifier. Most datasets use integers, TVSum and
/// YouTube Highlights use strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Qid {
    Int(i64),
    Str(String),
}

impl fmt::Display for Qid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Qid::Int(n) => write!(f, "{n}"),
            Qid::Str(s) => f.write_str(s),
        }
    }
}

/// A single annotated (query, video) example.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    pub qid: Qid,

    #[serde(default)]
    pub query: String,

    pub vid: String,

    /// Video duration in seconds
    #[serde(default)]
    pub duration: Option<f64>,

    /// Ground-truth windows as [start, end] in seconds
    #[serde(default)]
    pub relevant_windows: Option<Vec<[f64; 2]>>,

    #[serde(default)]
    pub relevant_clip_ids: Option<Vec<usize>>,

    /// One row of annotator scores per relevant clip
    #[serde(default)]
    pub saliency_scores: Option<Vec<Vec<f64>>>,

    /// Per-clip annotator matrix (TVSum: 20 columns, YouTube: 1)
    #[serde(default)]
    pub label: Option<Vec<Vec<f64>>>,

    #[serde(default)]
    pub domain: Option<String>,
}

impl AnnotationRecord {
    /// Number of ground-truth windows, zero for unlabelled records
    pub fn window_count(&self) -> usize {
        self.relevant_windows.as_ref().map_or(0, Vec::len)
    }
}
