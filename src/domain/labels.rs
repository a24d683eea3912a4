// ============================================================
// Label Types
// ============================================================
// Supervision derived from an annotation record. Nothing here is
// stored on disk; labels are rebuilt every time an example is
// loaded because the saliency sampling is random.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// How windows are encoded for the span loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpanLossType {
    /// Normalised [center, width]
    #[default]
    L1,
    /// Inclusive [start_clip, end_clip]
    Ce,
}

/// Ground-truth windows for one example.
#[derive(Debug, Clone, PartialEq)]
pub enum SpanLabels {
    /// Shape (#windows, 2), rows are [center, width] in [0, 1]
    Cxw(Array2<f32>),
    /// Inclusive clip index pairs
    ClipIndices(Vec<[i64; 2]>),
}

impl SpanLabels {
    /// Placeholder used by highlight-only datasets
    pub fn empty_window() -> Self {
        SpanLabels::Cxw(Array2::zeros((1, 2)))
    }

    pub fn len(&self) -> usize {
        match self {
            SpanLabels::Cxw(a) => a.nrows(),
            SpanLabels::ClipIndices(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Positive/negative clip indices plus a score for every clip.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SaliencyLabels {
    pub pos: Vec<usize>,
    pub neg: Vec<usize>,
    pub scores: Vec<f32>,
}

/// Every label attached to one example.
#[derive(Debug, Clone, PartialEq)]
pub struct ExampleLabels {
    pub spans: SpanLabels,
    pub saliency: SaliencyLabels,
}
