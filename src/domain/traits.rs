// ============================================================
// Core Traits
// ============================================================
// The dataset only sees FeatureSource, so on-disk numpy features
// and in-memory fixtures are interchangeable.
//
// Implementations:
//   - NpyFeatureStore → .npy / .npz files under feature directories
//   - GloveFeatures   → word vectors for the query, video from disk

use ndarray::Array2;

use crate::domain::annotation::AnnotationRecord;
use crate::error::Result;

// ─── FeatureSource ────────────────────────────────────────────────────────────
/// Anything that can produce precomputed features for an example.
pub trait FeatureSource: Send + Sync {
    /// Query features, shape (Lq, Dq). Pooled features come back as (1, Dq).
    fn query_features(&self, record: &AnnotationRecord) -> Result<Array2<f32>>;

    /// Video features, shape (Lv, Dv), already truncated and normalised.
    fn video_features(&self, vid: &str) -> Result<Array2<f32>>;
}
