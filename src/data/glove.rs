// ============================================================
// GloVe Query Embeddings
// ============================================================
// Some baselines embed the raw query words with pretrained GloVe
// vectors instead of reading per-query feature files.
//
// File format (glove.6B.300d.txt):
//   the 0.04656 0.21318 -0.0074364 ...
//   ,   -0.25539 -0.25723 0.13169 ...
//
// Unknown words map to an extra all-zero <unk> row appended after
// the last vocabulary entry.

use std::{
    collections::HashMap,
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use ndarray::{Array2, Axis};

use crate::data::features::NpyFeatureStore;
use crate::domain::annotation::AnnotationRecord;
use crate::domain::traits::FeatureSource;
use crate::error::{PipelineError, Result};

pub struct GloveVocab {
    index: HashMap<String, usize>,
    /// (vocab_size + 1, dim); the last row is <unk>
    vectors: Array2<f32>,
}

impl GloveVocab {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut index = HashMap::new();
        let mut flat: Vec<f32> = Vec::new();
        let mut dim: Option<usize> = None;

        for (i, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|source| PipelineError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            let glove_err = |reason: String| PipelineError::Glove {
                path: path.to_path_buf(),
                line: i + 1,
                reason,
            };

            let mut parts = line.split_whitespace();
            let Some(word) = parts.next() else { continue };
            let values = parts
                .map(str::parse::<f32>)
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| glove_err(e.to_string()))?;

            match dim {
                None => dim = Some(values.len()),
                Some(d) if d != values.len() => {
                    return Err(glove_err(format!("expected {d} values, got {}", values.len())))
                }
                Some(_) => {}
            }
            // First occurrence wins, matching the row order on disk
            if index.contains_key(word) {
                continue;
            }
            index.insert(word.to_string(), index.len());
            flat.extend(values);
        }

        let dim = dim.unwrap_or(0);
        let rows = index.len();
        flat.extend(std::iter::repeat(0.0).take(dim));
        let vectors = Array2::from_shape_vec((rows + 1, dim), flat)?;

        tracing::info!("Loaded {} GloVe vectors of dim {} from '{}'", rows, dim, path.display());
        Ok(Self { index, vectors })
    }

    pub fn dim(&self) -> usize {
        self.vectors.ncols()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn unk_index(&self) -> usize {
        self.index.len()
    }

    /// Embed a whitespace-tokenised, lower-cased query as (words, dim).
    pub fn embed(&self, query: &str) -> Array2<f32> {
        let ids: Vec<usize> = query
            .split_whitespace()
            .map(|w| {
                self.index
                    .get(&w.to_lowercase())
                    .copied()
                    .unwrap_or_else(|| self.unk_index())
            })
            .collect();
        self.vectors.select(Axis(0), &ids)
    }
}

// ─── GloveFeatures ────────────────────────────────────────────────────────────
/// GloVe for the query, numpy files for the video.
pub struct GloveFeatures {
    vocab: GloveVocab,
    video: NpyFeatureStore,
}

impl GloveFeatures {
    pub fn new(vocab: GloveVocab, video: NpyFeatureStore) -> Self {
        Self { vocab, video }
    }
}

impl FeatureSource for GloveFeatures {
    fn query_features(&self, record: &AnnotationRecord) -> Result<Array2<f32>> {
        Ok(self.vocab.embed(&record.query))
    }

    fn video_features(&self, vid: &str) -> Result<Array2<f32>> {
        self.video.video_features(vid)
    }
}
