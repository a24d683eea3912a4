// ============================================================
// Pipeline Errors
// ============================================================
// Every fallible step in the data pipeline reports through
// PipelineError. Variants carry the path or qid involved so a
// failed example can be traced back to the file on disk.
//
// The CLI and use cases wrap these in anyhow with extra context.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("cannot read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed annotation at {path}:{line}: {source}")]
    Annotation {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot read npy '{path}': {source}")]
    Npy {
        path: PathBuf,
        #[source]
        source: ndarray_npy::ReadNpyError,
    },

    #[error("cannot read npz '{path}': {source}")]
    Npz {
        path: PathBuf,
        #[source]
        source: ndarray_npy::ReadNpzError,
    },

    #[error("array '{key}' not found in '{path}'")]
    MissingArray { path: PathBuf, key: String },

    #[error("expected a 1-D or 2-D feature array in '{path}', got {ndim} dimensions")]
    UnsupportedRank { path: PathBuf, ndim: usize },

    #[error("feature width mismatch: expected {expected}, got {got}")]
    WidthMismatch { expected: usize, got: usize },

    #[error("saliency index lists differ in length within a batch: {expected} vs {got}")]
    RaggedSaliency { expected: usize, got: usize },

    #[error("no frames left for video '{vid}' after aligning feature directories")]
    EmptyVideo { vid: String },

    #[error("annotation {qid} has no '{field}'")]
    MissingField { qid: String, field: &'static str },

    #[error("invalid GloVe file '{path}' at line {line}: {reason}")]
    Glove {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
}
