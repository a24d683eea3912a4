// ============================================================
// Sequence Padding
// ============================================================
// Pads variable-length sequences into rectangular arrays with a
// float mask (1.0 = real step, 0.0 = padding).
//
//   [(3, D), (5, D), (2, D)]  →  data (3, 5, D), mask (3, 5)
//
// Kept free of burn so the padding rules can be tested without a
// backend; data::batcher turns the results into tensors.

use ndarray::{s, Array2, Array3};

use crate::error::{PipelineError, Result};

/// Pad (L_i, D) matrices to (B, max L_i, D).
///
/// Every sequence must have the same feature width. An empty
/// batch yields zero-sized arrays.
pub fn pad_sequences_2d(seqs: &[&Array2<f32>]) -> Result<(Array3<f32>, Array2<f32>)> {
    let max_len = seqs.iter().map(|a| a.nrows()).max().unwrap_or(0);
    let dim = seqs.first().map_or(0, |a| a.ncols());

    let mut data = Array3::<f32>::zeros((seqs.len(), max_len, dim));
    let mut mask = Array2::<f32>::zeros((seqs.len(), max_len));

    for (i, seq) in seqs.iter().enumerate() {
        if seq.ncols() != dim {
            return Err(PipelineError::WidthMismatch {
                expected: dim,
                got: seq.ncols(),
            });
        }
        let len = seq.nrows();
        data.slice_mut(s![i, ..len, ..]).assign(*seq);
        mask.slice_mut(s![i, ..len]).fill(1.0);
    }

    Ok((data, mask))
}

/// Pad 1-D sequences to (B, max L_i).
pub fn pad_sequences_1d(seqs: &[&[f32]]) -> (Array2<f32>, Array2<f32>) {
    let max_len = seqs.iter().map(|s| s.len()).max().unwrap_or(0);

    let mut data = Array2::<f32>::zeros((seqs.len(), max_len));
    let mut mask = Array2::<f32>::zeros((seqs.len(), max_len));

    for (i, seq) in seqs.iter().enumerate() {
        for (j, &v) in seq.iter().enumerate() {
            data[[i, j]] = v;
            mask[[i, j]] = 1.0;
        }
    }

    (data, mask)
}
