// ============================================================
// Moment Batcher
// ============================================================
// Implements Burn's Batcher trait to turn a Vec<MomentItem> into
// device tensors.
//
// Per-field rules:
//   query_feat / video_feat   padded [B, L, D] + float mask [B, L]
//   span_labels               kept per example ([W, 2] each)
//   saliency_pos/neg_labels   stacked [B, K] int
//   saliency_all_labels       padded [B, L], mask dropped
//   qid / vid / meta          plain lists
//
// A label field is only batched when every example carries it.
// Saliency index lists of different lengths are a collate error.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
    tensor::TensorData,
};

use crate::data::{
    collate::{pad_sequences_1d, pad_sequences_2d},
    dataset::MomentItem,
};
use crate::domain::annotation::{AnnotationRecord, Qid};
use crate::domain::labels::{ExampleLabels, SpanLabels};
use crate::error::{PipelineError, Result};

// ─── Batch types ──────────────────────────────────────────────────────────────

/// Padded sequence features plus their validity mask.
#[derive(Debug, Clone)]
pub struct PaddedFeatures<B: Backend> {
    /// [batch, max_len, dim]
    pub data: Tensor<B, 3>,
    /// [batch, max_len], 1.0 on real steps
    pub mask: Tensor<B, 2>,
}

/// One example's windows, in whichever encoding the span loss uses.
#[derive(Debug, Clone)]
pub enum SpanTarget<B: Backend> {
    /// [W, 2] normalised center/width
    Cxw(Tensor<B, 2>),
    /// [W, 2] inclusive clip indices
    ClipIndices(Tensor<B, 2, Int>),
}

impl<B: Backend> SpanTarget<B> {
    pub fn to_device(self, device: &B::Device) -> Self {
        match self {
            SpanTarget::Cxw(t) => SpanTarget::Cxw(t.to_device(device)),
            SpanTarget::ClipIndices(t) => SpanTarget::ClipIndices(t.to_device(device)),
        }
    }

    pub fn num_windows(&self) -> usize {
        match self {
            SpanTarget::Cxw(t) => t.dims()[0],
            SpanTarget::ClipIndices(t) => t.dims()[0],
        }
    }
}

#[derive(Debug, Clone)]
pub struct MomentBatch<B: Backend> {
    pub meta: Vec<AnnotationRecord>,
    pub query_feat: PaddedFeatures<B>,
    pub video_feat: PaddedFeatures<B>,
    pub span_labels: Option<Vec<SpanTarget<B>>>,
    /// [batch, K]
    pub saliency_pos_labels: Option<Tensor<B, 2, Int>>,
    /// [batch, K]
    pub saliency_neg_labels: Option<Tensor<B, 2, Int>>,
    /// [batch, max_len]
    pub saliency_all_labels: Option<Tensor<B, 2>>,
    pub relevant_clip_ids: Option<Vec<Vec<usize>>>,
    pub qid: Vec<Qid>,
    pub vid: Vec<String>,
}

impl<B: Backend> MomentBatch<B> {
    pub fn len(&self) -> usize {
        self.meta.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meta.is_empty()
    }
}

// ─── MomentBatcher ────────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct MomentBatcher<B: Backend> {
    /// Where collated tensors are created
    pub device: B::Device,
}

impl<B: Backend> MomentBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    /// Collate a list of examples, failing on ragged feature widths.
    pub fn collate(&self, items: Vec<MomentItem>) -> Result<MomentBatch<B>> {
        let query_feat = self.padded(items.iter().map(|i| &i.query_feat).collect())?;
        let video_feat = self.padded(items.iter().map(|i| &i.video_feat).collect())?;

        let all_labels: Option<Vec<&ExampleLabels>> =
            items.iter().map(|i| i.labels.as_ref()).collect();

        let (span_labels, pos, neg, scores) = match all_labels {
            Some(labels) => {
                let spans = labels.iter().map(|l| self.span_target(&l.spans)).collect();
                let pos = self.stack_indices(labels.iter().map(|l| l.saliency.pos.as_slice()).collect())?;
                let neg = self.stack_indices(labels.iter().map(|l| l.saliency.neg.as_slice()).collect())?;
                let scores: Vec<&[f32]> = labels.iter().map(|l| l.saliency.scores.as_slice()).collect();
                let (padded, _mask) = pad_sequences_1d(&scores);
                (Some(spans), Some(pos), Some(neg), Some(self.float2(padded)))
            }
            None => (None, None, None, None),
        };

        let relevant_clip_ids = items.iter().map(|i| i.relevant_clip_ids.clone()).collect();
        let qid = items.iter().map(|i| i.meta.qid.clone()).collect();
        let vid = items.iter().map(|i| i.meta.vid.clone()).collect();
        let meta = items.into_iter().map(|i| i.meta).collect();

        Ok(MomentBatch {
            meta,
            query_feat,
            video_feat,
            span_labels,
            saliency_pos_labels: pos,
            saliency_neg_labels: neg,
            saliency_all_labels: scores,
            relevant_clip_ids,
            qid,
            vid,
        })
    }

    fn padded(&self, seqs: Vec<&ndarray::Array2<f32>>) -> Result<PaddedFeatures<B>> {
        let (data, mask) = pad_sequences_2d(&seqs)?;
        let (b, l, d) = data.dim();
        let data = TensorData::new(data.iter().copied().collect::<Vec<f32>>(), [b, l, d]);
        Ok(PaddedFeatures {
            data: Tensor::from_data(data, &self.device),
            mask: self.float2(mask),
        })
    }

    fn float2(&self, a: ndarray::Array2<f32>) -> Tensor<B, 2> {
        let (r, c) = a.dim();
        let data = TensorData::new(a.iter().copied().collect::<Vec<f32>>(), [r, c]);
        Tensor::from_data(data, &self.device)
    }

    fn span_target(&self, spans: &SpanLabels) -> SpanTarget<B> {
        match spans {
            SpanLabels::Cxw(a) => SpanTarget::Cxw(self.float2(a.clone())),
            SpanLabels::ClipIndices(idx) => {
                let flat: Vec<i64> = idx.iter().flatten().copied().collect();
                let data = TensorData::new(flat, [idx.len(), 2]);
                SpanTarget::ClipIndices(Tensor::from_data(data, &self.device))
            }
        }
    }

    /// Stack index lists into [B, K]. Every list must have the same length.
    fn stack_indices(&self, rows: Vec<&[usize]>) -> Result<Tensor<B, 2, Int>> {
        let k = rows.first().map_or(0, |r| r.len());
        if let Some(r) = rows.iter().find(|r| r.len() != k) {
            return Err(PipelineError::RaggedSaliency {
                expected: k,
                got: r.len(),
            });
        }
        let flat: Vec<i64> = rows.iter().flat_map(|r| r.iter().map(|&i| i as i64)).collect();
        Ok(Tensor::from_data(TensorData::new(flat, [rows.len(), k]), &self.device))
    }
}

// ─── Burn Batcher Trait Implementation ────────────────────────────────────────
impl<B: Backend> Batcher<MomentItem, MomentBatch<B>> for MomentBatcher<B> {
    fn batch(&self, items: Vec<MomentItem>) -> MomentBatch<B> {
        // Batcher::batch cannot fail; ragged widths or saliency lists
        // mean the inputs are misconfigured.
        self.collate(items)
            .unwrap_or_else(|e| panic!("cannot collate batch: {e}"))
    }
}
