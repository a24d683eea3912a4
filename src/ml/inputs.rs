// ============================================================
// Model Inputs
// ============================================================
// Moves a collated batch onto the training device and splits it
// into what the model's forward pass takes (ModelInputs) and what
// the loss takes (Targets).

use burn::prelude::*;

use crate::data::batcher::{MomentBatch, SpanTarget};
use crate::domain::annotation::Qid;

/// Named forward-pass inputs.
#[derive(Debug, Clone)]
pub struct ModelInputs<B: Backend> {
    /// [batch, Lq, Dq]
    pub src_txt: Tensor<B, 3>,
    /// [batch, Lq]
    pub src_txt_mask: Tensor<B, 2>,
    /// [batch, Lv, Dv]
    pub src_vid: Tensor<B, 3>,
    /// [batch, Lv]
    pub src_vid_mask: Tensor<B, 2>,
    pub vid: Vec<String>,
    pub qid: Vec<Qid>,
}

/// Supervision for the loss. Fields are absent for unlabelled batches.
#[derive(Debug, Clone)]
pub struct Targets<B: Backend> {
    pub span_labels: Option<Vec<SpanTarget<B>>>,
    pub saliency_pos_labels: Option<Tensor<B, 2, Int>>,
    pub saliency_neg_labels: Option<Tensor<B, 2, Int>>,
    pub saliency_all_labels: Option<Tensor<B, 2>>,
    /// Same scores as `saliency_all_labels`, under the name the
    /// clip-relevance loss reads.
    pub relevant_clips: Option<Tensor<B, 2>>,
}

impl<B: Backend> Targets<B> {
    fn is_empty(&self) -> bool {
        self.span_labels.is_none()
            && self.saliency_pos_labels.is_none()
            && self.saliency_neg_labels.is_none()
            && self.saliency_all_labels.is_none()
    }
}

/// Move `batch` to `device` and reshape it into model inputs and
/// targets. Returns `None` targets when the batch has no labels.
pub fn prepare_batch_inputs<B: Backend>(
    batch: MomentBatch<B>,
    device: &B::Device,
) -> (ModelInputs<B>, Option<Targets<B>>) {
    let inputs = ModelInputs {
        src_txt: batch.query_feat.data.to_device(device),
        src_txt_mask: batch.query_feat.mask.to_device(device),
        src_vid: batch.video_feat.data.to_device(device),
        src_vid_mask: batch.video_feat.mask.to_device(device),
        vid: batch.vid,
        qid: batch.qid,
    };

    let saliency_all_labels = batch.saliency_all_labels.map(|t| t.to_device(device));
    let targets = Targets {
        span_labels: batch
            .span_labels
            .map(|spans| spans.into_iter().map(|s| s.to_device(device)).collect()),
        saliency_pos_labels: batch.saliency_pos_labels.map(|t| t.to_device(device)),
        saliency_neg_labels: batch.saliency_neg_labels.map(|t| t.to_device(device)),
        relevant_clips: saliency_all_labels.clone(),
        saliency_all_labels,
    };

    let targets = if targets.is_empty() { None } else { Some(targets) };
    (inputs, targets)
}
