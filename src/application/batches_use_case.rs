// ============================================================
// BatchesUseCase
// ============================================================
// Drives one split through the same path a training loop uses:
//
//   MomentDataset → DataLoader(MomentBatcher) → prepare_batch_inputs
//
// and logs the tensor shapes of every batch. Useful for checking
// feature directories and label settings before a long run.
//
// Burn's loader ends a pass at the first example that fails to
// load, so a pass that yields fewer examples than expected is an
// error.

use anyhow::{bail, Context, Result};
use burn::{
    data::{dataloader::DataLoaderBuilder, dataset::Dataset},
    prelude::*,
};

use crate::application::config::{PipelineConfig, Split};
use crate::data::{batcher::MomentBatcher, dataset::MomentDataset};
use crate::domain::traits::FeatureSource;
use crate::ml::{inputs::prepare_batch_inputs, PipelineBackend};

/// DataLoader settings for one pass.
#[derive(Debug, Clone)]
pub struct LoaderSettings {
    pub batch_size: usize,
    pub num_workers: usize,
    pub seed: u64,
    /// Stop after this many batches
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchesReport {
    pub batches: usize,
    pub examples: usize,
    /// Batches that came with loss targets
    pub labelled_batches: usize,
}

pub struct BatchesUseCase {
    config: PipelineConfig,
    split: Split,
    limit: Option<usize>,
}

impl BatchesUseCase {
    pub fn new(config: PipelineConfig, split: Split, limit: Option<usize>) -> Self {
        Self { config, split, limit }
    }

    pub fn execute(&self) -> Result<BatchesReport> {
        let cfg = self.config.split(self.split)?;
        let dataset = MomentDataset::open(cfg, self.config.seed)
            .with_context(|| format!("Cannot open split '{}'", cfg.data_path.display()))?;

        let settings = LoaderSettings {
            batch_size: self.config.batch_size,
            num_workers: self.config.num_workers,
            seed: self.config.seed,
            limit: self.limit,
        };
        let device = <PipelineBackend as Backend>::Device::default();
        tracing::info!("Using device: {:?}", device);

        let report = run_batches::<PipelineBackend, _>(dataset, &settings, &device)?;
        tracing::info!(
            "{:?} split: {} batches, {} examples, {} with targets",
            self.split,
            report.batches,
            report.examples,
            report.labelled_batches
        );
        Ok(report)
    }
}

/// Iterate `dataset` through a shuffled DataLoader on `device`.
///
/// Fails if the loader stops before every expected example was
/// batched.
pub fn run_batches<B, F>(
    dataset: MomentDataset<F>,
    settings: &LoaderSettings,
    device: &B::Device,
) -> Result<BatchesReport>
where
    B: Backend,
    F: FeatureSource + 'static,
{
    let mut builder = DataLoaderBuilder::new(MomentBatcher::<B>::new(device.clone()))
        .batch_size(settings.batch_size)
        .shuffle(settings.seed);
    if settings.num_workers > 0 {
        builder = builder.num_workers(settings.num_workers);
    }
    let expected = match settings.limit {
        Some(limit) => dataset.len().min(limit.saturating_mul(settings.batch_size)),
        None => dataset.len(),
    };
    let loader = builder.build(dataset);

    let mut report = BatchesReport::default();
    let limit = settings.limit.unwrap_or(usize::MAX);

    for (i, batch) in loader.iter().take(limit).enumerate() {
        let size = batch.len();
        let (inputs, targets) = prepare_batch_inputs(batch, device);

        tracing::info!(
            "Batch {}: src_txt {:?}, src_vid {:?}, targets {}",
            i,
            inputs.src_txt.dims(),
            inputs.src_vid.dims(),
            targets.is_some()
        );
        if let Some(t) = &targets {
            if let Some(pos) = &t.saliency_pos_labels {
                tracing::debug!("Batch {}: saliency_pos_labels {:?}", i, pos.dims());
            }
        }

        report.batches += 1;
        report.examples += size;
        if targets.is_some() {
            report.labelled_batches += 1;
        }
    }

    if report.examples < expected {
        bail!(
            "Data loader stopped after {} of {} examples; run `inspect` to find the examples that fail to load",
            report.examples,
            expected
        );
    }
    Ok(report)
}
