// ============================================================
// InspectUseCase
// ============================================================
// Opens one split and loads every example once, the same way
// the DataLoader would, then reports what it found:
//
//   Step 1: Pick the split from the pipeline config
//   Step 2: Open the dataset (annotations + feature source)
//   Step 3: Load each example, counting failures
//   Step 4: Summarise lengths and window counts

use anyhow::{Context, Result};

use crate::application::config::{PipelineConfig, Split};
use crate::data::dataset::MomentDataset;
use crate::domain::traits::FeatureSource;

/// Summary of one pass over a split.
#[derive(Debug, Clone, PartialEq)]
pub struct InspectReport {
    pub loaded: usize,
    pub failed: usize,
    /// Mean number of video rows (clips) over loaded examples
    pub mean_video_len: f64,
    /// Mean number of ground-truth windows over loaded examples
    pub mean_windows: f64,
}

pub struct InspectUseCase {
    config: PipelineConfig,
    split: Split,
}

impl InspectUseCase {
    pub fn new(config: PipelineConfig, split: Split) -> Self {
        Self { config, split }
    }

    pub fn execute(&self) -> Result<InspectReport> {
        let cfg = self.config.split(self.split)?;
        let dataset = MomentDataset::open(cfg, self.config.seed)
            .with_context(|| format!("Cannot open split '{}'", cfg.data_path.display()))?;

        let report = summarize(&dataset);
        tracing::info!(
            "{:?} split: {} loaded, {} failed, mean video length {:.1}, mean windows {:.2}",
            self.split,
            report.loaded,
            report.failed,
            report.mean_video_len,
            report.mean_windows
        );
        Ok(report)
    }
}

/// Load every example of `dataset` and collect counts.
pub fn summarize<F: FeatureSource>(dataset: &MomentDataset<F>) -> InspectReport {
    let mut loaded = 0usize;
    let mut failed = 0usize;
    let mut video_rows = 0usize;
    let mut windows = 0usize;

    for index in 0..dataset.records().len() {
        match dataset.load_item(index) {
            Ok(item) => {
                loaded += 1;
                video_rows += item.video_feat.nrows();
                windows += item.meta.window_count();
            }
            Err(e) => {
                failed += 1;
                tracing::warn!("Example {} (qid {}) failed: {}", index, dataset.records()[index].qid, e);
            }
        }
    }

    let mean = |total: usize| if loaded > 0 { total as f64 / loaded as f64 } else { 0.0 };
    InspectReport {
        loaded,
        failed,
        mean_video_len: mean(video_rows),
        mean_windows: mean(windows),
    }
}
