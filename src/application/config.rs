// ============================================================
// Pipeline Configuration
// ============================================================
// Serialisable settings for one or two dataset splits. Loaded
// from a JSON file; the CLI may override a few fields.
//
// Example:
//   {
//     "seed": 2018,
//     "batch_size": 32,
//     "train": {
//       "dset_name": "qvhighlight",
//       "data_path": "data/qvhighlight/highlight_train_release.jsonl",
//       "v_feat_dirs": ["features/qvhighlight/clip", "features/qvhighlight/slowfast"],
//       "q_feat_dir": "features/qvhighlight/clip_text",
//       "ctx_mode": "video_tef"
//     }
//   }

use std::{fs, path::Path, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::labels::SpanLossType;
use crate::error::{PipelineError, Result};

/// Sentinel for "no limit" in `max_v_l`
const UNLIMITED_VIDEO_LEN: i64 = 100_000_000;
/// What `max_q_l = -1` stands for
const UNLIMITED_QUERY_LEN: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetName {
    Qvhighlight,
    Charades,
    Tacos,
    Activitynet,
    Tvsum,
    YoutubeHighlight,
}

impl DatasetName {
    /// Highlight-only datasets: no windows, saliency from `label`,
    /// and records filtered by domain.
    pub fn is_highlight_only(self) -> bool {
        matches!(self, DatasetName::Tvsum | DatasetName::YoutubeHighlight)
    }

    /// Moment datasets whose saliency comes from the first window
    pub fn uses_window_saliency(self) -> bool {
        matches!(
            self,
            DatasetName::Charades | DatasetName::Tacos | DatasetName::Activitynet
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QueryFeatType {
    PoolerOutput,
    #[default]
    LastHiddenState,
}

impl QueryFeatType {
    pub fn key(self) -> &'static str {
        match self {
            QueryFeatType::PoolerOutput => "pooler_output",
            QueryFeatType::LastHiddenState => "last_hidden_state",
        }
    }
}

// ─── DatasetConfig ────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub dset_name: DatasetName,
    #[serde(default)]
    pub domain: Option<String>,
    pub data_path: PathBuf,
    pub v_feat_dirs: Vec<PathBuf>,
    /// Feature directory, or a GloVe text file when the path mentions "glove"
    pub q_feat_dir: PathBuf,
    #[serde(default)]
    pub q_feat_type: QueryFeatType,
    #[serde(default = "default_max_q_l")]
    pub max_q_l: i64,
    #[serde(default = "default_max_v_l")]
    pub max_v_l: i64,
    #[serde(default = "default_ratio")]
    pub data_ratio: f64,
    #[serde(default = "default_ctx_mode")]
    pub ctx_mode: String,
    #[serde(default = "default_true")]
    pub normalize_v: bool,
    #[serde(default = "default_true")]
    pub normalize_t: bool,
    #[serde(default = "default_clip_len")]
    pub clip_len: f64,
    #[serde(default = "default_max_windows")]
    pub max_windows: usize,
    #[serde(default)]
    pub span_loss_type: SpanLossType,
    #[serde(default = "default_true")]
    pub load_labels: bool,
}

fn default_max_q_l() -> i64 {
    32
}

fn default_max_v_l() -> i64 {
    75
}

fn default_ratio() -> f64 {
    1.0
}

fn default_ctx_mode() -> String {
    "video_tef".to_string()
}

fn default_true() -> bool {
    true
}

fn default_clip_len() -> f64 {
    2.0
}

fn default_max_windows() -> usize {
    5
}

impl DatasetConfig {
    /// Maximum number of query tokens kept (`-1` → 100)
    pub fn query_len_limit(&self) -> usize {
        let l = if self.max_q_l == -1 {
            UNLIMITED_QUERY_LEN
        } else {
            self.max_q_l
        };
        l.max(0) as usize
    }

    /// Maximum number of video clips kept (`-1` → unlimited)
    pub fn video_len_limit(&self) -> usize {
        let l = if self.max_v_l == -1 {
            UNLIMITED_VIDEO_LEN
        } else {
            self.max_v_l
        };
        l.max(0) as usize
    }

    pub fn use_video(&self) -> bool {
        self.ctx_mode.contains("video")
    }

    pub fn use_tef(&self) -> bool {
        self.ctx_mode.contains("tef")
    }

    pub fn use_glove(&self) -> bool {
        self.q_feat_dir.to_string_lossy().contains("glove")
    }

    pub fn validate(&self) -> Result<()> {
        if self.v_feat_dirs.is_empty() && self.use_video() {
            return Err(PipelineError::Config(
                "v_feat_dirs must name at least one directory".into(),
            ));
        }
        if !self.use_video() && !self.use_tef() {
            return Err(PipelineError::Config(format!(
                "ctx_mode '{}' uses neither video nor tef",
                self.ctx_mode
            )));
        }
        if self.clip_len <= 0.0 {
            return Err(PipelineError::Config(format!(
                "clip_len must be positive, got {}",
                self.clip_len
            )));
        }
        if !(self.data_ratio > 0.0 && self.data_ratio <= 1.0) {
            return Err(PipelineError::Config(format!(
                "data_ratio must be in (0, 1], got {}",
                self.data_ratio
            )));
        }
        if self.dset_name.is_highlight_only() && self.domain.is_none() {
            tracing::warn!(
                "{:?} without a domain keeps only records that have no domain",
                self.dset_name
            );
        }
        Ok(())
    }
}

// ─── PipelineConfig ───────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Split {
    #[default]
    Train,
    Eval,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_num_workers")]
    pub num_workers: usize,
    pub train: DatasetConfig,
    #[serde(default)]
    pub eval: Option<DatasetConfig>,
}

fn default_seed() -> u64 {
    2018
}

fn default_batch_size() -> usize {
    32
}

fn default_num_workers() -> usize {
    4
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: PipelineConfig = serde_json::from_str(&json)
            .map_err(|e| PipelineError::Config(format!("{}: {e}", path.display())))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Settings for `split`; an eval split must be configured.
    pub fn split(&self, split: Split) -> Result<&DatasetConfig> {
        match split {
            Split::Train => Ok(&self.train),
            Split::Eval => self
                .eval
                .as_ref()
                .ok_or_else(|| PipelineError::Config("no eval split configured".into())),
        }
    }

    pub fn split_mut(&mut self, split: Split) -> Result<&mut DatasetConfig> {
        match split {
            Split::Train => Ok(&mut self.train),
            Split::Eval => self
                .eval
                .as_mut()
                .ok_or_else(|| PipelineError::Config("no eval split configured".into())),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(PipelineError::Config("batch_size must be at least 1".into()));
        }
        self.train.validate()?;
        if let Some(eval) = &self.eval {
            eval.validate()?;
        }
        Ok(())
    }
}
