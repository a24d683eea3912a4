// ============================================================
// Checkpoints
// ============================================================
// Builds models and restores their weights with Burn's
// CompactRecorder (MessagePack + gzip, half precision).
//
// Two entry points:
//   load_model       build from a ModelBuilder, then load a record
//   CheckpointStore  directory of tagged records plus a pointer to
//                    the latest one
//
// Directory layout:
//   checkpoints/
//     model_epoch_3.mpk.gz
//     model_best.mpk.gz
//     latest.json          ← {"tag": "epoch_3"}

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

const RECORD_EXTENSION: &str = "mpk.gz";
const BEST_TAG: &str = "best";

// ─── ModelBuilder ─────────────────────────────────────────────────────────────
/// Anything that can construct a fresh, untrained model on a device.
/// Usually a model's `#[derive(Config)]` struct.
pub trait ModelBuilder<B: Backend> {
    type Model: Module<B>;

    fn build(&self, device: &B::Device) -> Self::Model;
}

/// Build a model and load `weights` into it.
///
/// `weights` may be given with or without the `.mpk.gz` extension.
pub fn load_model<B, M>(builder: &M, weights: &Path, device: &B::Device) -> Result<M::Model>
where
    B: Backend,
    M: ModelBuilder<B>,
{
    let model = builder.build(device);
    let record = CompactRecorder::new()
        .load(strip_extension(weights), device)
        .with_context(|| format!("Cannot load weights from '{}'", weights.display()))?;

    tracing::info!("Loaded model weights from '{}'", weights.display());
    Ok(model.load_record(record))
}

fn strip_extension(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    match s.strip_suffix(&format!(".{RECORD_EXTENSION}")) {
        Some(stem) => PathBuf::from(stem),
        None => path.to_path_buf(),
    }
}

// ─── CheckpointStore ──────────────────────────────────────────────────────────
#[derive(Debug, Serialize, Deserialize)]
struct LatestPointer {
    tag: String,
}

/// Tagged model records in one directory.
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    /// Open (and create if needed) a checkpoint directory.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint dir '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    /// Record path without extension; the recorder appends it.
    fn record_stem(&self, tag: &str) -> PathBuf {
        self.dir.join(format!("model_{tag}"))
    }

    /// Full path of the record file for `tag`.
    pub fn record_path(&self, tag: &str) -> PathBuf {
        self.dir.join(format!("model_{tag}.{RECORD_EXTENSION}"))
    }

    /// Save `model` under `tag` and mark it as the latest checkpoint.
    pub fn save<B: Backend, M: Module<B>>(&self, model: &M, tag: &str) -> Result<PathBuf> {
        CompactRecorder::new()
            .record(model.clone().into_record(), self.record_stem(tag))
            .with_context(|| format!("Failed to save checkpoint '{tag}'"))?;

        let pointer = serde_json::to_string(&LatestPointer { tag: tag.to_string() })?;
        fs::write(self.dir.join("latest.json"), pointer)
            .with_context(|| "Failed to write latest.json")?;

        tracing::debug!("Saved checkpoint '{}'", tag);
        Ok(self.record_path(tag))
    }

    /// Tag of the most recently saved checkpoint.
    pub fn latest_tag(&self) -> Result<String> {
        let path = self.dir.join("latest.json");
        let json = fs::read_to_string(&path)
            .with_context(|| format!("No checkpoint saved yet in '{}'", self.dir.display()))?;
        Ok(serde_json::from_str::<LatestPointer>(&json)?.tag)
    }

    /// Load the latest checkpoint into an already-built model.
    pub fn load_latest<B: Backend, M: Module<B>>(&self, model: M, device: &B::Device) -> Result<M> {
        let tag = self.latest_tag()?;
        let record = CompactRecorder::new()
            .load(self.record_stem(&tag), device)
            .with_context(|| format!("Cannot load checkpoint '{tag}'"))?;
        tracing::info!("Loaded checkpoint '{}'", tag);
        Ok(model.load_record(record))
    }

    /// Copy the latest record to `model_best`.
    pub fn promote_latest_to_best(&self) -> Result<PathBuf> {
        let tag = self.latest_tag()?;
        let from = self.record_path(&tag);
        let to = self.record_path(BEST_TAG);
        fs::copy(&from, &to)
            .with_context(|| format!("Cannot copy '{}' to '{}'", from.display(), to.display()))?;
        tracing::info!("Checkpoint '{}' is the new best", tag);
        Ok(to)
    }
}
