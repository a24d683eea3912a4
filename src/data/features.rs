// ============================================================
// Numpy Feature Store
// ============================================================
// Loads precomputed query and video features from .npz / .npy
// files using ndarray-npy.
//
// File layout per dataset:
//
//   query  tvsum              {q_feat_dir}/{qid}.npz   key "token"
//          youtube_highlight  {q_feat_dir}/{qid}.npz   key "last_hidden_state"
//          tacos              {q_feat_dir}/{qid}.npz   key q_feat_type
//          everything else    {q_feat_dir}/qid{qid}.npz key q_feat_type
//
//   video  {dir}/{vid}.npz key "features", falling back to {dir}/{vid}.npy
//          tvsum + i3d dir: {dir}/{vid}_rgb.npy ++ {dir}/{vid}_opt.npy
//
// Several video directories are truncated to a common length and
// concatenated along the feature axis.

use std::{
    fs::File,
    path::{Path, PathBuf},
};

use ndarray::{concatenate, s, Array2, ArrayD, Axis, Ix2};
use ndarray_npy::{read_npy, NpzReader};

use crate::application::config::{DatasetConfig, DatasetName, QueryFeatType};
use crate::domain::annotation::AnnotationRecord;
use crate::domain::traits::FeatureSource;
use crate::error::{PipelineError, Result};

const L2_EPS: f32 = 1e-5;

// ─── Array helpers ────────────────────────────────────────────────────────────

/// Divide every row by its L2 norm (plus a small epsilon).
pub fn l2_normalize_rows(feat: &mut Array2<f32>) {
    for mut row in feat.rows_mut() {
        let norm = row.dot(&row).sqrt();
        row.mapv_inplace(|x| x / (norm + L2_EPS));
    }
}

/// Keep at most `max_rows` leading rows.
pub fn truncate_rows(feat: Array2<f32>, max_rows: usize) -> Array2<f32> {
    let end = max_rows.min(feat.nrows());
    feat.slice_move(s![..end, ..])
}

/// Temporal endpoint features: row i is [i/len, (i+1)/len].
pub fn temporal_endpoint_features(len: usize) -> Array2<f32> {
    let l = len as f32;
    Array2::from_shape_fn((len, 2), |(i, j)| (i as f32 + j as f32) / l)
}

/// Concatenate two feature matrices along the feature axis.
pub fn hstack(a: &Array2<f32>, b: &Array2<f32>) -> Result<Array2<f32>> {
    Ok(concatenate(Axis(1), &[a.view(), b.view()])?)
}

fn into_matrix(arr: ArrayD<f32>, path: &Path) -> Result<Array2<f32>> {
    match arr.ndim() {
        1 => Ok(arr.insert_axis(Axis(0)).into_dimensionality::<Ix2>()?),
        2 => Ok(arr.into_dimensionality::<Ix2>()?),
        ndim => Err(PipelineError::UnsupportedRank {
            path: path.to_path_buf(),
            ndim,
        }),
    }
}

/// Read a .npy file stored as f32 or f64.
pub fn read_npy_matrix(path: &Path) -> Result<Array2<f32>> {
    let arr: ArrayD<f32> = match read_npy::<_, ArrayD<f32>>(path) {
        Ok(a) => a,
        Err(first) => match read_npy::<_, ArrayD<f64>>(path) {
            Ok(a) => a.mapv(|x| x as f32),
            Err(_) => {
                return Err(PipelineError::Npy {
                    path: path.to_path_buf(),
                    source: first,
                })
            }
        },
    };
    into_matrix(arr, path)
}

/// Read one named array from a .npz archive stored as f32 or f64.
pub fn read_npz_matrix(path: &Path, key: &str) -> Result<Array2<f32>> {
    let npz_err = |source| PipelineError::Npz {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut npz = NpzReader::new(file).map_err(npz_err)?;

    // numpy stores "key.npy" inside the archive
    let wanted = format!("{key}.npy");
    let name = npz
        .names()
        .map_err(npz_err)?
        .into_iter()
        .find(|n| n == key || *n == wanted)
        .ok_or_else(|| PipelineError::MissingArray {
            path: path.to_path_buf(),
            key: key.to_string(),
        })?;

    let arr: ArrayD<f32> = match npz.by_name::<_, ndarray::IxDyn>(&name) {
        Ok(a) => a,
        Err(first) => match npz.by_name::<ndarray::OwnedRepr<f64>, ndarray::IxDyn>(&name) {
            Ok(a) => a.mapv(|x| x as f32),
            Err(_) => return Err(npz_err(first)),
        },
    };
    into_matrix(arr, path)
}

// ─── NpyFeatureStore ──────────────────────────────────────────────────────────
/// Feature source backed by per-example numpy files.
#[derive(Debug, Clone)]
pub struct NpyFeatureStore {
    dset_name: DatasetName,
    v_feat_dirs: Vec<PathBuf>,
    q_feat_dir: PathBuf,
    q_feat_type: QueryFeatType,
    max_q_l: usize,
    max_v_l: usize,
    normalize_v: bool,
    normalize_t: bool,
}

impl NpyFeatureStore {
    pub fn new(cfg: &DatasetConfig) -> Self {
        Self {
            dset_name: cfg.dset_name,
            v_feat_dirs: cfg.v_feat_dirs.clone(),
            q_feat_dir: cfg.q_feat_dir.clone(),
            q_feat_type: cfg.q_feat_type,
            max_q_l: cfg.query_len_limit(),
            max_v_l: cfg.video_len_limit(),
            normalize_v: cfg.normalize_v,
            normalize_t: cfg.normalize_t,
        }
    }

    fn query_path(&self, record: &AnnotationRecord) -> PathBuf {
        let file = match self.dset_name {
            DatasetName::Tvsum | DatasetName::YoutubeHighlight | DatasetName::Tacos => {
                format!("{}.npz", record.qid)
            }
            _ => format!("qid{}.npz", record.qid),
        };
        self.q_feat_dir.join(file)
    }

    fn load_from_dir(&self, dir: &Path, vid: &str) -> Result<Array2<f32>> {
        let primary = if self.dset_name == DatasetName::Tvsum
            && dir.to_string_lossy().contains("i3d")
        {
            self.load_two_stream(dir, vid)
        } else {
            read_npz_matrix(&dir.join(format!("{vid}.npz")), "features")
        };

        let feat = match primary {
            Ok(f) => f,
            Err(e) => {
                tracing::debug!("Falling back to {vid}.npy in '{}': {e}", dir.display());
                read_npy_matrix(&dir.join(format!("{vid}.npy")))?
            }
        };

        let mut feat = truncate_rows(feat, self.max_v_l);
        if self.normalize_v {
            l2_normalize_rows(&mut feat);
        }
        Ok(feat)
    }

    /// I3D features come as separate RGB and optical-flow streams.
    fn load_two_stream(&self, dir: &Path, vid: &str) -> Result<Array2<f32>> {
        let rgb = read_npy_matrix(&dir.join(format!("{vid}_rgb.npy")))?;
        let opt = read_npy_matrix(&dir.join(format!("{vid}_opt.npy")))?;
        let rgb = truncate_rows(rgb, self.max_v_l);
        let opt = truncate_rows(opt, self.max_v_l);
        let len = rgb.nrows().min(opt.nrows());
        hstack(&truncate_rows(rgb, len), &truncate_rows(opt, len))
    }
}

impl FeatureSource for NpyFeatureStore {
    fn query_features(&self, record: &AnnotationRecord) -> Result<Array2<f32>> {
        let path = self.query_path(record);
        match self.dset_name {
            DatasetName::Tvsum => read_npz_matrix(&path, "token"),
            DatasetName::YoutubeHighlight => read_npz_matrix(&path, "last_hidden_state"),
            _ => {
                let mut feat = read_npz_matrix(&path, self.q_feat_type.key())?;
                if self.q_feat_type == QueryFeatType::LastHiddenState {
                    feat = truncate_rows(feat, self.max_q_l);
                }
                if self.normalize_t {
                    l2_normalize_rows(&mut feat);
                }
                Ok(feat)
            }
        }
    }

    fn video_features(&self, vid: &str) -> Result<Array2<f32>> {
        let feats = self
            .v_feat_dirs
            .iter()
            .map(|dir| self.load_from_dir(dir, vid))
            .collect::<Result<Vec<_>>>()?;

        // Extractors disagree by a frame or two at the tail
        let min_len = feats.iter().map(Array2::nrows).min().unwrap_or(0);
        if min_len == 0 {
            return Err(PipelineError::EmptyVideo { vid: vid.to_string() });
        }

        let views: Vec<_> = feats.iter().map(|f| f.slice(s![..min_len, ..])).collect();
        Ok(concatenate(Axis(1), &views)?)
    }
}
