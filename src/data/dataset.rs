// ============================================================
// Moment Dataset
// ============================================================
// Implements Burn's Dataset trait over annotation records. Each
// `get` loads the example's features from its FeatureSource and
// builds labels:
//
//   qvhighlight                 windows + annotator saliency scores
//   charades / tacos / anet     windows + saliency from the first window
//   tvsum / youtube_highlight   per-clip `label` matrix only
//
// An example that fails to load is logged and returned as None.

use std::sync::Mutex;

use burn::data::dataset::Dataset;
use ndarray::Array2;
use rand::{rngs::StdRng, SeedableRng};

use crate::application::config::{DatasetConfig, DatasetName};
use crate::data::{
    annotations::load_split,
    features::{hstack, temporal_endpoint_features, truncate_rows, NpyFeatureStore},
    glove::{GloveFeatures, GloveVocab},
    labels,
};
use crate::domain::annotation::{AnnotationRecord, Qid};
use crate::domain::labels::{ExampleLabels, SpanLabels};
use crate::domain::traits::FeatureSource;
use crate::error::{PipelineError, Result};

/// One fully loaded example: features plus (optionally) labels.
#[derive(Debug, Clone)]
pub struct MomentItem {
    pub meta: AnnotationRecord,
    /// (Lq, Dq)
    pub query_feat: Array2<f32>,
    /// (Lv, Dv), with two trailing tef columns when enabled
    pub video_feat: Array2<f32>,
    pub labels: Option<ExampleLabels>,
    /// QVHighlights only
    pub relevant_clip_ids: Option<Vec<usize>>,
}

impl MomentItem {
    pub fn qid(&self) -> &Qid {
        &self.meta.qid
    }

    pub fn vid(&self) -> &str {
        &self.meta.vid
    }
}

/// Annotated examples backed by a FeatureSource.
///
/// Labels involve random sampling; the RNG is seeded once and
/// shared by every `get` call.
pub struct MomentDataset<F: FeatureSource> {
    cfg: DatasetConfig,
    records: Vec<AnnotationRecord>,
    features: F,
    rng: Mutex<StdRng>,
}

impl MomentDataset<Box<dyn FeatureSource>> {
    /// Load the annotations for `cfg` and pick the feature source
    /// (GloVe when `q_feat_dir` names a GloVe file).
    pub fn open(cfg: &DatasetConfig, seed: u64) -> Result<Self> {
        cfg.validate()?;
        let records = load_split(cfg)?;
        let store = NpyFeatureStore::new(cfg);
        let features: Box<dyn FeatureSource> = if cfg.use_glove() {
            let vocab = GloveVocab::load(&cfg.q_feat_dir)?;
            Box::new(GloveFeatures::new(vocab, store))
        } else {
            Box::new(store)
        };
        tracing::info!(
            "Opened {:?} split '{}' with {} examples",
            cfg.dset_name,
            cfg.data_path.display(),
            records.len()
        );
        Ok(Self::new(cfg.clone(), records, features, seed))
    }
}

impl FeatureSource for Box<dyn FeatureSource> {
    fn query_features(&self, record: &AnnotationRecord) -> Result<Array2<f32>> {
        (**self).query_features(record)
    }

    fn video_features(&self, vid: &str) -> Result<Array2<f32>> {
        (**self).video_features(vid)
    }
}

impl<F: FeatureSource> MomentDataset<F> {
    pub fn new(cfg: DatasetConfig, records: Vec<AnnotationRecord>, features: F, seed: u64) -> Self {
        Self {
            cfg,
            records,
            features,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn records(&self) -> &[AnnotationRecord] {
        &self.records
    }

    pub fn config(&self) -> &DatasetConfig {
        &self.cfg
    }

    /// Load features and build labels for the example at `index`.
    pub fn load_item(&self, index: usize) -> Result<MomentItem> {
        let meta = self
            .records
            .get(index)
            .ok_or_else(|| PipelineError::Config(format!("index {index} out of range")))?
            .clone();
        let cfg = &self.cfg;

        let query_feat = self.features.query_features(&meta)?;

        let (mut video_feat, ctx_l) = if cfg.use_video() {
            let v = self.features.video_features(&meta.vid)?;
            let len = v.nrows();
            (Some(v), len)
        } else {
            (None, cfg.video_len_limit())
        };

        if cfg.use_tef() {
            let tef = temporal_endpoint_features(ctx_l);
            video_feat = Some(match video_feat {
                Some(v) => hstack(&v, &tef)?,
                None => tef,
            });
        }
        // validate() guarantees video or tef
        let mut video_feat = video_feat.unwrap_or_else(|| Array2::zeros((ctx_l, 0)));

        let mut item_labels = None;
        let mut relevant_clip_ids = None;
        if cfg.load_labels {
            item_labels = self.build_labels(&meta, ctx_l)?;

            // TVSum labels can be shorter than the features
            if cfg.dset_name == DatasetName::Tvsum {
                if let Some(l) = &item_labels {
                    let n = l.saliency.scores.len();
                    if n != video_feat.nrows() {
                        video_feat = truncate_rows(video_feat, n);
                    }
                }
            }
            if cfg.dset_name == DatasetName::Qvhighlight && item_labels.is_some() {
                relevant_clip_ids = meta.relevant_clip_ids.clone();
            }
        }

        Ok(MomentItem {
            meta,
            query_feat,
            video_feat,
            labels: item_labels,
            relevant_clip_ids,
        })
    }

    fn build_labels(&self, meta: &AnnotationRecord, ctx_l: usize) -> Result<Option<ExampleLabels>> {
        let cfg = &self.cfg;
        let missing = |field| PipelineError::MissingField {
            qid: meta.qid.to_string(),
            field,
        };

        if cfg.dset_name.is_highlight_only() {
            let label = meta
                .label
                .as_deref()
                .filter(|l| !l.is_empty())
                .ok_or_else(|| missing("label"))?;
            let saliency = match cfg.dset_name {
                DatasetName::Tvsum => labels::saliency_tvsum(label, ctx_l),
                _ => labels::saliency_youtube(label, ctx_l),
            };
            return Ok(Some(ExampleLabels {
                spans: SpanLabels::empty_window(),
                saliency,
            }));
        }

        // Test splits ship without windows
        let Some(windows) = meta.relevant_windows.as_deref() else {
            return Ok(None);
        };
        if ctx_l == 0 {
            return Err(PipelineError::EmptyVideo { vid: meta.vid.clone() });
        }

        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        let spans = labels::span_labels(
            windows,
            ctx_l,
            cfg.clip_len,
            cfg.max_windows,
            cfg.span_loss_type,
            &mut *rng,
        );

        let saliency = match cfg.dset_name {
            DatasetName::Qvhighlight => {
                let rel = meta
                    .relevant_clip_ids
                    .as_deref()
                    .filter(|r| !r.is_empty())
                    .ok_or_else(|| missing("relevant_clip_ids"))?;
                let scores = meta
                    .saliency_scores
                    .as_deref()
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| missing("saliency_scores"))?;
                labels::saliency_qvhighlight(rel, scores, ctx_l, &mut *rng)
            }
            name if name.uses_window_saliency() => {
                let first = *windows.first().ok_or_else(|| missing("relevant_windows"))?;
                let duration = meta.duration.ok_or_else(|| missing("duration"))?;
                labels::saliency_sub_as_query(first, duration, ctx_l, &mut *rng)
            }
            name => {
                return Err(PipelineError::Config(format!(
                    "{name:?} has no window-based saliency labels"
                )))
            }
        };

        Ok(Some(ExampleLabels { spans, saliency }))
    }
}

impl<F: FeatureSource> Dataset<MomentItem> for MomentDataset<F> {
    fn get(&self, index: usize) -> Option<MomentItem> {
        match self.load_item(index) {
            Ok(item) => Some(item),
            Err(e) => {
                let vid = self.records.get(index).map_or("?", |r| r.vid.as_str());
                tracing::warn!("Skipping example {} (vid {}): {}", index, vid, e);
                None
            }
        }
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::application::config::PipelineConfig;
    use crate::domain::labels::SpanLossType;
    use std::collections::HashMap;

    /// In-memory feature source keyed by qid / vid.
    pub(crate) struct FixedFeatures {
        pub queries: HashMap<String, Array2<f32>>,
        pub videos: HashMap<String, Array2<f32>>,
    }

    impl FeatureSource for FixedFeatures {
        fn query_features(&self, record: &AnnotationRecord) -> Result<Array2<f32>> {
            self.queries
                .get(&record.qid.to_string())
                .cloned()
                .ok_or_else(|| PipelineError::MissingArray {
                    path: "memory".into(),
                    key: record.qid.to_string(),
                })
        }

        fn video_features(&self, vid: &str) -> Result<Array2<f32>> {
            self.videos
                .get(vid)
                .cloned()
                .ok_or_else(|| PipelineError::EmptyVideo { vid: vid.to_string() })
        }
    }

    pub(crate) fn config(dset: &str, ctx_mode: &str) -> DatasetConfig {
        let json = serde_json::json!({
            "train": {
                "dset_name": dset,
                "data_path": "memory.jsonl",
                "v_feat_dirs": ["memory"],
                "q_feat_dir": "memory",
                "ctx_mode": ctx_mode,
            }
        });
        serde_json::from_value::<PipelineConfig>(json).unwrap().train
    }

    pub(crate) fn qv_record(qid: i64, vid: &str) -> AnnotationRecord {
        serde_json::from_value(serde_json::json!({
            "qid": qid,
            "query": "a man walks",
            "vid": vid,
            "duration": 20,
            "relevant_windows": [[4, 10]],
            "relevant_clip_ids": [2, 3, 4],
            "saliency_scores": [[1, 1, 1], [4, 4, 4], [2, 2, 2]]
        }))
        .unwrap()
    }

    pub(crate) fn features(entries: &[(i64, &str, usize, usize)]) -> FixedFeatures {
        let mut queries = HashMap::new();
        let mut videos = HashMap::new();
        for &(qid, vid, q_len, v_len) in entries {
            queries.insert(qid.to_string(), Array2::ones((q_len, 4)));
            videos.insert(vid.to_string(), Array2::ones((v_len, 6)));
        }
        FixedFeatures { queries, videos }
    }

    #[test]
    fn test_qvhighlight_item_with_tef() {
        let ds = MomentDataset::new(
            config("qvhighlight", "video_tef"),
            vec![qv_record(1, "v1")],
            features(&[(1, "v1", 5, 10)]),
            0,
        );
        assert_eq!(ds.len(), 1);

        let item = ds.get(0).unwrap();
        assert_eq!(item.query_feat.dim(), (5, 4));
        assert_eq!(item.video_feat.dim(), (10, 8));
        // last two columns are tef
        assert_eq!(item.video_feat[[9, 6]], 0.9);
        assert_eq!(item.video_feat[[9, 7]], 1.0);

        let labels = item.labels.unwrap();
        let SpanLabels::Cxw(spans) = labels.spans else { panic!() };
        // window [4, 10] over 10 clips * 2s
        assert!((spans[[0, 0]] - 0.35).abs() < 1e-6);
        assert!((spans[[0, 1]] - 0.3).abs() < 1e-6);
        assert_eq!(labels.saliency.pos[0], 3);
        assert_eq!(labels.saliency.neg[0], 2);
        assert_eq!(labels.saliency.scores.len(), 10);
        assert_eq!(item.relevant_clip_ids, Some(vec![2, 3, 4]));
    }

    #[test]
    fn test_tef_only_uses_max_len() {
        let mut cfg = config("charades", "tef");
        cfg.max_v_l = 8;
        let ds = MomentDataset::new(cfg, vec![qv_record(1, "v1")], features(&[(1, "v1", 2, 3)]), 0);
        let item = ds.load_item(0).unwrap();
        assert_eq!(item.video_feat.dim(), (8, 2));
        assert_eq!(item.labels.unwrap().saliency.scores.len(), 8);
        assert!(item.relevant_clip_ids.is_none());
    }

    #[test]
    fn test_ce_spans() {
        let mut cfg = config("charades", "video");
        cfg.span_loss_type = SpanLossType::Ce;
        let ds = MomentDataset::new(cfg, vec![qv_record(1, "v1")], features(&[(1, "v1", 2, 10)]), 0);
        let item = ds.load_item(0).unwrap();
        assert_eq!(item.video_feat.ncols(), 6);
        assert_eq!(
            item.labels.unwrap().spans,
            SpanLabels::ClipIndices(vec![[2, 4]])
        );
    }

    #[test]
    fn test_unlabelled_record_has_no_labels() {
        let mut rec = qv_record(1, "v1");
        rec.relevant_windows = None;
        let ds = MomentDataset::new(config("qvhighlight", "video_tef"), vec![rec], features(&[(1, "v1", 2, 10)]), 0);
        let item = ds.load_item(0).unwrap();
        assert!(item.labels.is_none());
        assert!(item.relevant_clip_ids.is_none());
    }

    #[test]
    fn test_load_labels_off() {
        let mut cfg = config("qvhighlight", "video_tef");
        cfg.load_labels = false;
        let ds = MomentDataset::new(cfg, vec![qv_record(1, "v1")], features(&[(1, "v1", 2, 10)]), 0);
        assert!(ds.load_item(0).unwrap().labels.is_none());
    }

    #[test]
    fn test_tvsum_truncates_video_to_labels() {
        let rec: AnnotationRecord = serde_json::from_value(serde_json::json!({
            "qid": 1, "query": "", "vid": "v1", "domain": "BK",
            "label": [[1, 1], [5, 5], [2, 3]]
        }))
        .unwrap();
        let ds = MomentDataset::new(config("tvsum", "video_tef"), vec![rec], features(&[(1, "v1", 1, 6)]), 0);
        let item = ds.load_item(0).unwrap();
        let labels = item.labels.unwrap();
        assert_eq!(labels.saliency.scores.len(), 3);
        assert_eq!(item.video_feat.nrows(), 3);
        assert_eq!(labels.spans, SpanLabels::empty_window());
        assert_eq!(labels.saliency.pos, vec![1]);
    }

    #[test]
    fn test_missing_fields_are_reported() {
        let mut rec = qv_record(1, "v1");
        rec.saliency_scores = None;
        let ds = MomentDataset::new(config("qvhighlight", "video"), vec![rec], features(&[(1, "v1", 2, 10)]), 0);
        match ds.load_item(0) {
            Err(PipelineError::MissingField { field, .. }) => assert_eq!(field, "saliency_scores"),
            other => panic!("expected missing field, got {other:?}"),
        }

        let mut rec = qv_record(1, "v1");
        rec.duration = None;
        let ds = MomentDataset::new(config("tacos", "video"), vec![rec], features(&[(1, "v1", 2, 10)]), 0);
        assert!(matches!(
            ds.load_item(0),
            Err(PipelineError::MissingField { field: "duration", .. })
        ));
    }

    #[test]
    fn test_empty_saliency_annotations_are_rejected() {
        let mut rec = qv_record(1, "v1");
        rec.relevant_clip_ids = Some(vec![]);
        let ds = MomentDataset::new(config("qvhighlight", "video"), vec![rec], features(&[(1, "v1", 2, 10)]), 0);
        assert!(matches!(
            ds.load_item(0),
            Err(PipelineError::MissingField { field: "relevant_clip_ids", .. })
        ));
        assert!(ds.get(0).is_none());

        let mut rec = qv_record(1, "v1");
        rec.saliency_scores = Some(vec![]);
        let ds = MomentDataset::new(config("qvhighlight", "video"), vec![rec], features(&[(1, "v1", 2, 10)]), 0);
        assert!(matches!(
            ds.load_item(0),
            Err(PipelineError::MissingField { field: "saliency_scores", .. })
        ));

        let mut rec = qv_record(1, "v1");
        rec.label = Some(vec![]);
        let ds = MomentDataset::new(config("tvsum", "video"), vec![rec], features(&[(1, "v1", 2, 10)]), 0);
        assert!(matches!(
            ds.load_item(0),
            Err(PipelineError::MissingField { field: "label", .. })
        ));
    }

    #[test]
    fn test_open_selects_glove_for_queries() {
        use ndarray_npy::NpzWriter;
        use std::fs::{self, File};

        let root = tempfile::tempdir().unwrap();
        let v_dir = root.path().join("clip");
        fs::create_dir_all(&v_dir).unwrap();
        let mut npz = NpzWriter::new(File::create(v_dir.join("v1.npz")).unwrap());
        npz.add_array("features", &Array2::<f32>::ones((10, 6))).unwrap();
        npz.finish().unwrap();

        let glove_path = root.path().join("glove.test.3d.txt");
        fs::write(&glove_path, "man 1 0 0\nwalks 0 1 0\n").unwrap();

        let data_path = root.path().join("train.jsonl");
        let record = serde_json::to_string(&qv_record(1, "v1")).unwrap();
        fs::write(&data_path, format!("{record}\n")).unwrap();

        let mut cfg = config("qvhighlight", "video_tef");
        cfg.data_path = data_path;
        cfg.v_feat_dirs = vec![v_dir];
        cfg.q_feat_dir = glove_path;
        assert!(cfg.use_glove());

        let ds = MomentDataset::open(&cfg, 0).unwrap();
        let item = ds.load_item(0).unwrap();
        // "a man walks": unknown word maps to the zero <unk> row
        assert_eq!(item.query_feat.dim(), (3, 3));
        assert_eq!(item.query_feat.row(0).to_vec(), vec![0.0, 0.0, 0.0]);
        assert_eq!(item.query_feat.row(1).to_vec(), vec![1.0, 0.0, 0.0]);
        assert_eq!(item.video_feat.dim(), (10, 8));
    }

    #[test]
    fn test_failed_item_is_skipped() {
        let ds = MomentDataset::new(config("qvhighlight", "video"), vec![qv_record(1, "missing")], features(&[(1, "v1", 2, 10)]), 0);
        assert!(ds.get(0).is_none());
        assert!(ds.get(5).is_none());
    }

    #[test]
    fn test_same_seed_same_labels() {
        let make = || {
            MomentDataset::new(
                config("charades", "video"),
                vec![qv_record(1, "v1")],
                features(&[(1, "v1", 2, 30)]),
                11,
            )
        };
        let a = make().load_item(0).unwrap().labels;
        let b = make().load_item(0).unwrap().labels;
        assert_eq!(a, b);
    }
}
