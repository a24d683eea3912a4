// ============================================================
// Annotation Loader
// ============================================================
// Reads a JSONL annotation file into AnnotationRecords and
// applies the per-split selection rules:
//
//   1. domain filter (TVSum / YouTube Highlights only)
//   2. data ratio (keep a prefix of the records)

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use crate::application::config::DatasetConfig;
use crate::domain::annotation::AnnotationRecord;
use crate::error::{PipelineError, Result};

/// Parse one JSON object per non-blank line.
pub fn load_jsonl(path: &Path) -> Result<Vec<AnnotationRecord>> {
    let io_err = |source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    };
    let reader = BufReader::new(File::open(path).map_err(io_err)?);

    let mut records = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.map_err(io_err)?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|source| PipelineError::Annotation {
            path: path.to_path_buf(),
            line: i + 1,
            source,
        })?;
        records.push(record);
    }

    tracing::debug!("Parsed {} annotations from '{}'", records.len(), path.display());
    Ok(records)
}

/// Load the annotations for a split and apply domain / ratio selection.
pub fn load_split(cfg: &DatasetConfig) -> Result<Vec<AnnotationRecord>> {
    let mut records = load_jsonl(&cfg.data_path)?;
    let total = records.len();

    if cfg.dset_name.is_highlight_only() {
        records.retain(|r| r.domain == cfg.domain);
        tracing::info!(
            "Domain {:?}: kept {} of {} annotations",
            cfg.domain,
            records.len(),
            total
        );
    }

    if cfg.data_ratio < 1.0 {
        let keep = (records.len() as f64 * cfg.data_ratio) as usize;
        records.truncate(keep);
        tracing::info!("Using {}% of the data: {} examples", cfg.data_ratio * 100.0, keep);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::config::{DatasetName, PipelineConfig};
    use std::io::Write;

    fn write_lines(dir: &tempfile::TempDir, lines: &[&str]) -> std::path::PathBuf {
        let path = dir.path().join("anno.jsonl");
        let mut f = File::create(&path).unwrap();
        for l in lines {
            writeln!(f, "{l}").unwrap();
        }
        path
    }

    fn config_for(path: &Path, dset: &str, domain: Option<&str>) -> DatasetConfig {
        let json = serde_json::json!({
            "train": {
                "dset_name": dset,
                "domain": domain,
                "data_path": path,
                "v_feat_dirs": ["v"],
                "q_feat_dir": "q"
            }
        });
        serde_json::from_value::<PipelineConfig>(json).unwrap().train
    }

    #[test]
    fn test_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_lines(
            &dir,
            &[r#"{"qid": 1, "query": "a", "vid": "v1"}"#, "", r#"{"qid": 2, "query": "b", "vid": "v2"}"#],
        );
        let records = load_jsonl(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].vid, "v2");
    }

    #[test]
    fn test_reports_bad_line_number() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_lines(&dir, &[r#"{"qid": 1, "query": "a", "vid": "v1"}"#, "{not json"]);
        match load_jsonl(&path) {
            Err(PipelineError::Annotation { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected annotation error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_jsonl(Path::new("/nonexistent/anno.jsonl")).unwrap_err();
        assert!(matches!(err, PipelineError::Io { .. }));
    }

    #[test]
    fn test_domain_filter_for_highlight_datasets() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_lines(
            &dir,
            &[
                r#"{"qid": "a", "vid": "a", "domain": "BK"}"#,
                r#"{"qid": "b", "vid": "b", "domain": "VT"}"#,
                r#"{"qid": "c", "vid": "c", "domain": "BK"}"#,
            ],
        );
        let cfg = config_for(&path, "tvsum", Some("BK"));
        assert_eq!(cfg.dset_name, DatasetName::Tvsum);
        let records = load_split(&cfg).unwrap();
        let vids: Vec<_> = records.iter().map(|r| r.vid.as_str()).collect();
        assert_eq!(vids, ["a", "c"]);

        // Moment datasets ignore the domain entirely
        let cfg = config_for(&path, "charades", Some("BK"));
        assert_eq!(load_split(&cfg).unwrap().len(), 3);
    }

    #[test]
    fn test_data_ratio_keeps_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let lines: Vec<String> = (0..10)
            .map(|i| format!(r#"{{"qid": {i}, "query": "q", "vid": "v{i}"}}"#))
            .collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let path = write_lines(&dir, &refs);

        let mut cfg = config_for(&path, "qvhighlight", None);
        cfg.data_ratio = 0.35;
        let records = load_split(&cfg).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[2].vid, "v2");
    }
}
