// ============================================================
// Label Constructors
// ============================================================
// Turn raw annotations into span and saliency supervision.
//
//   span_labels             windows (s) → [center, width] or clip indices
//   saliency_sub_as_query   Charades / TACoS / ActivityNet (one window)
//   saliency_qvhighlight    QVHighlights (per-annotator clip scores)
//   saliency_tvsum          TVSum (20 annotators, scores 1..5)
//   saliency_youtube        YouTube Highlights (binary)
//
// Every sampler takes the RNG explicitly so a seeded dataset is
// reproducible.

use ndarray::Array2;
use rand::{seq::index::sample, seq::SliceRandom, Rng};

use crate::domain::labels::{SaliencyLabels, SpanLabels, SpanLossType};

/// Positives/negatives drawn from the first window
const SUB_AS_QUERY_SAMPLES: usize = 2;
/// Hard (and easy) samples per side for score-based datasets
const HARD_SAMPLES: usize = 1;

/// TVSum scores run 1..=5 over 20 annotators; rescale the summed
/// (score - 1) to the 0..12 range QVHighlights uses.
const TVSUM_SCALE: f32 = 12.0 / 80.0;

// ─── Spans ────────────────────────────────────────────────────────────────────

/// [start, end] → [center, width]
pub fn span_xx_to_cxw(st: f32, ed: f32) -> [f32; 2] {
    [(st + ed) * 0.5, ed - st]
}

/// Build span labels for up to `max_windows` windows.
///
/// `ctx_l` is the number of clips actually loaded, so the
/// normaliser is `ctx_l * clip_len` seconds rather than the
/// annotated duration.
pub fn span_labels<R: Rng + ?Sized>(
    windows: &[[f64; 2]],
    ctx_l: usize,
    clip_len: f64,
    max_windows: usize,
    kind: SpanLossType,
    rng: &mut R,
) -> SpanLabels {
    let mut windows = windows.to_vec();
    if windows.len() > max_windows {
        windows.shuffle(rng);
        windows.truncate(max_windows);
    }

    match kind {
        SpanLossType::L1 => {
            let norm = ctx_l as f64 * clip_len;
            let mut out = Array2::<f32>::zeros((windows.len(), 2));
            for (mut row, w) in out.rows_mut().into_iter().zip(&windows) {
                let [c, width] = span_xx_to_cxw((w[0] / norm) as f32, (w[1] / norm) as f32);
                row[0] = c;
                row[1] = width;
            }
            SpanLabels::Cxw(out)
        }
        SpanLossType::Ce => SpanLabels::ClipIndices(
            windows
                .iter()
                .map(|w| {
                    let st = (w[0] / clip_len) as i64;
                    let ed = ((w[1] / clip_len) as i64).min(ctx_l as i64) - 1;
                    [st, ed]
                })
                .collect(),
        ),
    }
}

// ─── Saliency helpers ─────────────────────────────────────────────────────────

/// Ascending, stable argsort.
fn argsort(values: &[f32]) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..values.len()).collect();
    idx.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    idx
}

/// Draw `k` distinct elements of `pool`, or None if it is too small.
fn sample_from<R: Rng + ?Sized>(pool: &[usize], k: usize, rng: &mut R) -> Option<Vec<usize>> {
    if pool.len() < k {
        return None;
    }
    Some(sample(rng, pool.len(), k).into_iter().map(|i| pool[i]).collect())
}

/// Highest `n` as positives, lowest `n` as negatives, each mapped
/// through `to_clip` and clamped to the last clip.
fn hard_samples(
    agg: &[f32],
    n: usize,
    ctx_l: usize,
    to_clip: impl Fn(usize) -> usize,
) -> (Vec<usize>, Vec<usize>) {
    let order = argsort(agg);
    let last = ctx_l.saturating_sub(1);
    let k = n.min(order.len());
    let pos = order[order.len() - k..].iter().map(|&i| to_clip(i).min(last)).collect();
    let neg = order[..k].iter().map(|&i| to_clip(i).min(last)).collect();
    (pos, neg)
}

// ─── Charades / TACoS / ActivityNet ───────────────────────────────────────────

/// Saliency from a single ground-truth window: clips inside are
/// positive (score 1), clips outside are negative (score 0).
pub fn saliency_sub_as_query<R: Rng + ?Sized>(
    window: [f64; 2],
    duration: f64,
    ctx_l: usize,
    rng: &mut R,
) -> SaliencyLabels {
    let clip = duration / ctx_l as f64;
    let ed = ((window[1] / clip) as i64).min(ctx_l as i64) - 1;
    let ed = ed.max(0) as usize;
    let st = ((window[0] / clip).max(0.0) as usize).min(ed);

    let pos = if st != ed {
        let inside: Vec<usize> = (st..=ed).collect();
        sample_from(&inside, SUB_AS_QUERY_SAMPLES, rng).unwrap_or_else(|| vec![st, st])
    } else {
        vec![st; SUB_AS_QUERY_SAMPLES]
    };

    let outside: Vec<usize> = (0..st).chain(ed + 1..ctx_l).collect();
    let neg = sample_from(&outside, SUB_AS_QUERY_SAMPLES, rng).unwrap_or_else(|| pos.clone());

    let mut scores = vec![0.0f32; ctx_l.max(ed + 1)];
    scores[st..=ed].fill(1.0);
    scores.truncate(ctx_l);

    SaliencyLabels { pos, neg, scores }
}

// ─── QVHighlights ─────────────────────────────────────────────────────────────

/// Hard and easy positives/negatives from per-annotator scores.
///
/// Hard: the relevant clips with the highest and lowest summed
/// score. Easy: a random relevant clip and a random irrelevant one,
/// or copies of the hard ones when every clip is relevant.
pub fn saliency_hard<R: Rng + ?Sized>(
    rel_clip_ids: &[usize],
    scores: &[Vec<f64>],
    ctx_l: usize,
    rng: &mut R,
) -> (Vec<usize>, Vec<usize>) {
    let agg = aggregate_rows(scores);
    let n = agg.len().min(rel_clip_ids.len());
    let (hard_pos, hard_neg) = hard_samples(&agg[..n], HARD_SAMPLES, ctx_l, |i| rel_clip_ids[i]);

    let easy_pool: Vec<usize> = (0..ctx_l).filter(|c| !rel_clip_ids.contains(c)).collect();
    let easy = sample_from(rel_clip_ids, HARD_SAMPLES, rng)
        .zip(sample_from(&easy_pool, HARD_SAMPLES, rng));
    let (easy_pos, easy_neg) = match easy {
        Some(pair) => pair,
        None => (hard_pos.clone(), hard_neg.clone()),
    };

    let pos = hard_pos.into_iter().chain(easy_pos).collect();
    let neg = hard_neg.into_iter().chain(easy_neg).collect();
    (pos, neg)
}

/// `saliency_hard` plus a per-clip score array holding each relevant
/// clip's summed score.
pub fn saliency_qvhighlight<R: Rng + ?Sized>(
    rel_clip_ids: &[usize],
    scores: &[Vec<f64>],
    ctx_l: usize,
    rng: &mut R,
) -> SaliencyLabels {
    let agg = aggregate_rows(scores);

    // Relevant ids past the loaded clips grow the array to fit
    let needed = rel_clip_ids.iter().map(|&c| c + 1).max().unwrap_or(0);
    let mut score_array = vec![0.0f32; ctx_l.max(needed)];
    for (&clip, &s) in rel_clip_ids.iter().zip(&agg) {
        score_array[clip] = s;
    }

    let (pos, neg) = saliency_hard(rel_clip_ids, scores, ctx_l, rng);
    SaliencyLabels {
        pos,
        neg,
        scores: score_array,
    }
}

fn aggregate_rows(rows: &[Vec<f64>]) -> Vec<f32> {
    rows.iter().map(|r| r.iter().sum::<f64>() as f32).collect()
}

// ─── TVSum / YouTube Highlights ───────────────────────────────────────────────

/// TVSum: sum of (score - 1) over annotators, truncated to `ctx_l`.
pub fn saliency_tvsum(label: &[Vec<f64>], ctx_l: usize) -> SaliencyLabels {
    let agg: Vec<f32> = label
        .iter()
        .take(ctx_l)
        .map(|r| r.iter().map(|s| s - 1.0).sum::<f64>() as f32)
        .collect();
    let (pos, neg) = hard_samples(&agg, HARD_SAMPLES, ctx_l, |i| i);
    let scores = agg.iter().map(|s| s * TVSUM_SCALE).collect();
    SaliencyLabels { pos, neg, scores }
}

/// YouTube Highlights: binary score in the first column.
pub fn saliency_youtube(label: &[Vec<f64>], ctx_l: usize) -> SaliencyLabels {
    let agg: Vec<f32> = label
        .iter()
        .map(|r| r.first().copied().unwrap_or(0.0) as f32)
        .collect();
    let (pos, neg) = hard_samples(&agg, HARD_SAMPLES, ctx_l, |i| i);
    SaliencyLabels {
        pos,
        neg,
        scores: agg,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn test_l1_spans_are_center_width() {
        // 75 clips of 2s → 150s; window [26, 36]
        let spans = span_labels(&[[26.0, 36.0]], 75, 2.0, 5, SpanLossType::L1, &mut rng());
        let SpanLabels::Cxw(a) = spans else { panic!("expected cxw") };
        assert_eq!(a.dim(), (1, 2));
        assert!((a[[0, 0]] - 31.0 / 150.0).abs() < 1e-6);
        assert!((a[[0, 1]] - 10.0 / 150.0).abs() < 1e-6);
    }

    #[test]
    fn test_ce_spans_are_inclusive_clip_indices() {
        let spans = span_labels(
            &[[26.0, 36.0], [140.0, 200.0]],
            75,
            2.0,
            5,
            SpanLossType::Ce,
            &mut rng(),
        );
        assert_eq!(spans, SpanLabels::ClipIndices(vec![[13, 17], [70, 74]]));
    }

    #[test]
    fn test_span_window_cap() {
        let windows: Vec<[f64; 2]> = (0..8).map(|i| [i as f64 * 10.0, i as f64 * 10.0 + 4.0]).collect();
        let spans = span_labels(&windows, 75, 2.0, 5, SpanLossType::Ce, &mut rng());
        assert_eq!(spans.len(), 5);
        let SpanLabels::ClipIndices(idx) = spans else { panic!() };
        // every kept window is one of the originals
        for [st, _] in idx {
            assert_eq!(st % 5, 0);
        }
    }

    #[test]
    fn test_sub_as_query_window() {
        // 30s over 10 clips → 3s/clip; window [6, 15] → clips 2..=4
        let sal = saliency_sub_as_query([6.0, 15.0], 30.0, 10, &mut rng());
        assert_eq!(sal.scores, vec![0., 0., 1., 1., 1., 0., 0., 0., 0., 0.]);

        assert_eq!(sal.pos.len(), 2);
        assert_ne!(sal.pos[0], sal.pos[1]);
        assert!(sal.pos.iter().all(|c| (2..=4).contains(c)));

        assert_eq!(sal.neg.len(), 2);
        assert!(sal.neg.iter().all(|c| !(2..=4).contains(c) && *c < 10));
    }

    #[test]
    fn test_sub_as_query_single_clip_window() {
        // [3, 6.5] at 3s/clip → clip 1 only
        let sal = saliency_sub_as_query([3.0, 6.5], 30.0, 10, &mut rng());
        assert_eq!(sal.pos, vec![1, 1]);
        assert_eq!(sal.scores.iter().sum::<f32>(), 1.0);
    }

    #[test]
    fn test_sub_as_query_whole_video_falls_back_to_positives() {
        let sal = saliency_sub_as_query([0.0, 30.0], 30.0, 3, &mut rng());
        assert_eq!(sal.scores, vec![1.0, 1.0, 1.0]);
        // nothing outside the window to sample from
        assert_eq!(sal.neg, sal.pos);
    }

    #[test]
    fn test_sub_as_query_window_past_end_is_clamped() {
        let sal = saliency_sub_as_query([50.0, 60.0], 30.0, 10, &mut rng());
        assert_eq!(sal.pos, vec![9, 9]);
        assert_eq!(sal.scores.len(), 10);
        assert_eq!(sal.scores[9], 1.0);
    }

    #[test]
    fn test_qvhighlight_hard_and_easy() {
        let rel = [3, 4, 5];
        let scores = vec![vec![1.0, 1.0, 1.0], vec![4.0, 4.0, 4.0], vec![0.0, 0.0, 1.0]];
        let sal = saliency_qvhighlight(&rel, &scores, 10, &mut rng());

        // hard positive is clip 4 (sum 12), hard negative clip 5 (sum 1)
        assert_eq!(sal.pos[0], 4);
        assert_eq!(sal.neg[0], 5);
        assert_eq!(sal.pos.len(), 2);
        assert_eq!(sal.neg.len(), 2);
        assert!(rel.contains(&sal.pos[1]));
        assert!(!rel.contains(&sal.neg[1]));

        assert_eq!(sal.scores.len(), 10);
        assert_eq!(sal.scores[3], 3.0);
        assert_eq!(sal.scores[4], 12.0);
        assert_eq!(sal.scores[5], 1.0);
        assert_eq!(sal.scores[0], 0.0);
    }

    #[test]
    fn test_qvhighlight_all_relevant_copies_hard() {
        let rel = [0, 1];
        let scores = vec![vec![2.0], vec![1.0]];
        let (pos, neg) = saliency_hard(&rel, &scores, 2, &mut rng());
        assert_eq!(pos, vec![0, 0]);
        assert_eq!(neg, vec![1, 1]);
    }

    #[test]
    fn test_qvhighlight_ids_past_video_end() {
        let rel = [4, 7];
        let scores = vec![vec![1.0], vec![5.0]];
        let sal = saliency_qvhighlight(&rel, &scores, 5, &mut rng());
        // score array grows, sampled indices stay inside the video
        assert_eq!(sal.scores.len(), 8);
        assert_eq!(sal.scores[7], 5.0);
        assert_eq!(sal.pos[0], 4);
        assert!(sal.pos.iter().chain(&sal.neg).all(|&c| c < 8));
    }

    #[test]
    fn test_tvsum_scores() {
        // three clips, two annotators
        let label = vec![vec![1.0, 1.0], vec![5.0, 5.0], vec![3.0, 2.0], vec![4.0, 4.0]];
        let sal = saliency_tvsum(&label, 3);
        assert_eq!(sal.scores.len(), 3);
        assert!((sal.scores[1] - 8.0 * 12.0 / 80.0).abs() < 1e-6);
        assert_eq!(sal.scores[0], 0.0);
        assert_eq!(sal.pos, vec![1]);
        assert_eq!(sal.neg, vec![0]);
    }

    #[test]
    fn test_youtube_scores() {
        let label = vec![vec![0.0], vec![1.0], vec![0.0]];
        let sal = saliency_youtube(&label, 3);
        assert_eq!(sal.scores, vec![0.0, 1.0, 0.0]);
        assert_eq!(sal.pos, vec![1]);
        assert_eq!(sal.neg, vec![0]);
    }

    #[test]
    fn test_sampling_is_reproducible() {
        let a = saliency_sub_as_query([0.0, 20.0], 40.0, 20, &mut StdRng::seed_from_u64(1));
        let b = saliency_sub_as_query([0.0, 20.0], 40.0, 20, &mut StdRng::seed_from_u64(1));
        assert_eq!(a, b);
    }
}
