// ============================================================
// Data Pipeline
// ============================================================
// Everything from annotation files on disk to tensor batches:
//
//   *.jsonl annotations
//       │
//       ▼
//   annotations       → AnnotationRecord list (domain filter, ratio)
//       │
//       ▼
//   features / glove  → per-example query and video matrices
//       │
//       ▼
//   labels            → span and saliency supervision
//       │
//       ▼
//   MomentDataset     → implements Burn's Dataset trait
//       │
//       ▼
//   MomentBatcher     → pads, masks and stacks into tensors
//       │
//       ▼
//   DataLoader

/// JSON-lines annotation loading
pub mod annotations;

/// .npy / .npz feature loading, normalisation and tef
pub mod features;

/// GloVe word vectors as a query feature source
pub mod glove;

/// Span and saliency label construction
pub mod labels;

/// Burn Dataset over annotated examples
pub mod dataset;

/// Padding helpers shared by the batcher
pub mod collate;

/// Burn Batcher producing MomentBatch
pub mod batcher;
