// ============================================================
// Infrastructure
// ============================================================
//   checkpoint.rs  builds models and saves/loads their weights
//                   with Burn's CompactRecorder

pub mod checkpoint;
