// ============================================================
// Model-facing Tensors
// ============================================================
// The hand-off point between the data pipeline and a model:
// batches are moved to the training device and split into
// forward-pass inputs and loss targets.

pub mod inputs;

/// Backend used by the command-line tools.
#[cfg(not(feature = "wgpu"))]
pub type PipelineBackend = burn::backend::NdArray;

#[cfg(feature = "wgpu")]
pub type PipelineBackend = burn::backend::Wgpu;
