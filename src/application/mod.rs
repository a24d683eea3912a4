// ============================================================
// Application / Use Cases
// ============================================================
// Workflow coordination only: each use case wires the data
// layer together for one CLI command and reports what happened
// through tracing.

/// Pipeline and per-split dataset settings
pub mod config;

/// Load every example of a split and summarise it
pub mod inspect_use_case;

/// Run a split through the DataLoader and model-input preparation
pub mod batches_use_case;
