// ============================================================
// Domain Layer
// ============================================================
// Plain Rust types describing annotated examples and the labels
// derived from them. No burn types, no file I/O.

// One line of a JSONL annotation file
pub mod annotation;

// Span and saliency label types
pub mod labels;

// Seams the data layer implements
pub mod traits;
