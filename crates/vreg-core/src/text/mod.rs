//! Text normalization ahead of field extraction.

mod normalizer;

pub use normalizer::{normalize, normalize_with_labels, NormalizationMode, NormalizedText};
