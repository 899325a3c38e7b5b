//! Data models: the extracted record and configuration.

pub mod config;
pub mod record;

pub use config::{
    AdjacencyStrategy, Capture, DetectionFeature, ExportConfig, ExtractionConfig, KnownName,
    OcrConfig, RuleSpec, VregConfig,
};
pub use record::{Field, FieldRecord};
