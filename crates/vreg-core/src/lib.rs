//! Core library for Hong Kong vehicle registration document extraction.
//!
//! This crate provides:
//! - Text normalization for OCR output (layout-preserving or flattened)
//! - Rule-driven extraction of the seven registration fields
//! - Google Cloud Vision OCR client (`vision` feature)
//! - CSV and JSON export of extracted records

pub mod error;
pub mod export;
pub mod models;
pub mod ocr;
pub mod pipeline;
pub mod registration;
pub mod text;

pub use error::{ConfigError, ExportError, OcrError, Result, VregError};
pub use export::{CsvExporter, JsonExporter, RecordExporter};
pub use models::config::{AdjacencyStrategy, VregConfig};
pub use models::record::{Field, FieldRecord};
pub use ocr::{ImageInput, OcrProvider, PrerecognizedText};
#[cfg(feature = "vision")]
pub use ocr::{VisionClient, VisionCredentials};
pub use pipeline::{Document, Pipeline};
pub use registration::{ExtractionResult, RecordExtractor, RegistrationParser, VehicleExtractor};
