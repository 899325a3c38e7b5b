//! Vehicle registration field extraction module.

mod parser;
pub mod rules;

pub use parser::{Adjustment, ExtractionResult, RegistrationParser, VehicleExtractor};
pub use rules::FieldMatch;

use crate::models::record::FieldRecord;

/// Trait for registration record extractors.
pub trait RecordExtractor {
    /// Extract a record from plain OCR text.
    fn extract(&self, text: &str) -> FieldRecord;
}
