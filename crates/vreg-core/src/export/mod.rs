//! Tabular export of extracted records.

mod csv;
mod json;

pub use self::csv::CsvExporter;
pub use self::json::JsonExporter;

use crate::error::ExportError;
use crate::models::record::FieldRecord;

/// Trait for record exporters.
pub trait RecordExporter {
    /// Serialize records, one row (or object) per record, in field order.
    fn export(&self, records: &[FieldRecord]) -> Result<Vec<u8>, ExportError>;

    /// File extension for the produced format, without the dot.
    fn file_extension(&self) -> &str;
}
