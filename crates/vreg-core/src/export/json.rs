use serde::Serialize;

use super::RecordExporter;
use crate::error::ExportError;
use crate::models::config::ExportConfig;
use crate::models::record::FieldRecord;

/// JSON exporter: an array of objects keyed by field label.
#[derive(Debug, Clone, Default)]
pub struct JsonExporter {
    pretty: bool,
}

impl JsonExporter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    pub fn from_config(config: &ExportConfig) -> Self {
        Self::new(config.pretty_json)
    }

    /// Serialize one record as a single object rather than an array.
    pub fn export_record(&self, record: &FieldRecord) -> Result<Vec<u8>, ExportError> {
        self.to_bytes(record)
    }

    fn to_bytes<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, ExportError> {
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(value)?
        } else {
            serde_json::to_vec(value)?
        };
        Ok(bytes)
    }
}

impl RecordExporter for JsonExporter {
    fn export(&self, records: &[FieldRecord]) -> Result<Vec<u8>, ExportError> {
        self.to_bytes(records)
    }

    fn file_extension(&self) -> &str {
        "json"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registration::{RecordExtractor, VehicleExtractor};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_keys_in_field_order() {
        let record = VehicleExtractor::new().extract("Year of Manufacture 2019 HONDA");
        let bytes = JsonExporter::default().export(&[record]).unwrap();

        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"[{"Registration Mark":"","Make":"HONDA","Model":"","Chassis No":"","Engine No":"","Year of Manufacture":"2019","Owner":""}]"#
        );
    }

    #[test]
    fn test_single_record_is_an_object() {
        let record = VehicleExtractor::new().extract("Registration Mark AB1234");
        let bytes = JsonExporter::new(true).export_record(&record).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert!(String::from_utf8(bytes).unwrap().starts_with("{\n"));
        assert_eq!(value["Registration Mark"], "AB1234");
        assert_eq!(value["Owner"], "");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(JsonExporter::new(true).export(&[]).unwrap(), b"[]");
    }
}
