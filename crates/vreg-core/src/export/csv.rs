use ::csv::WriterBuilder;

use super::RecordExporter;
use crate::error::ExportError;
use crate::models::config::ExportConfig;
use crate::models::record::{Field, FieldRecord};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// CSV exporter with one column per field.
#[derive(Debug, Clone)]
pub struct CsvExporter {
    bom: bool,
    delimiter: u8,
    header: bool,
}

impl CsvExporter {
    /// Comma-separated, with header and UTF-8 BOM.
    pub fn new() -> Self {
        Self {
            bom: true,
            delimiter: b',',
            header: true,
        }
    }

    /// Build from export configuration. Non-ASCII delimiters fall back to a comma.
    pub fn from_config(config: &ExportConfig) -> Self {
        let delimiter = if config.csv_delimiter.is_ascii() {
            config.csv_delimiter as u8
        } else {
            b','
        };

        Self {
            bom: config.csv_bom,
            delimiter,
            header: config.include_header,
        }
    }

    pub fn with_bom(mut self, bom: bool) -> Self {
        self.bom = bom;
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_header(mut self, header: bool) -> Self {
        self.header = header;
        self
    }

    /// Write records with leading extra columns (e.g. source file, status).
    ///
    /// `extra` supplies the column names; each row supplies matching values.
    pub fn export_with_columns<'a, I>(
        &self,
        extra: &[&str],
        rows: I,
    ) -> Result<Vec<u8>, ExportError>
    where
        I: IntoIterator<Item = (Vec<String>, &'a FieldRecord)>,
    {
        let mut buffer = Vec::new();
        if self.bom {
            buffer.extend_from_slice(UTF8_BOM);
        }

        let mut wtr = WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(buffer);

        if self.header {
            let header: Vec<&str> = extra
                .iter()
                .copied()
                .chain(Field::ALL.iter().map(|f| f.label()))
                .collect();
            wtr.write_record(&header)?;
        }

        for (columns, record) in rows {
            let row: Vec<&str> = columns
                .iter()
                .map(String::as_str)
                .chain(record.to_row())
                .collect();
            wtr.write_record(&row)?;
        }

        wtr.into_inner().map_err(|e| ExportError::Io(e.into_error()))
    }
}

impl Default for CsvExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordExporter for CsvExporter {
    fn export(&self, records: &[FieldRecord]) -> Result<Vec<u8>, ExportError> {
        self.export_with_columns(&[], records.iter().map(|r| (Vec::new(), r)))
    }

    fn file_extension(&self) -> &str {
        if self.delimiter == b'\t' { "tsv" } else { "csv" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registration::{RecordExtractor, VehicleExtractor};
    use pretty_assertions::assert_eq;

    fn sample() -> FieldRecord {
        VehicleExtractor::new()
            .extract("Registration Mark\nAB1234\nMake\nTOYOTA\nModel\nCOROLLA-2020\n")
    }

    #[test]
    fn test_header_and_row() {
        let bytes = CsvExporter::new().with_bom(false).export(&[sample()]).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert_eq!(
            text,
            "Registration Mark,Make,Model,Chassis No,Engine No,Year of Manufacture,Owner\n\
             AB1234,TOYOTA,COROLLA-2020,,,,\n"
        );
    }

    #[test]
    fn test_bom_prefix() {
        let bytes = CsvExporter::new().export(&[]).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        assert!(String::from_utf8_lossy(&bytes[3..]).starts_with("Registration Mark,"));
    }

    #[test]
    fn test_empty_record_keeps_column_count() {
        let bytes = CsvExporter::new()
            .with_bom(false)
            .with_header(false)
            .export(&[FieldRecord::default()])
            .unwrap();
        assert_eq!(bytes, b",,,,,,\n");
    }

    #[test]
    fn test_extra_columns_and_delimiter() {
        let record = sample();
        let exporter = CsvExporter::new().with_bom(false).with_delimiter(b';');
        let bytes = exporter
            .export_with_columns(
                &["source", "status"],
                [(vec!["scan.png".to_string(), "ok".to_string()], &record)],
            )
            .unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert!(lines[0].starts_with("source;status;Registration Mark;"));
        assert_eq!(lines[1], "scan.png;ok;AB1234;TOYOTA;COROLLA-2020;;;;");
    }

    #[test]
    fn test_chinese_owner_survives() {
        let record = VehicleExtractor::new().extract("LEUNG, CHI CHUNG 梁智聰");
        let bytes = CsvExporter::new().with_bom(false).with_header(false).export(&[record]).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), ",,,,,,梁智聰\n");
    }

    #[test]
    fn test_from_config() {
        let config = ExportConfig {
            csv_delimiter: '\t',
            ..ExportConfig::default()
        };
        assert_eq!(CsvExporter::from_config(&config).file_extension(), "tsv");
    }
}
