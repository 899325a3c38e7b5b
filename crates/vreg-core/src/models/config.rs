//! Configuration structures for the extraction pipeline.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::models::record::Field;
use crate::registration::rules::patterns::default_rules;

/// Main configuration for vreg.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VregConfig {
    /// Field extraction configuration.
    pub extraction: ExtractionConfig,

    /// OCR provider configuration.
    pub ocr: OcrConfig,

    /// Export configuration.
    pub export: ExportConfig,
}

/// How a value is located relative to its label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjacencyStrategy {
    /// Layout-preserving text; the value follows the label on the same line
    /// or sits on the next line.
    #[default]
    LineFollowing,
    /// Flattened text; the value is whatever follows the label up to the
    /// next known label.
    Inline,
}

/// Where a rule looks for the value once its label is found.
///
/// Only meaningful for [`AdjacencyStrategy::LineFollowing`]; the inline
/// strategy always reads the text following the label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capture {
    /// Rest of the label line, then the next line.
    #[default]
    Following,
    /// Rest of the label line only.
    SameLine,
    /// The next line only.
    NextLine,
}

/// One entry of a field's prioritized rule list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    /// Regex of label alternatives, matched case-insensitively.
    pub anchor: String,

    /// Where the value is read from.
    #[serde(default)]
    pub capture: Capture,
}

impl RuleSpec {
    pub fn new(anchor: impl Into<String>, capture: Capture) -> Self {
        Self {
            anchor: anchor.into(),
            capture,
        }
    }
}

/// A Latin transliteration and the native-script name it stands for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownName {
    pub latin: String,
    pub native: String,
}

/// Field extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Adjacency strategy, applied to every field.
    pub strategy: AdjacencyStrategy,

    /// Minimum length of a chassis number.
    pub chassis_min_length: usize,

    /// Read Make from the Year of Manufacture line when it has no label.
    pub make_from_year_line: bool,

    /// Replace a known Latin owner name with its native rendering.
    pub known_name_correction: bool,

    /// Known-name correction pairs.
    pub known_names: Vec<KnownName>,

    /// Rules per field, most specific first. Fields left out use the
    /// built-in rules.
    pub rules: BTreeMap<Field, Vec<RuleSpec>>,
}

/// Accepted chassis length bounds (short legacy frames up to a full VIN).
pub const CHASSIS_MIN_LENGTH_RANGE: std::ops::RangeInclusive<usize> = 8..=17;

/// Upper bound for `ocr.max_retries`.
pub const MAX_RETRIES: u32 = 10;

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            strategy: AdjacencyStrategy::LineFollowing,
            chassis_min_length: 10,
            make_from_year_line: true,
            known_name_correction: true,
            known_names: vec![KnownName {
                latin: "LEUNG, CHI CHUNG".to_string(),
                native: "梁智聰".to_string(),
            }],
            rules: default_rules(),
        }
    }
}

impl ExtractionConfig {
    /// Check values that serde cannot check.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !CHASSIS_MIN_LENGTH_RANGE.contains(&self.chassis_min_length) {
            return Err(ConfigError::InvalidValue {
                key: "extraction.chassis_min_length".to_string(),
                reason: format!(
                    "{} is outside {}..={}",
                    self.chassis_min_length,
                    CHASSIS_MIN_LENGTH_RANGE.start(),
                    CHASSIS_MIN_LENGTH_RANGE.end()
                ),
            });
        }

        if let Some((field, _)) = self.rules.iter().find(|(_, rules)| rules.is_empty()) {
            return Err(ConfigError::NoRules(*field));
        }

        for pair in &self.known_names {
            if pair.latin.trim().is_empty() || pair.native.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: "extraction.known_names".to_string(),
                    reason: "both latin and native names are required".to_string(),
                });
            }
        }

        Ok(())
    }
}

/// Text detection feature requested from the OCR provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionFeature {
    /// Sparse text detection.
    #[default]
    TextDetection,
    /// Dense document text detection.
    DocumentTextDetection,
}

impl DetectionFeature {
    pub fn as_api_str(self) -> &'static str {
        match self {
            DetectionFeature::TextDetection => "TEXT_DETECTION",
            DetectionFeature::DocumentTextDetection => "DOCUMENT_TEXT_DETECTION",
        }
    }
}

/// OCR provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Vision `images:annotate` endpoint.
    pub endpoint: String,

    /// API key, sent as the `key` query parameter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// OAuth access token, sent as a bearer token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// Service-account JSON key file, exchanged for access tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_account_file: Option<PathBuf>,

    /// Detection feature.
    pub feature: DetectionFeature,

    /// Language hints passed to the provider.
    pub language_hints: Vec<String>,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Retries for transient failures.
    pub max_retries: u32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://vision.googleapis.com/v1/images:annotate".to_string(),
            api_key: None,
            access_token: None,
            service_account_file: None,
            feature: DetectionFeature::TextDetection,
            language_hints: vec!["zh-Hant".to_string(), "en".to_string()],
            timeout_secs: 30,
            max_retries: 2,
        }
    }
}

/// Export configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Prefix CSV output with a UTF-8 byte order mark.
    pub csv_bom: bool,

    /// CSV field delimiter.
    pub csv_delimiter: char,

    /// Write the header row.
    pub include_header: bool,

    /// Pretty-print JSON output.
    pub pretty_json: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            csv_bom: true,
            csv_delimiter: ',',
            include_header: true,
            pretty_json: false,
        }
    }
}

impl VregConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.extraction.validate()?;

        if self.ocr.max_retries > MAX_RETRIES {
            return Err(ConfigError::InvalidValue {
                key: "ocr.max_retries".to_string(),
                reason: format!("{} is above {}", self.ocr.max_retries, MAX_RETRIES),
            });
        }

        if !self.export.csv_delimiter.is_ascii() {
            return Err(ConfigError::InvalidValue {
                key: "export.csv_delimiter".to_string(),
                reason: "delimiter must be a single ASCII character".to_string(),
            });
        }

        Ok(())
    }
}
