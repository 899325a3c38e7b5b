//! Error types for the vreg-core library.
//!
//! Field extraction itself never fails: a field that cannot be found is an
//! empty string. Errors only come from the collaborators around it (OCR
//! provider, exporter) and from invalid configuration.

use thiserror::Error;

use crate::models::record::Field;

/// Main error type for the vreg library.
#[derive(Error, Debug)]
pub enum VregError {
    /// Upstream OCR provider failure.
    #[error("OCR provider error: {0}")]
    Ocr(#[from] OcrError),

    /// Downstream tabular export failure.
    #[error("export error: {0}")]
    Export(#[from] ExportError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors reported by an OCR provider.
#[derive(Error, Debug)]
pub enum OcrError {
    /// No API key or access token was supplied.
    #[error("no credentials configured for {0}")]
    MissingCredentials(String),

    /// The request never produced an HTTP response.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The provider rejected the credentials.
    #[error("authentication rejected ({status}): {message}")]
    Auth { status: u16, message: String },

    /// Rate limit or quota exhausted.
    #[error("quota exceeded: {0}")]
    Quota(String),

    /// The provider answered with an error.
    #[error("provider returned error {code}: {message}")]
    Provider { code: i64, message: String },

    /// The response body could not be understood.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// A credential file could not be loaded.
    #[error("invalid credentials: {0}")]
    Credentials(String),

    /// The input is not an image the provider accepts.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

impl OcrError {
    /// Whether a retry may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, OcrError::Transport(_) | OcrError::Quota(_))
            || matches!(self, OcrError::Provider { code, .. } if *code >= 500)
    }
}

/// Errors related to record export.
#[derive(Error, Debug)]
pub enum ExportError {
    /// CSV writer failure.
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization failure.
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Buffer flush failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to configuration loading and validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A label anchor is not a valid regular expression.
    #[error("invalid anchor for {field}: {anchor:?}: {source}")]
    InvalidAnchor {
        field: Field,
        anchor: String,
        #[source]
        source: regex::Error,
    },

    /// A field has no rules at all.
    #[error("no extraction rules configured for {0}")]
    NoRules(Field),

    /// A value is outside its accepted range.
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    /// The configuration file could not be read or written.
    #[error("failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid JSON for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result type for the vreg library.
pub type Result<T> = std::result::Result<T, VregError>;
