//! Subcommands and the helpers they share.

pub mod batch;
pub mod config;
pub mod process;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use vreg_core::models::config::{AdjacencyStrategy, OcrConfig, VregConfig};
use vreg_core::ocr::{PrerecognizedText, VisionClient, VisionCredentials};
use vreg_core::pipeline::{Document, Pipeline};
use vreg_core::registration::VehicleExtractor;
use vreg_core::{OcrError, VregError};

/// Environment variable holding a Vision API key.
pub const API_KEY_ENV: &str = "VREG_VISION_API_KEY";
/// Environment variable holding an OAuth access token.
pub const ACCESS_TOKEN_ENV: &str = "VREG_VISION_ACCESS_TOKEN";
/// Standard Google variable pointing at a service-account key file.
pub const SERVICE_ACCOUNT_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";

/// Credential flags shared by `process` and `batch`.
#[derive(Clone, Debug, Default, clap::Args)]
pub struct CredentialArgs {
    /// Google Cloud Vision API key
    #[arg(long)]
    pub api_key: Option<String>,

    /// Service-account JSON key file
    #[arg(long, value_name = "FILE")]
    pub credentials: Option<PathBuf>,
}

/// Adjacency strategy as a command-line value.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum StrategyArg {
    /// Value after the label on the same line or on the next line
    LineFollowing,
    /// Value after the label in flattened text
    Inline,
}

impl From<StrategyArg> for AdjacencyStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::LineFollowing => AdjacencyStrategy::LineFollowing,
            StrategyArg::Inline => AdjacencyStrategy::Inline,
        }
    }
}

/// What a file contains.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputKind {
    /// Scanned document, sent to the OCR provider.
    Image,
    /// OCR text produced elsewhere.
    Text,
}

impl InputKind {
    /// Classify a path by extension.
    pub fn of(path: &Path) -> Option<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "txt" => Some(InputKind::Text),
            "png" | "jpg" | "jpeg" | "webp" | "tif" | "tiff" | "bmp" | "gif" => {
                Some(InputKind::Image)
            }
            _ => None,
        }
    }
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vreg")
        .join("config.json")
}

/// Config file in use: the `--config` argument, else the default location.
pub fn config_file(config_path: Option<&str>) -> PathBuf {
    config_path.map(PathBuf::from).unwrap_or_else(default_config_path)
}

/// Load the configuration. A missing default file means defaults; a missing
/// explicit file is an error.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<VregConfig> {
    let path = config_file(config_path);

    if config_path.is_none() && !path.exists() {
        debug!("No config file at {}, using defaults", path.display());
        return Ok(VregConfig::default());
    }

    let config = VregConfig::from_file(&path).map_err(VregError::from)?;
    debug!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Build the extractor from configuration, with an optional strategy override.
pub fn build_extractor(
    config: &VregConfig,
    strategy: Option<StrategyArg>,
) -> anyhow::Result<VehicleExtractor> {
    let extractor = VehicleExtractor::from_config(&config.extraction).map_err(VregError::from)?;
    Ok(match strategy {
        Some(strategy) => extractor.with_strategy(strategy.into()),
        None => extractor,
    })
}

/// Credentials in priority order: `--api-key`, `--credentials`, config
/// file, then environment.
pub fn resolve_credentials(
    args: &CredentialArgs,
    config: &OcrConfig,
) -> Result<Option<VisionCredentials>, OcrError> {
    let non_empty = |v: String| Some(v.trim().to_string()).filter(|v| !v.is_empty());

    if let Some(key) = args.api_key.clone().and_then(non_empty) {
        return Ok(Some(VisionCredentials::ApiKey(key)));
    }
    if let Some(path) = &args.credentials {
        return VisionCredentials::service_account_file(path).map(Some);
    }
    if let Some(credentials) = VisionCredentials::from_config(config)? {
        return Ok(Some(credentials));
    }
    if let Some(key) = env::var(API_KEY_ENV).ok().and_then(non_empty) {
        return Ok(Some(VisionCredentials::ApiKey(key)));
    }
    if let Some(token) = env::var(ACCESS_TOKEN_ENV).ok().and_then(non_empty) {
        return Ok(Some(VisionCredentials::AccessToken(token)));
    }

    env::var(SERVICE_ACCOUNT_ENV)
        .ok()
        .and_then(non_empty)
        .map(|path| VisionCredentials::service_account_file(Path::new(&path)))
        .transpose()
}

/// Build a pipeline. The Vision client is only created when images must be
/// recognised, so text inputs need no credentials.
pub fn build_pipeline(
    config: &VregConfig,
    extractor: VehicleExtractor,
    credentials: &CredentialArgs,
    needs_ocr: bool,
) -> anyhow::Result<Pipeline> {
    if !needs_ocr {
        return Ok(Pipeline::new(Box::new(PrerecognizedText::default()), extractor));
    }

    let credentials = resolve_credentials(credentials, &config.ocr).map_err(VregError::from)?;
    let client = VisionClient::from_config(&config.ocr, credentials).map_err(VregError::from)?;
    Ok(Pipeline::new(Box::new(client), extractor))
}

/// Read one input file and run it through the pipeline.
pub async fn load_document(
    pipeline: &Pipeline,
    path: &Path,
    kind: InputKind,
) -> anyhow::Result<Document> {
    match kind {
        InputKind::Text => {
            let text = fs::read_to_string(path)?;
            Ok(pipeline.process_text(text))
        }
        InputKind::Image => {
            let bytes = fs::read(path)?;
            Ok(pipeline.process_image(bytes).await?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_kind() {
        assert_eq!(InputKind::of(Path::new("scan.JPG")), Some(InputKind::Image));
        assert_eq!(InputKind::of(Path::new("ocr/scan.txt")), Some(InputKind::Text));
        assert_eq!(InputKind::of(Path::new("scan.pdf")), None);
        assert_eq!(InputKind::of(Path::new("README")), None);
    }

    #[test]
    fn test_flag_wins_over_config() {
        let config = OcrConfig {
            access_token: Some("token".into()),
            ..OcrConfig::default()
        };
        let key = CredentialArgs {
            api_key: Some("key".into()),
            credentials: None,
        };
        let blank = CredentialArgs {
            api_key: Some("  ".into()),
            credentials: None,
        };

        assert!(matches!(
            resolve_credentials(&key, &config),
            Ok(Some(VisionCredentials::ApiKey(k))) if k == "key"
        ));
        assert!(matches!(
            resolve_credentials(&blank, &config),
            Ok(Some(VisionCredentials::AccessToken(t))) if t == "token"
        ));
    }

    #[test]
    fn test_credentials_file_is_loaded_before_config() {
        let dir = tempfile::tempdir().unwrap();
        let key = dir.path().join("key.json");
        fs::write(&key, "{ not json").unwrap();

        let config = OcrConfig {
            access_token: Some("token".into()),
            ..OcrConfig::default()
        };
        let args = CredentialArgs {
            api_key: None,
            credentials: Some(key),
        };

        assert!(matches!(
            resolve_credentials(&args, &config),
            Err(OcrError::Credentials(_))
        ));
    }
}
