//! Google Cloud Vision `images:annotate` client.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use gcp_auth::{CustomServiceAccount, TokenProvider};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{ImageInput, OcrProvider};
use crate::error::OcrError;
use crate::models::config::{DetectionFeature, OcrConfig};

/// Base delay between retries; doubled on every attempt.
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// OAuth scope requested for service-account tokens.
const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Credentials accepted by the Vision REST API.
#[derive(Clone)]
pub enum VisionCredentials {
    /// API key, sent as the `key` query parameter.
    ApiKey(String),
    /// OAuth 2.0 access token, sent as a bearer token.
    AccessToken(String),
    /// Service-account key; access tokens are minted and cached on demand.
    ServiceAccount(Arc<CustomServiceAccount>),
}

impl VisionCredentials {
    /// Load a service-account JSON key file.
    pub fn service_account_file(path: &Path) -> Result<Self, OcrError> {
        CustomServiceAccount::from_file(path)
            .map(|account| VisionCredentials::ServiceAccount(Arc::new(account)))
            .map_err(|e| OcrError::Credentials(format!("{}: {}", path.display(), e)))
    }

    /// Credentials from configuration: API key, then access token, then
    /// service-account file.
    pub fn from_config(config: &OcrConfig) -> Result<Option<Self>, OcrError> {
        let non_empty = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        if let Some(key) = non_empty(&config.api_key) {
            return Ok(Some(VisionCredentials::ApiKey(key)));
        }
        if let Some(token) = non_empty(&config.access_token) {
            return Ok(Some(VisionCredentials::AccessToken(token)));
        }

        config
            .service_account_file
            .as_deref()
            .map(Self::service_account_file)
            .transpose()
    }
}

impl std::fmt::Debug for VisionCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VisionCredentials::ApiKey(_) => f.write_str("ApiKey(***)"),
            VisionCredentials::AccessToken(_) => f.write_str("AccessToken(***)"),
            VisionCredentials::ServiceAccount(_) => f.write_str("ServiceAccount(***)"),
        }
    }
}

#[derive(Serialize)]
struct AnnotateRequest<'a> {
    requests: Vec<AnnotateImageRequest<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageRequest<'a> {
    image: ImageContent,
    features: Vec<Feature>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_context: Option<ImageContext<'a>>,
}

#[derive(Serialize)]
struct ImageContent {
    content: String,
}

#[derive(Serialize)]
struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageContext<'a> {
    language_hints: &'a [String],
}

#[derive(Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    #[serde(default)]
    text_annotations: Vec<EntityAnnotation>,
    full_text_annotation: Option<TextAnnotation>,
    error: Option<Status>,
}

#[derive(Deserialize)]
struct EntityAnnotation {
    #[serde(default)]
    description: String,
}

#[derive(Deserialize)]
struct TextAnnotation {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct Status {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: Status,
}

/// Google Cloud Vision OCR provider.
pub struct VisionClient {
    client: Client,
    endpoint: String,
    credentials: VisionCredentials,
    feature: DetectionFeature,
    language_hints: Vec<String>,
    max_retries: u32,
}

impl VisionClient {
    /// Create a client with default settings.
    pub fn new(credentials: VisionCredentials) -> Result<Self, OcrError> {
        Self::from_config(&OcrConfig::default(), Some(credentials))
    }

    /// Create a client from configuration. Explicit credentials override the
    /// ones in `config`.
    pub fn from_config(
        config: &OcrConfig,
        credentials: Option<VisionCredentials>,
    ) -> Result<Self, OcrError> {
        let credentials = match credentials {
            Some(credentials) => credentials,
            None => VisionCredentials::from_config(config)?
                .ok_or_else(|| OcrError::MissingCredentials("Google Cloud Vision".to_string()))?,
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| OcrError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            credentials,
            feature: config.feature,
            language_hints: config.language_hints.clone(),
            max_retries: config.max_retries,
        })
    }

    fn request_body<'a>(&'a self, image: &ImageInput) -> AnnotateRequest<'a> {
        AnnotateRequest {
            requests: vec![AnnotateImageRequest {
                image: ImageContent {
                    content: STANDARD.encode(image.bytes()),
                },
                features: vec![Feature {
                    kind: self.feature.as_api_str(),
                }],
                image_context: (!self.language_hints.is_empty()).then(|| ImageContext {
                    language_hints: &self.language_hints,
                }),
            }],
        }
    }

    async fn send_once(&self, body: &AnnotateRequest<'_>) -> Result<String, OcrError> {
        let request = self.client.post(&self.endpoint).json(body);
        let request = match &self.credentials {
            VisionCredentials::ApiKey(key) => request.query(&[("key", key)]),
            VisionCredentials::AccessToken(token) => request.bearer_auth(token),
            VisionCredentials::ServiceAccount(account) => {
                let token = account
                    .token(&[CLOUD_PLATFORM_SCOPE])
                    .await
                    .map_err(|e| OcrError::Transport(format!("token exchange failed: {}", e)))?;
                request.bearer_auth(token.as_str())
            }
        };

        let response = request
            .send()
            .await
            .map_err(|e| OcrError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| OcrError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(classify_http_error(status, &text));
        }

        parse_annotate_response(&text)
    }
}

#[async_trait]
impl OcrProvider for VisionClient {
    fn name(&self) -> &str {
        "google-cloud-vision"
    }

    async fn recognize(&self, image: &ImageInput) -> Result<String, OcrError> {
        let body = self.request_body(image);
        let mut attempt = 0;

        loop {
            debug!(attempt, bytes = image.bytes().len(), "Sending request to Cloud Vision");

            match self.send_once(&body).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    let delay = backoff_delay(attempt);
                    warn!("Cloud Vision request failed ({}), retrying in {:?}", e, delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn backoff_delay(attempt: u32) -> Duration {
    RETRY_BASE_DELAY.saturating_mul(2u32.saturating_pow(attempt))
}

/// Map a non-success HTTP answer to an error.
fn classify_http_error(status: StatusCode, body: &str) -> OcrError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.chars().take(200).collect());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => OcrError::Auth {
            status: status.as_u16(),
            message,
        },
        StatusCode::TOO_MANY_REQUESTS => OcrError::Quota(message),
        _ => OcrError::Provider {
            code: i64::from(status.as_u16()),
            message,
        },
    }
}

/// Extract the full text from an `images:annotate` response body.
fn parse_annotate_response(body: &str) -> Result<String, OcrError> {
    let parsed: AnnotateResponse =
        serde_json::from_str(body).map_err(|e| OcrError::InvalidResponse(e.to_string()))?;

    let Some(first) = parsed.responses.into_iter().next() else {
        return Err(OcrError::InvalidResponse("no responses".to_string()));
    };

    if let Some(err) = first.error.filter(|e| e.code != 0) {
        return Err(match err.status.as_str() {
            "RESOURCE_EXHAUSTED" => OcrError::Quota(err.message),
            "UNAUTHENTICATED" | "PERMISSION_DENIED" => OcrError::Auth {
                status: 403,
                message: err.message,
            },
            _ => OcrError::Provider {
                code: err.code,
                message: err.message,
            },
        });
    }

    let text = first
        .text_annotations
        .into_iter()
        .next()
        .map(|a| a.description)
        .or_else(|| first.full_text_annotation.map(|a| a.text))
        .unwrap_or_default();

    Ok(text)
}
