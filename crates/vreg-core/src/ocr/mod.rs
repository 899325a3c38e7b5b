//! OCR provider boundary.
//!
//! Text recognition is delegated to an external service. The core only
//! needs `(image bytes) -> text`; an empty answer is valid and simply
//! produces an empty record downstream.

#[cfg(feature = "vision")]
mod vision;

#[cfg(feature = "vision")]
pub use vision::{VisionClient, VisionCredentials};

use async_trait::async_trait;
use image::ImageFormat;

use crate::error::OcrError;

/// Formats accepted for upload.
const ACCEPTED_FORMATS: [ImageFormat; 6] = [
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::WebP,
    ImageFormat::Tiff,
    ImageFormat::Bmp,
    ImageFormat::Gif,
];

/// An encoded image whose format has been checked.
#[derive(Debug, Clone)]
pub struct ImageInput {
    bytes: Vec<u8>,
    format: ImageFormat,
}

impl ImageInput {
    /// Sniff the format of encoded image bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, OcrError> {
        if bytes.is_empty() {
            return Err(OcrError::InvalidImage("empty file".to_string()));
        }

        let format = image::guess_format(&bytes)
            .map_err(|e| OcrError::InvalidImage(e.to_string()))?;

        if !ACCEPTED_FORMATS.contains(&format) {
            return Err(OcrError::InvalidImage(format!("unsupported format {:?}", format)));
        }

        Ok(Self { bytes, format })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }
}

/// Trait for OCR providers.
#[async_trait]
pub trait OcrProvider: Send + Sync {
    /// Provider name for logs and error messages.
    fn name(&self) -> &str;

    /// Recognize the full text of an image.
    async fn recognize(&self, image: &ImageInput) -> Result<String, OcrError>;
}

/// Provider that returns text recognised elsewhere.
#[derive(Debug, Clone, Default)]
pub struct PrerecognizedText {
    text: String,
}

impl PrerecognizedText {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl OcrProvider for PrerecognizedText {
    fn name(&self) -> &str {
        "prerecognized"
    }

    async fn recognize(&self, _image: &ImageInput) -> Result<String, OcrError> {
        Ok(self.text.clone())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// 1x1 transparent PNG.
    pub(crate) const TINY_PNG: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
        0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
        0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
        0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
    ];

    #[test]
    fn test_accepts_png() {
        let image = ImageInput::from_bytes(TINY_PNG.to_vec()).unwrap();
        assert_eq!(image.format(), ImageFormat::Png);
    }

    #[test]
    fn test_rejects_non_images() {
        assert!(matches!(
            ImageInput::from_bytes(Vec::new()),
            Err(OcrError::InvalidImage(_))
        ));
        assert!(matches!(
            ImageInput::from_bytes(b"Registration Mark AB1234".to_vec()),
            Err(OcrError::InvalidImage(_))
        ));
    }

    #[tokio::test]
    async fn test_prerecognized_text() {
        let image = ImageInput::from_bytes(TINY_PNG.to_vec()).unwrap();
        let provider = PrerecognizedText::new("Make\nTOYOTA");
        assert_eq!(provider.recognize(&image).await.unwrap(), "Make\nTOYOTA");
    }
}
