//! Image-to-record pipeline.

use tracing::{debug, info};

use crate::error::Result;
use crate::ocr::{ImageInput, OcrProvider};
use crate::registration::{ExtractionResult, RegistrationParser, VehicleExtractor};

/// Runs OCR on an image, then field extraction on the recognised text.
pub struct Pipeline {
    provider: Box<dyn OcrProvider>,
    extractor: VehicleExtractor,
}

/// Output of one pipeline run.
#[derive(Debug, Clone)]
pub struct Document {
    /// Raw text returned by the OCR provider.
    pub ocr_text: String,
    /// Extraction over that text.
    pub extraction: ExtractionResult,
}

impl Pipeline {
    pub fn new(provider: Box<dyn OcrProvider>, extractor: VehicleExtractor) -> Self {
        Self { provider, extractor }
    }

    pub fn extractor(&self) -> &VehicleExtractor {
        &self.extractor
    }

    /// Recognise and extract one encoded image.
    ///
    /// An image with no text is not an error; it yields an empty record.
    pub async fn process_image(&self, bytes: Vec<u8>) -> Result<Document> {
        let image = ImageInput::from_bytes(bytes)?;
        debug!(format = ?image.format(), provider = self.provider.name(), "recognising image");

        let ocr_text = self.provider.recognize(&image).await?;
        info!("OCR returned {} characters", ocr_text.len());

        Ok(self.process_text(ocr_text))
    }

    /// Extract from text recognised elsewhere.
    pub fn process_text(&self, ocr_text: String) -> Document {
        let extraction = self.extractor.parse(&ocr_text);
        Document { ocr_text, extraction }
    }
}
