//! OCR through the linked Tesseract library.

use super::engine::OcrBackend;
use super::error::OcrError;
use super::types::RasterImage;
use crate::core::config::OcrConfig;
use kreuzberg_tesseract::{TessPageSegMode, TesseractAPI};
use std::env;
use std::path::Path;

const TESSDATA_FALLBACK_PATHS: &[&str] = &[
    "/opt/homebrew/share/tessdata",
    "/opt/homebrew/opt/tesseract/share/tessdata",
    "/usr/local/opt/tesseract/share/tessdata",
    "/usr/share/tesseract-ocr/5/tessdata",
    "/usr/share/tesseract-ocr/4/tessdata",
    "/usr/share/tessdata",
    "/usr/local/share/tessdata",
];

/// Runs recognition in-process. A fresh API handle is created per image.
#[derive(Debug, Clone)]
pub struct TesseractBackend {
    tessdata_path: String,
}

impl TesseractBackend {
    /// Locate tessdata (`TESSDATA_PREFIX` first, then well-known install paths) and
    /// check that every requested language has a traineddata file.
    pub fn new(config: &OcrConfig) -> Result<Self, OcrError> {
        let tessdata_path = env::var("TESSDATA_PREFIX")
            .ok()
            .or_else(|| {
                TESSDATA_FALLBACK_PATHS
                    .iter()
                    .find(|p| Path::new(p).exists())
                    .map(|p| (*p).to_string())
            })
            .unwrap_or_default();

        if config.language.trim().is_empty() {
            return Err(OcrError::InitializationFailed(
                "Language cannot be empty. Please specify a valid language code (e.g., 'eng')".to_string(),
            ));
        }

        // A missing traineddata file crashes the library instead of returning an error.
        if !tessdata_path.is_empty() {
            for lang in config.language.split('+').map(str::trim).filter(|l| !l.is_empty()) {
                let traineddata = Path::new(&tessdata_path).join(format!("{}.traineddata", lang));
                if !traineddata.exists() {
                    return Err(OcrError::InitializationFailed(format!(
                        "Language '{}' not found. Traineddata file does not exist: {}",
                        lang,
                        traineddata.display()
                    )));
                }
            }
        }

        Ok(Self { tessdata_path })
    }
}

impl OcrBackend for TesseractBackend {
    fn name(&self) -> &str {
        "tesseract-native"
    }

    fn recognize(&self, image: &RasterImage, config: &OcrConfig) -> Result<String, OcrError> {
        let api = TesseractAPI::new();

        api.init(&self.tessdata_path, &config.language).map_err(|e| {
            OcrError::InitializationFailed(format!("Failed to initialize language '{}': {}", config.language, e))
        })?;

        api.set_page_seg_mode(TessPageSegMode::from_int(config.psm as i32))
            .map_err(|e| OcrError::InvalidConfiguration(format!("Failed to set PSM mode: {}", e)))?;

        api.set_image(
            &image.pixels,
            image.width as i32,
            image.height as i32,
            image.color.bytes_per_pixel() as i32,
            image.bytes_per_line() as i32,
        )
        .map_err(|e| OcrError::ProcessingFailed(format!("Failed to set image: {}", e)))?;

        api.recognize()
            .map_err(|e| OcrError::ProcessingFailed(format!("Failed to recognize text: {}", e)))?;

        api.get_utf8_text()
            .map_err(|e| OcrError::ProcessingFailed(format!("Failed to extract text: {}", e)))
    }
}
