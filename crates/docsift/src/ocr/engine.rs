//! Best-effort OCR front end.
//!
//! [`OcrEngine::image_to_text`] never fails. Backend errors, missing binaries and
//! even panics inside a backend are logged and turned into empty text, so callers can
//! treat OCR as an optional enhancement.

use super::error::OcrError;
use super::tesseract_cli::TesseractCliBackend;
use super::types::RasterImage;
use crate::core::config::OcrConfig;
use once_cell::sync::OnceCell;
use std::panic::{AssertUnwindSafe, catch_unwind};

/// Something that can read text out of pixels.
pub trait OcrBackend: Send + Sync {
    fn name(&self) -> &str;

    fn recognize(&self, image: &RasterImage, config: &OcrConfig) -> Result<String, OcrError>;
}

pub const TESSERACT_CLI_BACKEND: &str = "tesseract";
pub const TESSERACT_NATIVE_BACKEND: &str = "tesseract-native";

/// Owns one OCR backend and the settings passed to it.
///
/// The configured backend is resolved on first use. If it cannot be set up the
/// engine stays without a backend and every call yields an empty string.
pub struct OcrEngine {
    config: OcrConfig,
    backend: OnceCell<Option<Box<dyn OcrBackend>>>,
}

impl std::fmt::Debug for OcrEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcrEngine")
            .field("config", &self.config)
            .field("backend", &self.backend.get().map(|b| b.as_ref().map(|b| b.name().to_string())))
            .finish()
    }
}

impl OcrEngine {
    pub fn new(config: OcrConfig) -> Self {
        Self {
            config,
            backend: OnceCell::new(),
        }
    }

    /// Use a caller-supplied backend instead of the configured one.
    pub fn with_backend(config: OcrConfig, backend: impl OcrBackend + 'static) -> Self {
        let cell = OnceCell::new();
        let _ = cell.set(Some(Box::new(backend) as Box<dyn OcrBackend>));
        Self { config, backend: cell }
    }

    /// An engine that always returns empty text.
    pub fn disabled() -> Self {
        let cell = OnceCell::new();
        let _ = cell.set(None);
        Self {
            config: OcrConfig {
                enabled: false,
                ..OcrConfig::default()
            },
            backend: cell,
        }
    }

    pub fn config(&self) -> &OcrConfig {
        &self.config
    }

    /// Name of the backend in use, resolving it if needed.
    pub fn backend_name(&self) -> Option<&str> {
        self.backend().map(|b| b.name())
    }

    fn backend(&self) -> Option<&dyn OcrBackend> {
        self.backend
            .get_or_init(|| resolve_backend(&self.config))
            .as_deref()
    }

    /// Recognize text in `image`. Returns an empty string on any failure.
    pub fn image_to_text(&self, image: &RasterImage) -> String {
        if !self.config.enabled {
            return String::new();
        }

        let Some(backend) = self.backend() else {
            return String::new();
        };

        let outcome = catch_unwind(AssertUnwindSafe(|| backend.recognize(image, &self.config)));

        match outcome {
            Ok(Ok(text)) => {
                tracing::debug!(
                    backend = backend.name(),
                    width = image.width,
                    height = image.height,
                    chars = text.len(),
                    "OCR completed"
                );
                strip_control_characters(&text)
            }
            Ok(Err(err)) => {
                tracing::error!(backend = backend.name(), error = %err, "OCR failed, using empty text");
                String::new()
            }
            Err(_) => {
                tracing::error!(backend = backend.name(), "OCR backend panicked, using empty text");
                String::new()
            }
        }
    }
}

fn resolve_backend(config: &OcrConfig) -> Option<Box<dyn OcrBackend>> {
    if !config.enabled {
        return None;
    }

    let resolved: Result<Box<dyn OcrBackend>, OcrError> = match config.backend.as_str() {
        TESSERACT_CLI_BACKEND => {
            TesseractCliBackend::probe(&config.tesseract_cmd).map(|b| Box::new(b) as Box<dyn OcrBackend>)
        }
        #[cfg(feature = "tesseract")]
        TESSERACT_NATIVE_BACKEND => {
            super::tesseract_backend::TesseractBackend::new(config).map(|b| Box::new(b) as Box<dyn OcrBackend>)
        }
        #[cfg(not(feature = "tesseract"))]
        TESSERACT_NATIVE_BACKEND => Err(OcrError::BackendUnavailable(
            "built without the `tesseract` feature".to_string(),
        )),
        other => Err(OcrError::InvalidConfiguration(format!("unknown OCR backend '{}'", other))),
    };

    match resolved {
        Ok(backend) => {
            tracing::debug!(backend = backend.name(), "OCR backend ready");
            Some(backend)
        }
        Err(err) => {
            tracing::warn!(backend = %config.backend, error = %err, "OCR backend unavailable, OCR will yield empty text");
            None
        }
    }
}

/// Drop C0 control characters and DEL, keeping newlines, carriage returns and tabs.
pub fn strip_control_characters(text: &str) -> String {
    if text
        .chars()
        .any(|c| matches!(c, '\u{0000}'..='\u{001F}' | '\u{007F}') && !matches!(c, '\n' | '\r' | '\t'))
    {
        text.chars()
            .filter(|c| !matches!(c, '\u{0000}'..='\u{001F}' | '\u{007F}') || matches!(c, '\n' | '\r' | '\t'))
            .collect()
    } else {
        text.to_string()
    }
}
