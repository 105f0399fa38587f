use std::fmt;

/// Failures inside an OCR backend. These never leave the OCR engine.
#[derive(Debug, Clone)]
pub enum OcrError {
    BackendUnavailable(String),
    InitializationFailed(String),
    InvalidConfiguration(String),
    ImageProcessingFailed(String),
    ProcessingFailed(String),
    IOError(String),
}

impl fmt::Display for OcrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BackendUnavailable(msg) => write!(f, "OCR backend unavailable: {}", msg),
            Self::InitializationFailed(msg) => write!(f, "OCR initialization failed: {}", msg),
            Self::InvalidConfiguration(msg) => write!(f, "Invalid configuration: {}", msg),
            Self::ImageProcessingFailed(msg) => write!(f, "Image processing failed: {}", msg),
            Self::ProcessingFailed(msg) => write!(f, "OCR processing failed: {}", msg),
            Self::IOError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for OcrError {}
