use crate::error::{ParseError, classify_io};
use std::fmt;

#[derive(Debug)]
pub enum PdfError {
    InvalidPdf(String),
    Encrypted,
    UnsupportedImage(String),
    ImageDecodingFailed(String),
    Io(std::io::Error),
}

impl fmt::Display for PdfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PdfError::InvalidPdf(msg) => write!(f, "Invalid PDF: {}", msg),
            PdfError::Encrypted => write!(f, "PDF is encrypted"),
            PdfError::UnsupportedImage(msg) => write!(f, "Unsupported image encoding: {}", msg),
            PdfError::ImageDecodingFailed(msg) => write!(f, "Image decoding failed: {}", msg),
            PdfError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for PdfError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PdfError::Io(err) => Some(err),
            _ => None,
        }
    }
}

// I/O errors are carried through untouched so transient ones stay retryable.
impl From<lopdf::Error> for PdfError {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(io_err) => PdfError::Io(io_err),
            _ => PdfError::InvalidPdf(err.to_string()),
        }
    }
}

impl From<PdfError> for ParseError {
    fn from(err: PdfError) -> Self {
        match err {
            PdfError::Io(io_err) => classify_io(io_err, |e| {
                ParseError::corrupt_or_encrypted_with_source("unreadable PDF data", e)
            }),
            other => ParseError::corrupt_or_encrypted(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, PdfError>;
