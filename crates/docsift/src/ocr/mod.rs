//! Optical character recognition.
//!
//! The [`OcrEngine`] is the only entry point extractors use. It wraps one
//! [`OcrBackend`]: the `tesseract` executable by default, the linked library with the
//! `tesseract` feature, or anything a caller supplies through
//! [`OcrEngine::with_backend`].

pub mod engine;
pub mod error;
pub mod tesseract_cli;
pub mod types;

#[cfg(feature = "tesseract")]
pub mod tesseract_backend;

pub use engine::{OcrBackend, OcrEngine, strip_control_characters};
pub use error::OcrError;
pub use types::{ColorMode, RasterImage};
