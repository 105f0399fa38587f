//! docsift - text extraction for files of unknown or misleading type
//!
//! Given a path, docsift works out what the file really is, extracts its text with a
//! format-specific extractor and falls back to OCR where a page or image carries no
//! text layer. Every failure is one variant of [`ParseError`].
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use docsift::{ParsePipeline, ParserConfig};
//!
//! # fn main() -> docsift::Result<()> {
//! let pipeline = ParsePipeline::new(ParserConfig::default());
//! let text = pipeline.parse("invoice.pdf")?;
//! println!("Extracted: {}", text);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Core Module** (`core`): size guard, format sniffing, retry, the parse pipeline, config loading
//! - **Extractors** (`extractors`): ZIP, plain text, PDF, DOCX, XLSX and images
//! - **OCR** (`ocr`): best-effort recognition through a pluggable backend
//! - **PDF** (`pdf`): locating the raster image behind scanned pages
//!
//! # Features
//!
//! - `content-sniffing` (default): magic-byte inspection. Without it the format is
//!   taken from the file extension alone.
//! - `tesseract`: linked Tesseract backend instead of the `tesseract` executable.

#![deny(unsafe_code)]

pub mod core;
pub mod error;
pub mod extractors;
pub mod ocr;
pub mod pdf;
pub mod types;

pub use error::{ParseError, Result};
pub use types::*;

pub use core::config::{ConfigError, OcrConfig, ParserConfig, PdfConfig, RetryConfig};
pub use core::pipeline::{ParsePipeline, ParseState, ProgressEvent};
pub use core::retry::{Clock, ManualClock, RetryPolicy, SystemClock};

pub use core::mime::{
    DOCX_MIME_TYPE, EXCEL_MIME_TYPE, OCTET_STREAM_MIME_TYPE, PDF_MIME_TYPE, PLAIN_TEXT_MIME_TYPE, ZIP_MIME_TYPE,
    FormatSniffer, content_inspection_available, select_format,
};

pub use ocr::{OcrBackend, OcrEngine, RasterImage};
