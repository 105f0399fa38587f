//! Per-format extractors.
//!
//! Every extractor turns one file into a lazy, finite sequence of
//! [`ExtractionChunk`]s. An extractor is consumed by [`Extractor::extract`], so a
//! sequence can never be restarted: a retry builds a new extractor through
//! [`extractor_for`] and starts over.

pub mod archive;
pub mod docx;
pub mod excel;
pub mod image;
pub mod pdf;
pub mod text;

use crate::Result;
use crate::core::config::PdfConfig;
use crate::ocr::OcrEngine;
use crate::types::{ExtractionChunk, Format};
use std::path::Path;
use std::sync::Arc;

pub use archive::ZipExtractor;
pub use docx::DocxExtractor;
pub use excel::XlsxExtractor;
pub use image::ImageExtractor;
pub use pdf::PdfExtractor;
pub use text::PlainTextExtractor;

/// Lazily produced chunks. An `Err` item ends the extraction.
pub type ChunkStream = Box<dyn Iterator<Item = Result<ExtractionChunk>>>;

/// Format-specific text extraction.
pub trait Extractor {
    fn name(&self) -> &str;

    fn format(&self) -> Format;

    /// Open `path` and return its chunks.
    ///
    /// Structural problems detected while opening (bad signature, missing parts,
    /// encryption) are returned here; problems found later surface as `Err` items.
    fn extract(self: Box<Self>, path: &Path) -> Result<ChunkStream>;
}

/// Shared collaborators handed to extractors that need them.
#[derive(Debug, Clone)]
pub struct ExtractorContext {
    pub ocr: Arc<OcrEngine>,
    pub pdf: PdfConfig,
}

impl ExtractorContext {
    pub fn new(ocr: Arc<OcrEngine>, pdf: PdfConfig) -> Self {
        Self { ocr, pdf }
    }
}

/// Builds a fresh extractor per attempt, for callers that bring their own extractor.
pub type ExtractorFactory = Arc<dyn Fn(&ExtractorContext) -> Box<dyn Extractor> + Send + Sync>;

/// Build a fresh extractor for `format`.
pub fn extractor_for(format: Format, ctx: &ExtractorContext) -> Box<dyn Extractor> {
    match format {
        Format::Zip => Box::new(ZipExtractor::new()),
        Format::Pdf => Box::new(PdfExtractor::new(Arc::clone(&ctx.ocr), ctx.pdf.max_form_depth)),
        Format::Text => Box::new(PlainTextExtractor::new()),
        Format::Docx => Box::new(DocxExtractor::new()),
        Format::Xlsx => Box::new(XlsxExtractor::new()),
        Format::Image => Box::new(ImageExtractor::new(Arc::clone(&ctx.ocr))),
    }
}
