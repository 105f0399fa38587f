//! PDF extractor built on `lopdf`.
//!
//! Pages are processed lazily, one per chunk. When a page has no text layer the
//! first image reachable from its resources is handed to the OCR engine instead.

use super::{ChunkStream, Extractor};
use crate::ocr::OcrEngine;
use crate::pdf::error::PdfError;
use crate::pdf::PageImageResolver;
use crate::types::{ExtractionChunk, Format};
use crate::Result;
use lopdf::{Document, ObjectId};
use std::path::Path;
use std::sync::Arc;

pub struct PdfExtractor {
    ocr: Arc<OcrEngine>,
    max_form_depth: usize,
}

impl PdfExtractor {
    pub fn new(ocr: Arc<OcrEngine>, max_form_depth: usize) -> Self {
        Self { ocr, max_form_depth }
    }
}

impl Extractor for PdfExtractor {
    fn name(&self) -> &str {
        "pdf-extractor"
    }

    fn format(&self) -> Format {
        Format::Pdf
    }

    fn extract(self: Box<Self>, path: &Path) -> Result<ChunkStream> {
        let doc = Document::load(path).map_err(PdfError::from)?;
        if doc.is_encrypted() {
            return Err(PdfError::Encrypted.into());
        }

        let pages: Vec<(u32, ObjectId)> = doc.get_pages().into_iter().collect();
        tracing::debug!(pdf = %path.display(), pages = pages.len(), "opened PDF");

        Ok(Box::new(PdfPages {
            doc,
            pages,
            next: 0,
            ocr: self.ocr,
            max_form_depth: self.max_form_depth,
        }))
    }
}

struct PdfPages {
    doc: Document,
    pages: Vec<(u32, ObjectId)>,
    next: usize,
    ocr: Arc<OcrEngine>,
    max_form_depth: usize,
}

impl PdfPages {
    fn page_text(&self, number: u32, page_id: ObjectId) -> String {
        let text = match self.doc.extract_text(&[number]) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(page = number, error = %e, "text extraction failed, treating page as empty");
                String::new()
            }
        };

        if !text.trim().is_empty() {
            return text.trim_end().to_string();
        }

        tracing::debug!(page = number, "page has no text layer, falling back to OCR");
        match PageImageResolver::new(&self.doc, self.max_form_depth).find_page_image(page_id) {
            Some(image) => self.ocr.image_to_text(&image).trim_end().to_string(),
            None => String::new(),
        }
    }
}

impl Iterator for PdfPages {
    type Item = Result<ExtractionChunk>;

    fn next(&mut self) -> Option<Self::Item> {
        let &(number, page_id) = self.pages.get(self.next)?;
        self.next += 1;

        let total = self.pages.len();
        let text = self.page_text(number, page_id);
        Some(Ok(ExtractionChunk::new(
            format!("Page {}/{}: {}\n", self.next, total, text),
            self.next,
            Some(total),
        )))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.pages.len() - self.next;
        (remaining, Some(remaining))
    }
}
