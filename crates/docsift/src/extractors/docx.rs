//! DOCX extractor.
//!
//! Reads `word/document.xml` out of the package and yields one chunk per
//! body-level paragraph. Paragraphs nested in tables or text boxes are not visited.

use super::{ChunkStream, Extractor};
use crate::error::classify_io;
use crate::types::{ExtractionChunk, Format};
use crate::{ParseError, Result};
use roxmltree::Node;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;
use zip::result::ZipError;

const DOCUMENT_PART: &str = "word/document.xml";

pub struct DocxExtractor;

impl DocxExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DocxExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor for DocxExtractor {
    fn name(&self) -> &str {
        "docx-extractor"
    }

    fn format(&self) -> Format {
        Format::Docx
    }

    fn extract(self: Box<Self>, path: &Path) -> Result<ChunkStream> {
        let xml = read_document_part(path)?;
        let paragraphs = parse_paragraphs(&xml)?;
        let total = paragraphs.len();

        Ok(Box::new(paragraphs.into_iter().enumerate().map(move |(i, text)| {
            Ok::<_, ParseError>(ExtractionChunk::new(format!("{}\n", text), i + 1, Some(total)))
        })))
    }
}

fn package_error(err: ZipError) -> ParseError {
    match err {
        ZipError::Io(io_err) => classify_io(io_err, |e| {
            ParseError::corrupt_document_with_source("unreadable package data", e)
        }),
        ZipError::FileNotFound => ParseError::corrupt_document(format!("package has no {}", DOCUMENT_PART)),
        other => ParseError::corrupt_document_with_source(format!("not a valid package: {}", other), other),
    }
}

fn read_document_part(path: &Path) -> Result<String> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(file).map_err(package_error)?;
    let mut part = archive.by_name(DOCUMENT_PART).map_err(package_error)?;

    let mut xml = String::new();
    part.read_to_string(&mut xml).map_err(|e| {
        classify_io(e, |e| {
            ParseError::corrupt_document_with_source(format!("Failed to read {}", DOCUMENT_PART), e)
        })
    })?;
    Ok(xml)
}

/// Text of each `w:p` that is a direct child of `w:body`, in document order.
pub fn parse_paragraphs(xml: &str) -> Result<Vec<String>> {
    let doc = roxmltree::Document::parse(xml)
        .map_err(|e| ParseError::corrupt_document_with_source(format!("Failed to parse {}", DOCUMENT_PART), e))?;

    let body = doc
        .root_element()
        .children()
        .find(|n| n.is_element() && n.tag_name().name() == "body")
        .ok_or_else(|| ParseError::corrupt_document("document has no body"))?;

    Ok(body
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == "p")
        .map(|p| {
            let mut text = String::new();
            collect_run_text(p, &mut text);
            text
        })
        .collect())
}

fn collect_run_text(node: Node<'_, '_>, out: &mut String) {
    for child in node.children().filter(Node::is_element) {
        match child.tag_name().name() {
            "t" => out.push_str(child.text().unwrap_or_default()),
            "tab" => out.push('\t'),
            "br" | "cr" => out.push('\n'),
            // Deleted revisions, drawings and text boxes are not part of the paragraph text
            "del" | "drawing" | "pict" | "txbxContent" | "pPr" | "rPr" => {}
            _ => collect_run_text(child, out),
        }
    }
}
