//! Format identification and extractor dispatch.
//!
//! A [`FormatSniffer`] combines two guesses: one from the file name suffix (an
//! explicit extension table with `mime_guess` as fallback) and one from the leading
//! bytes of the file (`infer` magic numbers, only when the `content-sniffing`
//! feature is compiled in and requested). [`select_format`] then maps the guess to
//! one of the [`Format`] families in a fixed priority order.

use crate::error::is_transient_io;
use crate::types::{Format, FormatGuess, MimeLabel};
use crate::{ParseError, Result};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

pub const PDF_MIME_TYPE: &str = "application/pdf";
pub const PLAIN_TEXT_MIME_TYPE: &str = "text/plain";
pub const ZIP_MIME_TYPE: &str = "application/zip";
pub const DOCX_MIME_TYPE: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const EXCEL_MIME_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const OCTET_STREAM_MIME_TYPE: &str = "application/octet-stream";

/// Number of leading bytes inspected for magic numbers.
pub const SNIFF_LEN: usize = 8192;

static EXT_TO_MIME: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();

    m.insert("txt", PLAIN_TEXT_MIME_TYPE);
    m.insert("text", PLAIN_TEXT_MIME_TYPE);
    m.insert("log", PLAIN_TEXT_MIME_TYPE);
    m.insert("md", "text/markdown");
    m.insert("markdown", "text/markdown");
    m.insert("csv", "text/csv");
    m.insert("tsv", "text/tab-separated-values");
    m.insert("html", "text/html");
    m.insert("htm", "text/html");

    m.insert("pdf", PDF_MIME_TYPE);

    m.insert("zip", ZIP_MIME_TYPE);

    m.insert("docx", DOCX_MIME_TYPE);
    m.insert("doc", "application/msword");
    m.insert("xlsx", EXCEL_MIME_TYPE);
    m.insert("xls", "application/vnd.ms-excel");

    m.insert("bmp", "image/bmp");
    m.insert("gif", "image/gif");
    m.insert("jpg", "image/jpeg");
    m.insert("jpeg", "image/jpeg");
    m.insert("png", "image/png");
    m.insert("tiff", "image/tiff");
    m.insert("tif", "image/tiff");
    m.insert("webp", "image/webp");

    m
});

/// Guess a MIME label from the file name suffix alone.
///
/// Returns `None` when the path has no extension or the extension is unknown to
/// both the local table and `mime_guess`.
pub fn detect_from_extension(path: &Path) -> Option<MimeLabel> {
    let extension = path.extension().and_then(|ext| ext.to_str()).map(|s| s.to_lowercase())?;

    if let Some(mime_type) = EXT_TO_MIME.get(extension.as_str()) {
        return Some(MimeLabel::new(*mime_type));
    }

    mime_guess::from_ext(&extension)
        .first()
        .map(|mime| MimeLabel::new(mime.essence_str()))
}

/// Whether magic-byte inspection was compiled into this build.
pub const fn content_inspection_available() -> bool {
    cfg!(feature = "content-sniffing")
}

/// Identifies the format of a file from its name and leading bytes.
#[derive(Debug, Clone, Copy)]
pub struct FormatSniffer {
    content_inspection: bool,
}

impl FormatSniffer {
    /// Create a sniffer. `content_inspection` is a request: it only takes effect when
    /// [`content_inspection_available`] is true.
    pub fn new(content_inspection: bool) -> Self {
        Self {
            content_inspection: content_inspection && content_inspection_available(),
        }
    }

    /// Whether this sniffer inspects bytes. When false, every content guess is the
    /// extension guess.
    pub fn inspects_content(&self) -> bool {
        self.content_inspection
    }

    /// Produce the [`FormatGuess`] for `path`.
    ///
    /// # Errors
    ///
    /// - `ParseError::Io` for transient read failures (retryable)
    /// - `ParseError::IdentificationFailed` when the leading bytes cannot be read for
    ///   a permanent reason
    pub fn identify(&self, path: &Path) -> Result<FormatGuess> {
        let extension_guess = detect_from_extension(path);

        if !self.content_inspection {
            let content_guess = extension_guess
                .clone()
                .unwrap_or_else(|| MimeLabel::new(OCTET_STREAM_MIME_TYPE));
            return Ok(FormatGuess {
                extension_guess,
                content_guess,
                content_inspected: false,
            });
        }

        let head = read_head(path)?;
        let content_guess = sniff_bytes(&head);

        tracing::debug!(
            path = %path.display(),
            extension_guess = ?extension_guess.as_ref().map(MimeLabel::as_str),
            content_guess = %content_guess,
            "identified file format"
        );

        Ok(FormatGuess {
            extension_guess,
            content_guess,
            content_inspected: true,
        })
    }
}

fn read_head(path: &Path) -> Result<Vec<u8>> {
    let classify = |err: std::io::Error| {
        if is_transient_io(&err) {
            ParseError::Io(err)
        } else {
            ParseError::identification_failed_with_source(
                format!("cannot read leading bytes of {}", path.display()),
                err,
            )
        }
    };

    let file = File::open(path).map_err(classify)?;
    let mut head = Vec::with_capacity(SNIFF_LEN);
    file.take(SNIFF_LEN as u64).read_to_end(&mut head).map_err(classify)?;
    Ok(head)
}

/// Classify a byte sample.
///
/// Office Open XML packages are matched before the generic zip signature so a
/// `.docx` is never mistaken for a plain archive.
#[cfg(feature = "content-sniffing")]
pub fn sniff_bytes(head: &[u8]) -> MimeLabel {
    if head.is_empty() {
        return MimeLabel::new(PLAIN_TEXT_MIME_TYPE);
    }
    if infer::doc::is_docx(head) {
        return MimeLabel::new(DOCX_MIME_TYPE);
    }
    if infer::doc::is_xlsx(head) {
        return MimeLabel::new(EXCEL_MIME_TYPE);
    }
    if let Some(kind) = infer::get(head) {
        return MimeLabel::new(kind.mime_type());
    }
    if looks_like_text(head) {
        return MimeLabel::new(PLAIN_TEXT_MIME_TYPE);
    }
    MimeLabel::new(OCTET_STREAM_MIME_TYPE)
}

#[cfg(not(feature = "content-sniffing"))]
pub fn sniff_bytes(_head: &[u8]) -> MimeLabel {
    MimeLabel::new(OCTET_STREAM_MIME_TYPE)
}

/// No NUL bytes and at most 10% control characters.
#[cfg_attr(not(feature = "content-sniffing"), allow(dead_code))]
fn looks_like_text(sample: &[u8]) -> bool {
    if sample.contains(&0) {
        return false;
    }
    let control = sample
        .iter()
        .filter(|&&b| (b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r' | 0x0c)) || b == 0x7f)
        .count();
    control * 10 <= sample.len()
}

/// Map a guess to the extractor family that handles it.
///
/// Rules are checked in order: zip, pdf, text, docx (label contains `word` or the
/// path ends in `.docx`), xlsx (label contains `excel`/`spreadsheetml` or the path
/// ends in `.xlsx`), image.
///
/// # Errors
///
/// `ParseError::UnsupportedFormat` when no rule matches.
pub fn select_format(guess: &FormatGuess, path: &Path) -> Result<Format> {
    let label = &guess.content_guess;
    let suffix = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    let format = if label.contains("zip") {
        Format::Zip
    } else if label.contains("pdf") {
        Format::Pdf
    } else if label.contains("text") {
        Format::Text
    } else if label.contains("word") || suffix == "docx" {
        Format::Docx
    } else if label.contains("excel") || label.contains("spreadsheetml") || suffix == "xlsx" {
        Format::Xlsx
    } else if label.contains("image") {
        Format::Image
    } else {
        return Err(ParseError::UnsupportedFormat {
            content_guess: label.to_string(),
            path: path.to_path_buf(),
        });
    };

    Ok(format)
}
