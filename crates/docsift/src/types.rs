//! Value types shared across the parsing core.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// A MIME-like classification such as `application/pdf` or `text/plain`.
///
/// Labels are compared by substring during dispatch (`"zip"`, `"word"`, ...), so they
/// are kept as the raw lowercase string rather than parsed into a `mime::Mime`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MimeLabel(String);

impl MimeLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.0.contains(needle)
    }
}

impl fmt::Display for MimeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MimeLabel {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Outcome of format identification, computed once per parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatGuess {
    /// Guess derived from the file name suffix, if the suffix is known.
    pub extension_guess: Option<MimeLabel>,
    /// Guess derived from the leading bytes. Equals the extension guess when content
    /// inspection is unavailable.
    pub content_guess: MimeLabel,
    /// Whether `content_guess` came from inspecting bytes. `false` means the guess
    /// degraded to the extension table and callers should lower their confidence.
    pub content_inspected: bool,
}

/// Format families the pipeline can extract text from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Zip,
    Pdf,
    Text,
    Docx,
    Xlsx,
    Image,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Zip => "zip",
            Format::Pdf => "pdf",
            Format::Text => "text",
            Format::Docx => "docx",
            Format::Xlsx => "xlsx",
            Format::Image => "image",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of incrementally produced text.
///
/// `text` is exactly what gets appended to the result, label included
/// (`"Page 3/10: ...\n"`). `ordinal` and `total` only feed progress accounting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionChunk {
    pub text: String,
    /// 1-based position in production order.
    pub ordinal: usize,
    /// Number of chunks the extractor expects to produce, when it knows up front.
    pub total: Option<usize>,
}

impl ExtractionChunk {
    pub fn new(text: impl Into<String>, ordinal: usize, total: Option<usize>) -> Self {
        Self {
            text: text.into(),
            ordinal,
            total,
        }
    }

    /// Completion percentage after this chunk.
    ///
    /// Uses `ordinal / total` when the total is known, otherwise advances ten points
    /// per chunk and saturates at 100.
    pub fn percent(&self) -> u8 {
        let percent = match self.total {
            Some(total) if total > 0 => self.ordinal.saturating_mul(100) / total,
            _ => self.ordinal.saturating_mul(10),
        };
        percent.min(100) as u8
    }
}

/// Full result of a successful parse.
#[derive(Debug, Clone)]
pub struct ParseOutput {
    /// Chunks concatenated in production order.
    pub text: String,
    pub format: Format,
    pub guess: FormatGuess,
    pub chunk_count: usize,
    /// Number of extraction attempts it took (1 when nothing was retried).
    pub attempts: u32,
    /// Wall-clock time spent in the extracting state.
    pub elapsed: Duration,
}
