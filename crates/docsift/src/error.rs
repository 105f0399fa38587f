//! Error types for docsift.
//!
//! Every failure a parse can produce is one variant of [`ParseError`]. The set is
//! closed so callers can branch on it programmatically:
//!
//! - **Structural errors** (`CorruptArchive`, `CorruptOrEncrypted`, `UnsupportedFormat`, ...)
//!   describe the file itself. They are permanent and are never retried.
//! - **Transient errors** (`Io` with a retryable kind) describe the environment. The
//!   retry policy re-runs the failed step and, once attempts are exhausted, returns the
//!   last one unchanged.
//! - **`ParseFailed`** wraps anything that could not be classified, including panics
//!   raised by third-party parsers on hostile input.
//!
//! OCR failures never appear here: the OCR engine absorbs them and yields empty text.
//!
//! # Example
//!
//! ```rust
//! use docsift::ParseError;
//!
//! let err = ParseError::corrupt_archive("missing end of central directory");
//! assert!(!err.is_transient());
//! assert_eq!(err.kind(), "CorruptArchive");
//! ```
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias using [`ParseError`].
pub type Result<T> = std::result::Result<T, ParseError>;

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Closed failure taxonomy of the parsing core.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("File is too large ({size} bytes). Maximum allowed size is {limit} bytes")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("File not found: {}", .path.display())]
    FileNotFound { path: PathBuf },

    #[error("Failed to identify file format: {message}")]
    IdentificationFailed {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("Unsupported file format: {content_guess} (file: {})", .path.display())]
    UnsupportedFormat { content_guess: String, path: PathBuf },

    #[error("Not a valid ZIP archive: {message}")]
    CorruptArchive {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("Permission denied: {message}")]
    PermissionDenied {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("Unable to decode text file: {message}")]
    UnsupportedEncoding { message: String },

    #[error("Not a valid PDF or the PDF is encrypted: {message}")]
    CorruptOrEncrypted {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("Not a valid DOCX document: {message}")]
    CorruptDocument {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("Not a valid XLSX workbook: {message}")]
    CorruptWorkbook {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("Not a valid image or unsupported image encoding: {message}")]
    CorruptImage {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("Processing time exceeded {limit_seconds} seconds")]
    ProcessingTimeout { limit_seconds: u64 },

    #[error("Failed to parse file: {message}")]
    ParseFailed {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

macro_rules! error_constructor {
    ($name:ident, $with_source:ident, $variant:ident) => {
        #[doc = concat!("Create a `", stringify!($variant), "` error")]
        pub fn $name<S: Into<String>>(message: S) -> Self {
            Self::$variant {
                message: message.into(),
                source: None,
            }
        }

        #[doc = concat!("Create a `", stringify!($variant), "` error with source")]
        pub fn $with_source<S, E>(message: S, source: E) -> Self
        where
            S: Into<String>,
            E: std::error::Error + Send + Sync + 'static,
        {
            Self::$variant {
                message: message.into(),
                source: Some(Box::new(source)),
            }
        }
    };
}

impl ParseError {
    error_constructor!(identification_failed, identification_failed_with_source, IdentificationFailed);
    error_constructor!(corrupt_archive, corrupt_archive_with_source, CorruptArchive);
    error_constructor!(permission_denied, permission_denied_with_source, PermissionDenied);
    error_constructor!(corrupt_or_encrypted, corrupt_or_encrypted_with_source, CorruptOrEncrypted);
    error_constructor!(corrupt_document, corrupt_document_with_source, CorruptDocument);
    error_constructor!(corrupt_workbook, corrupt_workbook_with_source, CorruptWorkbook);
    error_constructor!(corrupt_image, corrupt_image_with_source, CorruptImage);
    error_constructor!(parse_failed, parse_failed_with_source, ParseFailed);

    /// Whether the retry policy may re-run the step that produced this error.
    pub fn is_transient(&self) -> bool {
        match self {
            ParseError::Io(err) => is_transient_io(err),
            _ => false,
        }
    }

    /// Fold a permanent `Io` error into the closed taxonomy.
    ///
    /// Transient `Io` errors pass through unchanged so that an exhausted retry still
    /// reports the last transient failure. `path` is the file being parsed.
    pub fn into_closed(self, path: &Path) -> Self {
        match self {
            ParseError::Io(err) if !is_transient_io(&err) => match err.kind() {
                io::ErrorKind::NotFound => ParseError::FileNotFound {
                    path: path.to_path_buf(),
                },
                io::ErrorKind::PermissionDenied => {
                    ParseError::permission_denied_with_source(format!("{}: {}", path.display(), err), err)
                }
                _ => ParseError::parse_failed_with_source(format!("{}: {}", path.display(), err), err),
            },
            other => other,
        }
    }

    /// Stable name of the variant, for logs and programmatic matching across FFI-like boundaries.
    pub fn kind(&self) -> &'static str {
        match self {
            ParseError::FileTooLarge { .. } => "FileTooLarge",
            ParseError::FileNotFound { .. } => "FileNotFound",
            ParseError::IdentificationFailed { .. } => "IdentificationFailed",
            ParseError::UnsupportedFormat { .. } => "UnsupportedFormat",
            ParseError::CorruptArchive { .. } => "CorruptArchive",
            ParseError::PermissionDenied { .. } => "PermissionDenied",
            ParseError::UnsupportedEncoding { .. } => "UnsupportedEncoding",
            ParseError::CorruptOrEncrypted { .. } => "CorruptOrEncrypted",
            ParseError::CorruptDocument { .. } => "CorruptDocument",
            ParseError::CorruptWorkbook { .. } => "CorruptWorkbook",
            ParseError::CorruptImage { .. } => "CorruptImage",
            ParseError::ProcessingTimeout { .. } => "ProcessingTimeout",
            ParseError::ParseFailed { .. } => "ParseFailed",
            ParseError::Io(_) => "Io",
        }
    }
}

/// Whether an I/O error describes a condition that may clear up on a later attempt.
///
/// Missing files, permission problems and malformed data will not change between
/// attempts; everything else (interrupted reads, network mounts dropping, timeouts,
/// connection resets) is worth another try.
pub fn is_transient_io(err: &io::Error) -> bool {
    !matches!(
        err.kind(),
        io::ErrorKind::NotFound
            | io::ErrorKind::PermissionDenied
            | io::ErrorKind::InvalidInput
            | io::ErrorKind::InvalidData
            | io::ErrorKind::Unsupported
            | io::ErrorKind::UnexpectedEof
    )
}

/// Classify an I/O error that surfaced from inside a format library.
///
/// Permission problems keep their own variant. `InvalidData` and `UnexpectedEof` mean
/// the library rejected or ran out of bytes and become the caller's structural
/// error. Anything else stays `Io` so the retry policy can see it.
pub(crate) fn classify_io<F>(err: io::Error, structural: F) -> ParseError
where
    F: FnOnce(io::Error) -> ParseError,
{
    match err.kind() {
        io::ErrorKind::PermissionDenied => ParseError::permission_denied_with_source(err.to_string(), err),
        io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => structural(err),
        _ => ParseError::Io(err),
    }
}
