//! Parsing core.
//!
//! - **Configuration** (`config`): limits, retry, OCR and PDF knobs, file loading
//! - **I/O** (`io`): the size ceiling checked before anything is read
//! - **MIME detection** (`mime`): extension and magic-byte guesses, extractor dispatch
//! - **Retry** (`retry`): fixed-delay retry of transient failures and the clock it uses
//! - **Pipeline** (`pipeline`): the per-file state machine tying the above together
//!
//! # Example
//!
//! ```rust,no_run
//! use docsift::core::config::ParserConfig;
//! use docsift::core::pipeline::ParsePipeline;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ParserConfig::discover()?.unwrap_or_default();
//! let text = ParsePipeline::new(config).parse("upload.bin")?;
//! println!("{}", text);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod io;
pub mod mime;
pub mod pipeline;
pub mod retry;

pub use config::{ConfigError, OcrConfig, ParserConfig, PdfConfig, RetryConfig};
pub use pipeline::{ParsePipeline, ParseState, ProgressEvent};
pub use retry::{Clock, ManualClock, RetryPolicy, SystemClock};
