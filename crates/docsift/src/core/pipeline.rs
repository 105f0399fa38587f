//! Parse orchestration.
//!
//! One call walks `Start -> SizeChecked -> FormatIdentified -> Extracting` and ends in
//! `Done` or `Failed`. Format identification and extraction each run under the
//! [`RetryPolicy`]; extraction is restarted from scratch with a fresh extractor on every
//! attempt. The processing deadline starts when extraction starts and is checked after
//! every chunk.

use crate::core::config::ParserConfig;
use crate::core::io::SizeGuard;
use crate::core::mime::{FormatSniffer, select_format};
use crate::core::retry::{Clock, RetryPolicy, SystemClock};
use crate::extractors::{Extractor, ExtractorContext, ExtractorFactory, extractor_for};
use crate::ocr::OcrEngine;
use crate::types::{Format, ParseOutput};
use crate::{ParseError, Result};
use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Position of a parse in its state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseState {
    Start,
    SizeChecked,
    FormatIdentified,
    Extracting,
    Done,
    Failed,
}

impl fmt::Display for ParseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParseState::Start => "start",
            ParseState::SizeChecked => "size_checked",
            ParseState::FormatIdentified => "format_identified",
            ParseState::Extracting => "extracting",
            ParseState::Done => "done",
            ParseState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Observational side channel. Nothing here influences control flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    StateChanged(ParseState),
    Chunk {
        ordinal: usize,
        total: Option<usize>,
        percent: u8,
    },
    Retrying {
        operation: &'static str,
        attempt: u32,
        max_attempts: u32,
    },
    Finished {
        chunk_count: usize,
        elapsed: Duration,
    },
}

type Observer<'o> = &'o mut dyn FnMut(&ProgressEvent);

/// Tracks the current state and forwards events to the optional observer.
struct Progress<'o> {
    state: ParseState,
    observer: Option<Observer<'o>>,
}

impl<'o> Progress<'o> {
    fn new(observer: Option<Observer<'o>>) -> Self {
        Self {
            state: ParseState::Start,
            observer,
        }
    }

    fn emit(&mut self, event: ProgressEvent) {
        if let Some(observer) = self.observer.as_mut() {
            observer(&event);
        }
    }

    fn enter(&mut self, state: ParseState) {
        tracing::debug!(from = %self.state, to = %state, "parse state transition");
        self.state = state;
        self.emit(ProgressEvent::StateChanged(state));
    }
}

/// Entry point of the parsing core.
///
/// A pipeline holds configuration and shared collaborators only; every call to
/// [`parse`](Self::parse) builds its own extractors, so one pipeline can be shared
/// by callers running independent parses.
pub struct ParsePipeline {
    config: ParserConfig,
    clock: Arc<dyn Clock>,
    ocr: Arc<OcrEngine>,
    sniffer: FormatSniffer,
    retry: RetryPolicy,
    custom_extractors: HashMap<Format, ExtractorFactory>,
}

impl fmt::Debug for ParsePipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParsePipeline")
            .field("config", &self.config)
            .field("ocr", &self.ocr)
            .field("sniffer", &self.sniffer)
            .field("retry", &self.retry)
            .field("custom_extractors", &self.custom_extractors.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for ParsePipeline {
    fn default() -> Self {
        Self::new(ParserConfig::default())
    }
}

impl ParsePipeline {
    pub fn new(config: ParserConfig) -> Self {
        let ocr = Arc::new(OcrEngine::new(config.ocr.clone()));
        let sniffer = FormatSniffer::new(config.content_sniffing);
        let retry = RetryPolicy::from(&config.retry);
        Self {
            config,
            clock: Arc::new(SystemClock),
            ocr,
            sniffer,
            retry,
            custom_extractors: HashMap::new(),
        }
    }

    /// Replace the clock used for retry delays and the processing deadline.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the OCR engine, e.g. with one wrapping a custom backend.
    pub fn with_ocr_engine(mut self, ocr: Arc<OcrEngine>) -> Self {
        self.ocr = ocr;
        self
    }

    /// Use `factory` instead of the built-in extractor for `format`.
    ///
    /// The factory is called once per extraction attempt.
    pub fn with_extractor<F>(mut self, format: Format, factory: F) -> Self
    where
        F: Fn(&ExtractorContext) -> Box<dyn Extractor> + Send + Sync + 'static,
    {
        self.custom_extractors.insert(format, Arc::new(factory));
        self
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parse `path` and return the aggregated text.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use docsift::ParsePipeline;
    ///
    /// # fn main() -> docsift::Result<()> {
    /// let text = ParsePipeline::default().parse("statement.pdf")?;
    /// println!("{}", text);
    /// # Ok(())
    /// # }
    /// ```
    pub fn parse(&self, path: impl AsRef<Path>) -> Result<String> {
        self.parse_detailed(path.as_ref(), None).map(|output| output.text)
    }

    /// Like [`parse`](Self::parse), reporting progress to `observer`.
    pub fn parse_with_observer(
        &self,
        path: impl AsRef<Path>,
        observer: &mut dyn FnMut(&ProgressEvent),
    ) -> Result<String> {
        self.parse_detailed(path.as_ref(), Some(observer))
            .map(|output| output.text)
    }

    /// Parse `path` and return the text together with format, attempt and timing details.
    #[tracing::instrument(
        skip(self, path, observer),
        fields(
            parse.path = %path.display(),
        )
    )]
    pub fn parse_detailed(
        &self,
        path: &Path,
        observer: Option<&mut dyn FnMut(&ProgressEvent)>,
    ) -> Result<ParseOutput> {
        let progress = RefCell::new(Progress::new(observer));
        progress.borrow_mut().enter(ParseState::Start);

        let outcome = self.run(path, &progress);
        let mut progress = progress.into_inner();
        match outcome {
            Ok(output) => {
                progress.emit(ProgressEvent::Finished {
                    chunk_count: output.chunk_count,
                    elapsed: output.elapsed,
                });
                progress.enter(ParseState::Done);
                Ok(output)
            }
            Err(err) => {
                let err = err.into_closed(path);
                tracing::debug!(kind = err.kind(), error = %err, "parse failed");
                progress.enter(ParseState::Failed);
                Err(err)
            }
        }
    }

    fn run(&self, path: &Path, progress: &RefCell<Progress<'_>>) -> Result<ParseOutput> {
        SizeGuard::new(self.config.max_file_size_bytes).check(path)?;
        progress.borrow_mut().enter(ParseState::SizeChecked);

        let (guess, _) = self.retry.run(
            self.clock.as_ref(),
            "identify",
            |attempt, _| self.report_retry(progress, "identify", attempt),
            |_| self.sniffer.identify(path),
        )?;
        let format = select_format(&guess, path)?;
        tracing::debug!(%format, content_guess = %guess.content_guess, "selected extractor");
        progress.borrow_mut().enter(ParseState::FormatIdentified);

        progress.borrow_mut().enter(ParseState::Extracting);
        let started = self.clock.now();
        let ctx = ExtractorContext::new(Arc::clone(&self.ocr), self.config.pdf.clone());

        let ((text, chunk_count), attempts) = self.retry.run(
            self.clock.as_ref(),
            "extract",
            |attempt, _| self.report_retry(progress, "extract", attempt),
            |attempt| {
                tracing::debug!(attempt, %format, "starting extraction");
                self.extract_once(format, &ctx, path, started, progress)
            },
        )?;

        Ok(ParseOutput {
            text,
            format,
            guess,
            chunk_count,
            attempts,
            elapsed: self.clock.now().saturating_duration_since(started),
        })
    }

    fn report_retry(&self, progress: &RefCell<Progress<'_>>, operation: &'static str, attempt: u32) {
        progress.borrow_mut().emit(ProgressEvent::Retrying {
            operation,
            attempt,
            max_attempts: self.retry.max_attempts(),
        });
    }

    /// One full extraction with a fresh extractor and a fresh buffer.
    fn extract_once(
        &self,
        format: Format,
        ctx: &ExtractorContext,
        path: &Path,
        started: Instant,
        progress: &RefCell<Progress<'_>>,
    ) -> Result<(String, usize)> {
        let limit = self.config.processing_limit();

        let attempt = catch_unwind(AssertUnwindSafe(|| -> Result<(String, usize)> {
            let extractor = match self.custom_extractors.get(&format) {
                Some(factory) => factory(ctx),
                None => extractor_for(format, ctx),
            };
            let extractor_name = extractor.name().to_string();
            let chunks = extractor.extract(path)?;

            let mut text = String::new();
            let mut count = 0;
            for chunk in chunks {
                let chunk = chunk?;
                count += 1;
                text.push_str(&chunk.text);

                tracing::debug!(
                    extractor = %extractor_name,
                    ordinal = chunk.ordinal,
                    total = ?chunk.total,
                    "chunk produced"
                );
                progress.borrow_mut().emit(ProgressEvent::Chunk {
                    ordinal: chunk.ordinal,
                    total: chunk.total,
                    percent: chunk.percent(),
                });

                if self.clock.now().saturating_duration_since(started) > limit {
                    return Err(ParseError::ProcessingTimeout {
                        limit_seconds: self.config.max_processing_seconds,
                    });
                }
            }
            Ok((text, count))
        }));

        attempt.unwrap_or_else(|payload| {
            let message = panic_message(payload.as_ref());
            tracing::error!(%format, panic = %message, "extractor panicked");
            Err(ParseError::parse_failed(format!("{} extractor panicked: {}", format, message)))
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
