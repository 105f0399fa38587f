//! Configuration loading and management.
//!
//! Parser limits, retry behaviour and OCR settings can be built in code or loaded
//! from TOML, YAML or JSON files. [`ParserConfig::discover`] finds a `docsift.toml`
//! in the current directory or any parent.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading or validating a [`ParserConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid {format} in {}: {message}", .path.display())]
    Syntax {
        path: PathBuf,
        format: &'static str,
        message: String,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level parser configuration.
///
/// # Example
///
/// ```rust
/// use docsift::core::config::ParserConfig;
///
/// let config = ParserConfig::default();
/// assert_eq!(config.max_file_size_bytes, 100 * 1024 * 1024);
/// assert_eq!(config.retry.max_attempts, 3);
///
/// // let config = ParserConfig::from_toml_file("docsift.toml")?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Files larger than this are rejected before any content is read.
    #[serde(default = "default_max_file_size")]
    pub max_file_size_bytes: u64,

    /// Deadline for the extraction phase, in seconds.
    #[serde(default = "default_max_processing_seconds")]
    pub max_processing_seconds: u64,

    /// Request magic-byte inspection. Has no effect unless the `content-sniffing`
    /// feature is compiled in.
    #[serde(default = "default_true")]
    pub content_sniffing: bool,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub ocr: OcrConfig,

    #[serde(default)]
    pub pdf: PdfConfig,
}

/// Fixed-delay retry settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

/// OCR configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrConfig {
    /// When false every OCR request yields empty text.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// `tesseract` (subprocess) or `tesseract-native` (linked library).
    #[serde(default = "default_backend")]
    pub backend: String,

    #[serde(default = "default_eng")]
    pub language: String,

    /// Tesseract page segmentation mode.
    #[serde(default = "default_psm")]
    pub psm: u8,

    /// Executable used by the subprocess backend.
    #[serde(default = "default_tesseract_cmd")]
    pub tesseract_cmd: String,
}

/// PDF-specific options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfConfig {
    /// How many levels of nested Form XObjects are searched for a page image.
    #[serde(default = "default_max_form_depth")]
    pub max_form_depth: usize,
}

fn default_true() -> bool {
    true
}
fn default_max_file_size() -> u64 {
    100 * 1024 * 1024
}
fn default_max_processing_seconds() -> u64 {
    300
}
fn default_max_attempts() -> u32 {
    3
}
fn default_delay_ms() -> u64 {
    2000
}
fn default_backend() -> String {
    "tesseract".to_string()
}
fn default_eng() -> String {
    "eng".to_string()
}
fn default_psm() -> u8 {
    3
}
fn default_tesseract_cmd() -> String {
    "tesseract".to_string()
}
fn default_max_form_depth() -> usize {
    8
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: default_max_file_size(),
            max_processing_seconds: default_max_processing_seconds(),
            content_sniffing: true,
            retry: RetryConfig::default(),
            ocr: OcrConfig::default(),
            pdf: PdfConfig::default(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_delay_ms(),
        }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: default_backend(),
            language: default_eng(),
            psm: default_psm(),
            tesseract_cmd: default_tesseract_cmd(),
        }
    }
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            max_form_depth: default_max_form_depth(),
        }
    }
}

impl RetryConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl ParserConfig {
    pub fn processing_limit(&self) -> Duration {
        Duration::from_secs(self.max_processing_seconds)
    }

    /// Reject settings the pipeline cannot honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_file_size_bytes == 0 {
            return Err(ConfigError::Invalid("max_file_size_bytes must be greater than 0".to_string()));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid("retry.max_attempts must be at least 1".to_string()));
        }
        if self.ocr.language.trim().is_empty() {
            return Err(ConfigError::Invalid("ocr.language must not be empty".to_string()));
        }
        Ok(())
    }

    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = read_config(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| syntax_error(path, "TOML", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = read_config(path)?;
        let config: Self = serde_yaml_ng::from_str(&content).map_err(|e| syntax_error(path, "YAML", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = read_config(path)?;
        let config: Self = serde_json::from_str(&content).map_err(|e| syntax_error(path, "JSON", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Discover a `docsift.toml` by walking from the current directory to the root.
    ///
    /// Returns `Ok(None)` when no file is found.
    pub fn discover() -> Result<Option<Self>, ConfigError> {
        let mut current = std::env::current_dir().map_err(|source| ConfigError::Read {
            path: PathBuf::from("."),
            source,
        })?;

        loop {
            let candidate = current.join("docsift.toml");
            if candidate.exists() {
                return Ok(Some(Self::from_toml_file(candidate)?));
            }

            if let Some(parent) = current.parent() {
                current = parent.to_path_buf();
            } else {
                break;
            }
        }

        Ok(None)
    }
}

fn read_config(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn syntax_error(path: &Path, format: &'static str, err: impl fmt::Display) -> ConfigError {
    ConfigError::Syntax {
        path: path.to_path_buf(),
        format,
        message: err.to_string(),
    }
}
