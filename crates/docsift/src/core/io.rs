//! File size validation.
//!
//! The size check runs before any byte of the file is read, using filesystem
//! metadata only.

use crate::{ParseError, Result};
use std::io;
use std::path::Path;

/// Rejects files larger than a fixed byte ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeGuard {
    limit: u64,
}

impl SizeGuard {
    pub fn new(limit: u64) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Check the file at `path` against the ceiling.
    ///
    /// # Errors
    ///
    /// - `ParseError::FileNotFound` if nothing exists at `path`
    /// - `ParseError::FileTooLarge` if the file exceeds the ceiling
    /// - `ParseError::PermissionDenied` if the metadata cannot be read
    /// - `ParseError::ParseFailed` if `path` is a directory
    /// - `ParseError::Io` for other metadata failures (these bubble up)
    pub fn check(&self, path: &Path) -> Result<u64> {
        let metadata = std::fs::metadata(path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => ParseError::FileNotFound {
                path: path.to_path_buf(),
            },
            io::ErrorKind::PermissionDenied => {
                ParseError::permission_denied_with_source(format!("cannot stat {}", path.display()), err)
            }
            _ => ParseError::Io(err),
        })?;

        if metadata.is_dir() {
            return Err(ParseError::parse_failed(format!("{} is a directory", path.display())));
        }

        let size = metadata.len();
        if size > self.limit {
            return Err(ParseError::FileTooLarge { size, limit: self.limit });
        }

        Ok(size)
    }
}
