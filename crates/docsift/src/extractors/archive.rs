//! ZIP archive extractor.
//!
//! All members are written to `<archive>_extracted` before the first chunk is
//! produced. The chunks themselves are status lines, one per archive entry.

use super::{ChunkStream, Extractor};
use crate::error::classify_io;
use crate::types::{ExtractionChunk, Format};
use crate::{ParseError, Result};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use zip::ZipArchive;
use zip::result::ZipError;

pub struct ZipExtractor;

impl ZipExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ZipExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor for ZipExtractor {
    fn name(&self) -> &str {
        "zip-extractor"
    }

    fn format(&self) -> Format {
        Format::Zip
    }

    fn extract(self: Box<Self>, path: &Path) -> Result<ChunkStream> {
        let target = scratch_dir_for(path);
        let names = extract_all(path, &target)?;
        let total = names.len();

        tracing::debug!(
            archive = %path.display(),
            target = %target.display(),
            entries = total,
            "extracted archive members"
        );

        Ok(Box::new(names.into_iter().enumerate().map(move |(i, name)| {
            Ok::<_, ParseError>(ExtractionChunk::new(
                format!("Extracted {}/{}: {}\n", i + 1, total, name),
                i + 1,
                Some(total),
            ))
        })))
    }
}

/// `<archive path>_extracted`, next to the archive.
pub fn scratch_dir_for(archive: &Path) -> PathBuf {
    let mut name = OsString::from(archive.as_os_str());
    name.push("_extracted");
    PathBuf::from(name)
}

fn zip_error(err: ZipError) -> ParseError {
    match err {
        ZipError::Io(io_err) => classify_io(io_err, |e| {
            ParseError::corrupt_archive_with_source("unreadable archive data", e)
        }),
        other => ParseError::corrupt_archive_with_source(other.to_string(), other),
    }
}

fn write_error(err: io::Error, target: &Path) -> ParseError {
    match err.kind() {
        io::ErrorKind::PermissionDenied => {
            ParseError::permission_denied_with_source(format!("cannot write to {}", target.display()), err)
        }
        _ => ParseError::Io(err),
    }
}

/// Extract every member under `target` and return the entry names in archive order.
///
/// Existing files are truncated. Entries whose names would escape `target` are
/// listed but not written.
fn extract_all(archive_path: &Path, target: &Path) -> Result<Vec<String>> {
    let file = File::open(archive_path)
        .map_err(|e| classify_io(e, |e| ParseError::corrupt_archive_with_source("cannot open archive", e)))?;
    let mut archive = ZipArchive::new(file).map_err(zip_error)?;

    fs::create_dir_all(target).map_err(|e| write_error(e, target))?;

    let mut names = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(zip_error)?;
        let name = entry.name().to_string();

        let Some(relative) = entry.enclosed_name() else {
            tracing::warn!(entry = %name, "skipping archive entry with unsafe path");
            names.push(name);
            continue;
        };
        let out_path = target.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path).map_err(|e| write_error(e, &out_path))?;
        } else {
            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent).map_err(|e| write_error(e, parent))?;
            }
            let mut out = File::create(&out_path).map_err(|e| write_error(e, &out_path))?;
            io::copy(&mut entry, &mut out).map_err(|e| {
                classify_io(e, |e| {
                    ParseError::corrupt_archive_with_source(format!("corrupt member {}", name), e)
                })
            })?;
        }

        names.push(name);
    }

    Ok(names)
}
