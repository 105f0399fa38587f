//! Plain text extractor.
//!
//! One chunk per line. Bytes that are not valid UTF-8 are dropped, never replaced,
//! and `\r\n` terminators are folded to `\n`.

use super::{ChunkStream, Extractor};
use crate::core::mime::SNIFF_LEN;
use crate::types::{ExtractionChunk, Format};
use crate::{ParseError, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

pub struct PlainTextExtractor;

impl PlainTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PlainTextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor for PlainTextExtractor {
    fn name(&self) -> &str {
        "plain-text-extractor"
    }

    fn format(&self) -> Format {
        Format::Text
    }

    fn extract(self: Box<Self>, path: &Path) -> Result<ChunkStream> {
        let mut file = File::open(path)?;

        let mut head = Vec::with_capacity(SNIFF_LEN);
        (&mut file).take(SNIFF_LEN as u64).read_to_end(&mut head)?;
        if !head.is_empty() && decode_dropping_invalid(&head).is_empty() {
            return Err(ParseError::UnsupportedEncoding {
                message: format!("no UTF-8 text found in the first {} bytes of {}", head.len(), path.display()),
            });
        }
        file.seek(SeekFrom::Start(0))?;

        Ok(Box::new(TextLines {
            reader: BufReader::new(file),
            buffer: Vec::new(),
            ordinal: 0,
            done: false,
        }))
    }
}

struct TextLines {
    reader: BufReader<File>,
    buffer: Vec<u8>,
    ordinal: usize,
    done: bool,
}

impl Iterator for TextLines {
    type Item = Result<ExtractionChunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        self.buffer.clear();
        match self.reader.read_until(b'\n', &mut self.buffer) {
            Ok(0) => {
                self.done = true;
                None
            }
            Ok(_) => {
                self.ordinal += 1;
                let mut line = decode_dropping_invalid(&self.buffer);
                if line.ends_with("\r\n") {
                    line.truncate(line.len() - 2);
                    line.push('\n');
                }
                Some(Ok(ExtractionChunk::new(line, self.ordinal, None)))
            }
            Err(err) => {
                self.done = true;
                Some(Err(ParseError::Io(err)))
            }
        }
    }
}

/// Keep the valid UTF-8 runs of `bytes` and drop everything else.
pub fn decode_dropping_invalid(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn collect(path: &Path) -> Result<Vec<ExtractionChunk>> {
        Box::new(PlainTextExtractor::new()).extract(path)?.collect()
    }

    #[test]
    fn test_decode_dropping_invalid() {
        assert_eq!(decode_dropping_invalid(b"caf\xc3\xa9"), "café");
        assert_eq!(decode_dropping_invalid(b"ab\xffcd\xfe"), "abcd");
        assert_eq!(decode_dropping_invalid(b"\xff\xfe"), "");
    }

    #[test]
    fn test_lines_with_invalid_bytes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, b"first line\nsec\xffond\xfe line\r\nthird").unwrap();

        let chunks = collect(&path).unwrap();
        let texts: Vec<_> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["first line\n", "second line\n", "third"]);
        assert_eq!(chunks[2].ordinal, 3);
        assert_eq!(chunks[2].total, None);
    }

    #[test]
    fn test_empty_file_has_no_chunks() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        fs::write(&path, b"").unwrap();

        assert!(collect(&path).unwrap().is_empty());
    }

    #[test]
    fn test_undecodable_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("binary.txt");
        fs::write(&path, vec![0xFFu8; 64]).unwrap();

        let err = collect(&path).unwrap_err();
        assert!(matches!(err, ParseError::UnsupportedEncoding { .. }));
    }

    #[test]
    fn test_line_that_is_only_invalid_bytes_still_counts() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mixed.txt");
        fs::write(&path, b"ok\n\xff\xff\nend\n").unwrap();

        let chunks = collect(&path).unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1].text, "\n");
    }
}
