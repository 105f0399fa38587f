//! XLSX extractor using `calamine`.
//!
//! Every sheet is visited in workbook order and every row in sheet order. A row
//! chunk reads `Sheet '<name>', Row i/total: c1 | c2 | ...` with blank cells left
//! out. Row numbers are absolute, so leading blank rows still produce (empty) chunks.
//! A worksheet that cannot be read fails the whole workbook.

use super::{ChunkStream, Extractor};
use crate::error::classify_io;
use crate::types::{ExtractionChunk, Format};
use crate::{ParseError, Result};
use calamine::{Data, Range, Reader, SheetType, Xlsx, XlsxError, open_workbook};
use std::fmt::Write as FmtWrite;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

const CELL_SEPARATOR: &str = " | ";

pub struct XlsxExtractor;

impl XlsxExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for XlsxExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor for XlsxExtractor {
    fn name(&self) -> &str {
        "xlsx-extractor"
    }

    fn format(&self) -> Format {
        Format::Xlsx
    }

    fn extract(self: Box<Self>, path: &Path) -> Result<ChunkStream> {
        // Only format errors are wrapped; real IO errors bubble up
        let mut workbook: Xlsx<BufReader<File>> = match open_workbook(path) {
            Ok(wb) => wb,
            Err(XlsxError::Io(io_err)) => {
                return Err(classify_io(io_err, |e| {
                    ParseError::corrupt_workbook_with_source("Cannot detect Excel file format", e)
                }));
            }
            Err(e) => return Err(ParseError::corrupt_workbook_with_source("Failed to parse XLSX workbook", e)),
        };

        // Chartsheets and dialog sheets carry no cell grid
        let sheet_names: Vec<String> = workbook
            .sheets_metadata()
            .iter()
            .filter(|sheet| matches!(sheet.typ, SheetType::WorkSheet))
            .map(|sheet| sheet.name.clone())
            .collect();

        let mut rows = Vec::new();
        for name in sheet_names {
            let range = workbook.worksheet_range(&name).map_err(|e| {
                ParseError::corrupt_workbook_with_source(format!("Failed to read worksheet '{}'", name), e)
            })?;
            let rendered = render_rows(&range);
            let total = rendered.len();
            rows.extend(
                rendered
                    .into_iter()
                    .enumerate()
                    .map(|(i, cells)| format!("Sheet '{}', Row {}/{}: {}\n", name, i + 1, total, cells)),
            );
        }

        let total = rows.len();
        Ok(Box::new(rows.into_iter().enumerate().map(move |(i, text)| {
            Ok::<_, ParseError>(ExtractionChunk::new(text, i + 1, Some(total)))
        })))
    }
}

/// One joined line per sheet row, counting from row 1 of the sheet.
fn render_rows(range: &Range<Data>) -> Vec<String> {
    let Some((start_row, _)) = range.start() else {
        return Vec::new();
    };

    let mut rendered = vec![String::new(); start_row as usize];
    for row in range.rows() {
        let mut line = String::new();
        for cell in row.iter().filter(|c| !matches!(c, Data::Empty)) {
            if !line.is_empty() {
                line.push_str(CELL_SEPARATOR);
            }
            format_cell_value_into(&mut line, cell);
        }
        rendered.push(line);
    }
    rendered
}

fn format_cell_value_into(buffer: &mut String, data: &Data) {
    match data {
        Data::Empty => {}
        Data::String(s) => buffer.push_str(s),
        Data::Float(f) => {
            // Whole numbers are stored as floats; print them the way they were typed
            if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                let _ = write!(buffer, "{}", *f as i64);
            } else {
                let _ = write!(buffer, "{}", f);
            }
        }
        Data::Int(i) => {
            let _ = write!(buffer, "{}", i);
        }
        Data::Bool(b) => buffer.push_str(if *b { "true" } else { "false" }),
        Data::DateTime(dt) => {
            if let Some(datetime) = dt.as_datetime() {
                let _ = write!(buffer, "{}", datetime.format("%Y-%m-%d %H:%M:%S"));
            } else {
                let _ = write!(buffer, "{}", dt.as_f64());
            }
        }
        Data::DateTimeIso(s) | Data::DurationIso(s) => buffer.push_str(s),
        Data::Error(e) => {
            let _ = write!(buffer, "{}", e);
        }
    }
}
