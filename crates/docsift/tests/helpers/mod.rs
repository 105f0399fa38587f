//! Fixture builders shared by the integration tests.
//!
//! Every fixture is generated on the fly so no binary files need to be checked in.

#![allow(dead_code)]

use docsift::{Clock, OcrBackend, OcrConfig, OcrEngine, ParserConfig, RasterImage};
use image::{GrayImage, ImageFormat, Luma};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use zip::write::{SimpleFileOptions, ZipWriter};

/// Defaults with OCR switched off and no real waiting between retries.
pub fn test_config() -> ParserConfig {
    let mut config = ParserConfig::default();
    config.ocr.enabled = false;
    config.retry.delay_ms = 0;
    config
}

pub fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
    let file = File::create(path).unwrap();
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default();
    for (name, data) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap();
}

/// A minimal DOCX package. The main part comes first so magic-byte sniffing sees it.
pub fn write_docx(path: &Path, paragraphs: &[&str]) {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>", p))
        .collect();
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}<w:sectPr/></w:body></w:document>"#,
        body
    );

    let rels = root_rels("word/document.xml");
    write_zip(
        path,
        &[
            ("word/document.xml", document.as_bytes()),
            ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
            ("_rels/.rels", rels.as_bytes()),
        ],
    );
}

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
</Types>"#;

fn root_rels(main_part: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="{}"/>
</Relationships>"#,
        main_part
    )
}

/// One worksheet: a name and its rows. `None` cells are left blank.
pub struct SheetSpec<'a> {
    pub name: &'a str,
    pub rows: Vec<Vec<Option<CellSpec<'a>>>>,
}

pub enum CellSpec<'a> {
    Text(&'a str),
    Number(f64),
}

fn column_letter(index: usize) -> char {
    (b'A' + index as u8) as char
}

fn sheet_xml(sheet: &SheetSpec<'_>) -> String {
    let mut rows = String::new();
    for (r, row) in sheet.rows.iter().enumerate() {
        rows.push_str(&format!("<row r=\"{}\">", r + 1));
        for (c, cell) in row.iter().enumerate() {
            let reference = format!("{}{}", column_letter(c), r + 1);
            match cell {
                Some(CellSpec::Text(text)) => rows.push_str(&format!(
                    "<c r=\"{}\" t=\"inlineStr\"><is><t>{}</t></is></c>",
                    reference, text
                )),
                Some(CellSpec::Number(n)) => rows.push_str(&format!("<c r=\"{}\"><v>{}</v></c>", reference, n)),
                None => {}
            }
        }
        rows.push_str("</row>");
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{}</sheetData></worksheet>"#,
        rows
    )
}

/// A minimal XLSX workbook with inline strings. The workbook part comes first so
/// magic-byte sniffing sees it.
pub fn write_xlsx(path: &Path, sheets: &[SheetSpec<'_>]) {
    write_xlsx_with_override(path, sheets, None);
}

/// Like [`write_xlsx`], with the raw bytes of one package part swapped out.
pub fn write_xlsx_with_override(path: &Path, sheets: &[SheetSpec<'_>], replaced: Option<(&str, &[u8])>) {
    let sheet_entries: String = sheets
        .iter()
        .enumerate()
        .map(|(i, s)| format!("<sheet name=\"{}\" sheetId=\"{}\" r:id=\"rId{}\"/>", s.name, i + 1, i + 1))
        .collect();
    let workbook = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>{}</sheets></workbook>"#,
        sheet_entries
    );

    let relationships: String = (1..=sheets.len())
        .map(|i| {
            format!(
                "<Relationship Id=\"rId{}\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet\" Target=\"worksheets/sheet{}.xml\"/>",
                i, i
            )
        })
        .collect();
    let workbook_rels = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{}</Relationships>"#,
        relationships
    );

    let sheet_parts: Vec<(String, String)> = sheets
        .iter()
        .enumerate()
        .map(|(i, s)| (format!("xl/worksheets/sheet{}.xml", i + 1), sheet_xml(s)))
        .collect();

    let rels = root_rels("xl/workbook.xml");
    let mut entries: Vec<(&str, &[u8])> = vec![
        ("xl/workbook.xml", workbook.as_bytes()),
        ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
        ("_rels/.rels", rels.as_bytes()),
        ("xl/_rels/workbook.xml.rels", workbook_rels.as_bytes()),
    ];
    for (name, xml) in &sheet_parts {
        entries.push((name.as_str(), xml.as_bytes()));
    }
    if let Some((part, bytes)) = replaced {
        for entry in entries.iter_mut().filter(|entry| entry.0 == part) {
            entry.1 = bytes;
        }
    }
    write_zip(path, &entries);
}

pub fn write_gray_png(path: &Path, width: u32, height: u32) {
    GrayImage::from_pixel(width, height, Luma([180u8]))
        .save_with_format(path, ImageFormat::Png)
        .unwrap();
}

pub fn write_gray_jpeg(path: &Path, width: u32, height: u32) {
    GrayImage::from_pixel(width, height, Luma([90u8]))
        .save_with_format(path, ImageFormat::Jpeg)
        .unwrap();
}

/// What a PDF page carries.
pub enum PageSpec<'a> {
    Text(&'a str),
    /// A gray image of the given size and no text layer.
    Scan { width: u32, height: u32 },
    /// A gray image wrapped in `depth` nested Form XObjects.
    WrappedScan { width: u32, height: u32, depth: usize },
}

fn gray_image_stream(width: u32, height: u32) -> Stream {
    Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
        },
        vec![128u8; (width * height) as usize],
    )
}

fn form_stream(resources: Dictionary, content: &[u8]) -> Stream {
    Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => vec![0.into(), 0.into(), 1.into(), 1.into()],
            "Resources" => resources,
        },
        content.to_vec(),
    )
}

fn text_content(text: &str) -> Vec<u8> {
    Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), 700.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ],
    }
    .encode()
    .unwrap()
}

/// Build a PDF document in memory, one page per entry.
pub fn build_pdf(pages: &[PageSpec<'_>]) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });

    let mut kids: Vec<Object> = Vec::new();
    for page in pages {
        let (content, resources) = match page {
            PageSpec::Text(text) => (
                text_content(text),
                dictionary! { "Font" => dictionary! { "F1" => font_id } },
            ),
            PageSpec::Scan { width, height } => {
                let image_id = doc.add_object(gray_image_stream(*width, *height));
                (
                    b"q 612 0 0 792 0 0 cm /Im0 Do Q".to_vec(),
                    dictionary! { "XObject" => dictionary! { "Im0" => image_id } },
                )
            }
            PageSpec::WrappedScan { width, height, depth } => {
                let image_id = doc.add_object(gray_image_stream(*width, *height));
                let mut inner: ObjectId = doc.add_object(form_stream(
                    dictionary! { "XObject" => dictionary! { "Im0" => image_id } },
                    b"/Im0 Do",
                ));
                for _ in 1..*depth {
                    inner = doc.add_object(form_stream(
                        dictionary! { "XObject" => dictionary! { "Fm0" => inner } },
                        b"/Fm0 Do",
                    ));
                }
                (
                    b"q 612 0 0 792 0 0 cm /Fm0 Do Q".to_vec(),
                    dictionary! { "XObject" => dictionary! { "Fm0" => inner } },
                )
            }
        };

        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

pub fn write_pdf(path: &Path, pages: &[PageSpec<'_>]) {
    build_pdf(pages).save(path).unwrap();
}

/// OCR double that returns a fixed reading and counts how often it was asked.
pub struct ScriptedOcr {
    reading: String,
    calls: Arc<AtomicUsize>,
}

impl ScriptedOcr {
    pub fn new(reading: &str) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                reading: reading.to_string(),
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }
}

impl OcrBackend for ScriptedOcr {
    fn name(&self) -> &str {
        "scripted"
    }

    fn recognize(&self, _image: &RasterImage, _config: &OcrConfig) -> Result<String, docsift::ocr::OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reading.clone())
    }
}

pub fn scripted_engine(reading: &str) -> (Arc<OcrEngine>, Arc<AtomicUsize>) {
    let (backend, calls) = ScriptedOcr::new(reading);
    (Arc::new(OcrEngine::with_backend(OcrConfig::default(), backend)), calls)
}

/// A clock that moves forward by a fixed step every time it is read.
pub struct TickingClock {
    origin: Instant,
    step: Duration,
    reads: Mutex<u32>,
}

impl TickingClock {
    pub fn new(step: Duration) -> Self {
        Self {
            origin: Instant::now(),
            step,
            reads: Mutex::new(0),
        }
    }
}

impl Clock for TickingClock {
    fn now(&self) -> Instant {
        let mut reads = self.reads.lock().unwrap();
        *reads += 1;
        self.origin + self.step * *reads
    }

    fn sleep(&self, _duration: Duration) {}
}
