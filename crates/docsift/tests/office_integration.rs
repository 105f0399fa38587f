//! DOCX and XLSX integration tests.

use docsift::{Format, ParseError, ParsePipeline};
use std::fs;
use tempfile::TempDir;

mod helpers;
use helpers::{CellSpec, SheetSpec, test_config, write_docx, write_xlsx, write_xlsx_with_override, write_zip};

fn numbered_rows<'a>(labels: &'a [String]) -> Vec<Vec<Option<CellSpec<'a>>>> {
    labels
        .iter()
        .enumerate()
        .map(|(i, label)| {
            vec![
                Some(CellSpec::Text(label.as_str())),
                None,
                Some(CellSpec::Number((i + 1) as f64)),
            ]
        })
        .collect()
}

#[test]
fn test_xlsx_two_sheets_fifteen_rows() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("budget.xlsx");

    let income: Vec<String> = (1..=10).map(|i| format!("income-{}", i)).collect();
    let costs: Vec<String> = (1..=5).map(|i| format!("cost-{}", i)).collect();
    write_xlsx(
        &path,
        &[
            SheetSpec {
                name: "Income",
                rows: numbered_rows(&income),
            },
            SheetSpec {
                name: "Costs",
                rows: numbered_rows(&costs),
            },
        ],
    );

    let output = ParsePipeline::new(test_config()).parse_detailed(&path, None).unwrap();
    assert_eq!(output.format, Format::Xlsx);
    assert_eq!(output.chunk_count, 15);

    let lines: Vec<&str> = output.text.lines().collect();
    assert_eq!(lines.len(), 15);
    assert_eq!(lines[0], "Sheet 'Income', Row 1/10: income-1 | 1");
    assert_eq!(lines[9], "Sheet 'Income', Row 10/10: income-10 | 10");
    assert_eq!(lines[10], "Sheet 'Costs', Row 1/5: cost-1 | 1");
    assert_eq!(lines[14], "Sheet 'Costs', Row 5/5: cost-5 | 5");
    assert!(lines.iter().all(|l| !l.contains("|  |")), "Blank cells must be omitted");
}

#[test]
fn test_xlsx_fractional_numbers() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("rates.xlsx");
    write_xlsx(
        &path,
        &[SheetSpec {
            name: "Rates",
            rows: vec![vec![Some(CellSpec::Text("vat")), Some(CellSpec::Number(0.25))]],
        }],
    );

    let text = ParsePipeline::new(test_config()).parse(&path).unwrap();
    assert_eq!(text, "Sheet 'Rates', Row 1/1: vat | 0.25\n");
}

#[test]
fn test_xlsx_truncated_second_sheet_fails_workbook() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("partial.xlsx");
    let truncated: &[u8] = br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData><row r="1"><c r="A1" t="inlineStr"><is><t>cut"#;

    write_xlsx_with_override(
        &path,
        &[
            SheetSpec {
                name: "Good",
                rows: vec![vec![Some(CellSpec::Text("kept"))]],
            },
            SheetSpec {
                name: "Broken",
                rows: vec![vec![Some(CellSpec::Text("lost"))]],
            },
        ],
        Some(("xl/worksheets/sheet2.xml", truncated)),
    );

    let err = ParsePipeline::new(test_config()).parse(&path).unwrap_err();
    assert!(matches!(err, ParseError::CorruptWorkbook { .. }), "got {:?}", err);
    assert!(err.to_string().contains("Broken"));
}

#[test]
fn test_xlsx_extension_on_non_package() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("ledger.xlsx");
    fs::write(&path, [0u8, 1, 0, 2, 0, 3, 0, 4, 0, 5]).unwrap();

    let err = ParsePipeline::new(test_config()).parse(&path).unwrap_err();
    assert!(matches!(err, ParseError::CorruptWorkbook { .. }), "got {:?}", err);
    assert!(!err.is_transient());
}

#[test]
fn test_docx_paragraphs() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("letter.docx");
    write_docx(&path, &["Dear reader,", "", "Thanks for reading."]);

    let output = ParsePipeline::new(test_config()).parse_detailed(&path, None).unwrap();
    assert_eq!(output.format, Format::Docx);
    assert_eq!(output.chunk_count, 3);
    assert_eq!(output.text, "Dear reader,\n\nThanks for reading.\n");
}

#[test]
fn test_docx_parse_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("memo.docx");
    write_docx(&path, &["first", "second"]);

    let pipeline = ParsePipeline::new(test_config());
    assert_eq!(pipeline.parse(&path).unwrap(), pipeline.parse(&path).unwrap());
}

#[test]
fn test_docx_with_broken_xml() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.docx");
    write_zip(&path, &[("word/document.xml", b"<w:document><w:body><w:p>")]);

    let err = ParsePipeline::new(test_config()).parse(&path).unwrap_err();
    assert!(matches!(err, ParseError::CorruptDocument { .. }), "got {:?}", err);
}

#[test]
fn test_docx_extension_on_non_package() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("fake.docx");
    fs::write(&path, [0u8, 159, 146, 150, 0, 0, 1, 2, 3]).unwrap();

    // Content sniffing cannot name it, so the .docx suffix routes it to the DOCX extractor
    let err = ParsePipeline::new(test_config()).parse(&path).unwrap_err();
    assert!(matches!(err, ParseError::CorruptDocument { .. }), "got {:?}", err);
}
