//! Table extraction: PDF text layer or CSV file → [`RawRow`]s.
//!
//! ## PDF
//!
//! The roll is a ruled table, but ruling lines are not reliable in the text
//! layer, so rows are rebuilt from text positions instead:
//!
//! 1. collect every text segment of a page with its bounding box;
//! 2. group segments whose baselines lie within `row_tolerance` points into
//!    one line, top to bottom;
//! 3. within a line, join segments separated by less than `cell_gap`
//!    points into one cell;
//! 4. take the widest line of the page as the column grid and place every
//!    cell under the rightmost column starting at or before it.
//!
//! Step 4 keeps a wrapped continuation line (only a name cell or two) in
//! the right columns instead of shifting it to the left.
//!
//! pdfium is not async-safe, so the PDF path runs inside
//! `tokio::task::spawn_blocking`.
//!
//! ## CSV
//!
//! Tables extracted elsewhere can be fed in as CSV, one table row per
//! record, no header line required (header rows are dropped later anyway).

use crate::config::PipelineConfig;
use crate::error::VoterListError;
use crate::pipeline::input::{InputKind, ResolvedInput};
use crate::record::RawRow;
use pdfium_render::prelude::*;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

/// A positioned piece of text from the PDF text layer, in points.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl TextRun {
    pub fn new(text: impl Into<String>, left: f32, right: f32, top: f32, bottom: f32) -> Self {
        Self {
            text: text.into(),
            left,
            right,
            top,
            bottom,
        }
    }
}

#[derive(Debug, Clone)]
struct Cell {
    text: String,
    left: f32,
    right: f32,
}

/// Read rows from a resolved input of either kind.
pub async fn extract_rows(
    input: &ResolvedInput,
    config: &PipelineConfig,
) -> Result<Vec<RawRow>, VoterListError> {
    match input.kind() {
        InputKind::Pdf => extract_pdf_rows(input.path(), config).await,
        InputKind::Csv => read_csv_file(input.path()).await,
    }
}

/// Rebuild table rows from the selected pages of a PDF, in reading order.
pub async fn extract_pdf_rows(
    pdf_path: &Path,
    config: &PipelineConfig,
) -> Result<Vec<RawRow>, VoterListError> {
    let path = pdf_path.to_path_buf();
    let password = config.password.clone();
    let pages = config.pages.clone();
    let (tolerance, gap) = (config.row_tolerance, config.cell_gap);

    tokio::task::spawn_blocking(move || {
        let pdfium = bind_pdfium()?;
        let document = open_document(&pdfium, &path, password.as_deref())?;

        let total = document.pages().len() as usize;
        let indices = pages.to_indices(total);
        if indices.is_empty() {
            return Err(VoterListError::PageOutOfRange { page: 0, total });
        }
        info!("PDF loaded: {} pages, {} selected", total, indices.len());

        let mut rows = Vec::new();
        for idx in indices {
            let runs = page_runs(&document, idx)?;
            let page_rows = group_runs(runs, tolerance, gap);
            debug!("Page {}: {} table rows", idx + 1, page_rows.len());
            rows.extend(page_rows);
        }
        Ok(rows)
    })
    .await
    .map_err(|e| VoterListError::Internal(format!("Extraction task panicked: {}", e)))?
}

/// Bind pdfium: `PDFIUM_LIB_PATH` first, then the working directory, then
/// the system library.
fn bind_pdfium() -> Result<Pdfium, VoterListError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(path) if !path.is_empty() => Pdfium::bind_to_library(&path),
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| VoterListError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

fn open_document<'a>(
    pdfium: &'a Pdfium,
    pdf_path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, VoterListError> {
    pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                VoterListError::WrongPassword {
                    path: pdf_path.to_path_buf(),
                }
            } else {
                VoterListError::PasswordRequired {
                    path: pdf_path.to_path_buf(),
                }
            }
        } else {
            VoterListError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: err_str,
            }
        }
    })
}

fn page_runs(document: &PdfDocument<'_>, idx: usize) -> Result<Vec<TextRun>, VoterListError> {
    let failed = |e: PdfiumError| VoterListError::ExtractionFailed {
        page: idx + 1,
        detail: format!("{:?}", e),
    };

    let page = document.pages().get(idx as u16).map_err(failed)?;
    let text = page.text().map_err(failed)?;

    let runs: Vec<TextRun> = text
        .segments()
        .iter()
        .map(|segment| {
            let bounds = segment.bounds();
            TextRun::new(
                segment.text(),
                bounds.left().value,
                bounds.right().value,
                bounds.top().value,
                bounds.bottom().value,
            )
        })
        .collect();

    if runs.is_empty() {
        warn!("Page {} has no text layer", idx + 1);
    }
    Ok(runs)
}

/// Group positioned text into table rows.
///
/// Pure: the PDF path feeds it pdfium segments, tests feed it by hand.
/// Rows come out top to bottom; every row has one cell per column of the
/// widest line, `None` where nothing was printed.
pub fn group_runs(runs: Vec<TextRun>, row_tolerance: f32, cell_gap: f32) -> Vec<RawRow> {
    let mut runs: Vec<TextRun> = runs.into_iter().filter(|r| !r.text.trim().is_empty()).collect();
    // PDF y grows upwards.
    runs.sort_by(|a, b| b.bottom.total_cmp(&a.bottom).then(a.left.total_cmp(&b.left)));

    let mut lines: Vec<Vec<TextRun>> = Vec::new();
    let mut baseline = f32::NAN;
    for run in runs {
        // NaN baseline: the first run always opens a line.
        if (baseline - run.bottom).abs() <= row_tolerance {
            if let Some(line) = lines.last_mut() {
                line.push(run);
            }
        } else {
            baseline = run.bottom;
            lines.push(vec![run]);
        }
    }

    let lines: Vec<Vec<Cell>> = lines.into_iter().map(|line| into_cells(line, cell_gap)).collect();

    let anchors: Vec<f32> = match lines.iter().max_by_key(|line| line.len()) {
        Some(widest) => widest.iter().map(|c| c.left).collect(),
        None => return Vec::new(),
    };

    lines
        .into_iter()
        .map(|line| place_cells(line, &anchors, cell_gap))
        .collect()
}

fn into_cells(mut line: Vec<TextRun>, cell_gap: f32) -> Vec<Cell> {
    line.sort_by(|a, b| a.left.total_cmp(&b.left));

    let mut cells: Vec<Cell> = Vec::new();
    for run in line {
        let text = run.text.trim();
        let gap = cells.last().map(|c| run.left - c.right);
        match gap {
            Some(gap) if gap < cell_gap => {
                if let Some(cell) = cells.last_mut() {
                    if gap > 0.5 {
                        cell.text.push(' ');
                    }
                    cell.text.push_str(text);
                    cell.right = cell.right.max(run.right);
                }
            }
            _ => cells.push(Cell {
                text: text.to_string(),
                left: run.left,
                right: run.right,
            }),
        }
    }
    cells
}

fn place_cells(line: Vec<Cell>, anchors: &[f32], cell_gap: f32) -> RawRow {
    let mut row: RawRow = vec![None; anchors.len()];
    for cell in line {
        let column = anchors
            .iter()
            .rposition(|&a| a <= cell.left + cell_gap)
            .unwrap_or(0);
        match &mut row[column] {
            Some(existing) => {
                existing.push(' ');
                existing.push_str(&cell.text);
            }
            slot => *slot = Some(cell.text),
        }
    }
    row
}

/// Read a table from CSV, one row per record. Empty cells become `None`.
pub fn read_csv_rows<R: Read>(reader: R) -> Result<Vec<RawRow>, VoterListError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        rows.push(
            record
                .iter()
                .map(|c| if c.is_empty() { None } else { Some(c.to_string()) })
                .collect(),
        );
    }
    Ok(rows)
}

/// Read a CSV table from disk.
pub async fn read_csv_file(path: &Path) -> Result<Vec<RawRow>, VoterListError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => VoterListError::FileNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => VoterListError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => VoterListError::Internal(format!("Failed to read '{}': {}", path.display(), e)),
    })?;
    let rows = read_csv_rows(bytes.as_slice())?;
    info!("Read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A run one line high whose baseline is `y`.
    fn run(text: &str, left: f32, width: f32, y: f32) -> TextRun {
        TextRun::new(text, left, left + width, y + 8.0, y)
    }

    fn cell(row: &RawRow, i: usize) -> Option<&str> {
        row.get(i).and_then(|c| c.as_deref())
    }

    #[test]
    fn lines_are_grouped_top_down() {
        let rows = group_runs(
            vec![
                run("low", 10.0, 20.0, 100.0),
                run("high", 10.0, 20.0, 700.0),
                run("high2", 60.0, 20.0, 701.0),
            ],
            2.0,
            6.0,
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(cell(&rows[0], 0), Some("high"));
        assert_eq!(cell(&rows[0], 1), Some("high2"));
        assert_eq!(cell(&rows[1], 0), Some("low"));
        assert_eq!(cell(&rows[1], 1), None);
    }

    #[test]
    fn close_runs_join_into_one_cell() {
        let rows = group_runs(
            vec![
                run("Ravi", 100.0, 20.0, 500.0),
                run("Kumar", 122.0, 25.0, 500.0),
                run("M", 200.0, 5.0, 500.0),
            ],
            2.0,
            6.0,
        );
        assert_eq!(rows[0], vec![Some("Ravi Kumar".to_string()), Some("M".to_string())]);
    }

    #[test]
    fn continuation_line_keeps_its_column() {
        // SL, Name, Sex columns; the wrapped line only prints a name.
        let rows = group_runs(
            vec![
                run("1", 10.0, 5.0, 600.0),
                run("Ravi", 50.0, 20.0, 600.0),
                run("M", 150.0, 5.0, 600.0),
                run("Kumar", 51.0, 25.0, 590.0),
            ],
            2.0,
            6.0,
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], vec![None, Some("Kumar".to_string()), None]);
    }

    #[test]
    fn blank_runs_are_ignored() {
        assert!(group_runs(vec![run("  ", 1.0, 1.0, 1.0)], 2.0, 6.0).is_empty());
        assert!(group_runs(Vec::new(), 2.0, 6.0).is_empty());
    }

    #[test]
    fn csv_rows_keep_ragged_width() {
        let data = "90,143,1,81U,1,Ravi\n,,,,,Kumar,,,,,,,,,,extra\n";
        let rows = read_csv_rows(data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].len(), 6);
        assert_eq!(rows[1].len(), 16);
        assert_eq!(cell(&rows[0], 3), Some("81U"));
        assert_eq!(cell(&rows[1], 0), None);
        assert_eq!(cell(&rows[1], 5), Some("Kumar"));
    }

    #[test]
    fn csv_quoted_cells_keep_line_breaks() {
        let data = "1,\"Ravi\nKumar\"\n";
        let rows = read_csv_rows(data.as_bytes()).unwrap();
        assert_eq!(cell(&rows[0], 1), Some("Ravi\nKumar"));
    }

    #[tokio::test]
    async fn csv_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.csv");
        std::fs::write(&path, "a,b\nc,d\n").unwrap();
        let rows = read_csv_file(&path).await.unwrap();
        assert_eq!(rows.len(), 2);
    }
}
