//! Report writers for the exported records.
//!
//! The HTML table is the artifact election staff open in a browser; CSV and
//! JSON are for further processing. Column headers are always the export
//! headers (`AC CODE`, `PART CODE`, …) in table order.

use crate::error::VoterListError;
use crate::record::ExportRecord;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

/// Output format of a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Html,
    Csv,
    Json,
}

impl ReportFormat {
    /// Infer the format from an output file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "html" | "htm" => Some(ReportFormat::Html),
            "csv" => Some(ReportFormat::Csv),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ReportFormat::Html => "html",
            ReportFormat::Csv => "csv",
            ReportFormat::Json => "json",
        }
    }
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "html" | "htm" => Ok(ReportFormat::Html),
            "csv" => Ok(ReportFormat::Csv),
            "json" => Ok(ReportFormat::Json),
            other => Err(format!("unknown report format '{other}' (expected html, csv or json)")),
        }
    }
}

/// Render `records` as a standalone HTML page.
pub fn render_html(records: &[ExportRecord], title: &str) -> String {
    let title = html_escape::encode_text(title);
    let mut html = String::with_capacity(256 + records.len() * 400);

    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>{title}</title>\n"));
    html.push_str(
        "<style>table{border-collapse:collapse}th,td{border:1px solid #999;padding:2px 6px}</style>\n",
    );
    html.push_str("</head>\n<body>\n");
    html.push_str(&format!("<h1>{title}</h1>\n"));
    html.push_str(&format!("<p>{} records</p>\n", records.len()));
    html.push_str("<table>\n<thead>\n<tr>\n");
    for header in ExportRecord::headers() {
        html.push_str(&format!("<th>{}</th>\n", html_escape::encode_text(header)));
    }
    html.push_str("</tr>\n</thead>\n<tbody>\n");
    for record in records {
        html.push_str("<tr>");
        for value in record.values() {
            html.push_str(&format!("<td>{}</td>", html_escape::encode_text(&value)));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</tbody>\n</table>\n</body>\n</html>\n");
    html
}

/// Write `records` as CSV with a header line.
pub fn write_csv<W: Write>(records: &[ExportRecord], writer: W) -> Result<(), VoterListError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for record in records {
        wtr.serialize(record)?;
    }
    if records.is_empty() {
        wtr.write_record(ExportRecord::headers())?;
    }
    wtr.flush()
        .map_err(|e| VoterListError::CsvFailed(csv::Error::from(e)))?;
    Ok(())
}

/// Write `records` as HTML.
pub fn write_html<W: Write>(
    records: &[ExportRecord],
    title: &str,
    mut writer: W,
) -> Result<(), std::io::Error> {
    writer.write_all(render_html(records, title).as_bytes())
}

/// Write `records` as a pretty-printed JSON array.
pub fn write_json<W: Write>(records: &[ExportRecord], writer: W) -> Result<(), VoterListError> {
    serde_json::to_writer_pretty(writer, records)
        .map_err(|e| VoterListError::Internal(format!("JSON serialisation failed: {}", e)))
}

/// Render `records` in `format` into memory.
pub fn render(records: &[ExportRecord], format: ReportFormat, title: &str) -> Result<Vec<u8>, VoterListError> {
    let mut buf = Vec::new();
    match format {
        ReportFormat::Html => buf.extend_from_slice(render_html(records, title).as_bytes()),
        ReportFormat::Csv => write_csv(records, &mut buf)?,
        ReportFormat::Json => write_json(records, &mut buf)?,
    }
    Ok(buf)
}
