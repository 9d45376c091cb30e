//! Pipeline entry points.
//!
//! [`convert`] runs the whole thing against the configured converter page.
//! [`convert_with_oracle`] takes any [`TransliterationOracle`] instead, which
//! is how tests and alternative converters plug in. [`preview`] stops before
//! decoding and never contacts the converter.

use crate::config::PipelineConfig;
use crate::error::VoterListError;
use crate::oracle::{HttpFormSurface, SurfaceOracle, TransliterationOracle};
use crate::output::{RunOutput, RunStats};
use crate::pipeline::decode::BatchDecoder;
use crate::pipeline::{assemble, extract, input, merge, normalize};
use crate::record::{ExportRecord, LogicalRecord, RawRow};
use crate::report::{self, ReportFormat};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Rows, records and counters produced before decoding starts.
struct Prepared {
    records: Vec<LogicalRecord>,
    stats: RunStats,
}

/// Extract raw table rows from a PDF or CSV path or URL.
pub async fn load_rows(
    input_str: impl AsRef<str>,
    config: &PipelineConfig,
) -> Result<Vec<RawRow>, VoterListError> {
    let input_str = input_str.as_ref();
    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let rows = extract::extract_rows(&resolved, config).await?;
    info!("Extracted {} raw rows from {}", rows.len(), input_str);
    Ok(rows)
}

/// Normalise and merge, failing when nothing usable is left.
fn prepare(rows: Vec<RawRow>, config: &PipelineConfig) -> Result<Prepared, VoterListError> {
    if rows.is_empty() {
        return Err(VoterListError::ExtractionEmpty {
            detail: "the extractor returned no table rows".to_string(),
        });
    }

    let (normalized, norm_stats) = normalize::normalize_rows(&rows, config.header_policy);
    if normalized.is_empty() {
        return Err(VoterListError::ExtractionEmpty {
            detail: format!("all {} rows were table headers", rows.len()),
        });
    }

    let row_count = normalized.len();
    let records = merge::merge_rows(normalized, &config.new_record);

    let stats = RunStats {
        raw_rows: rows.len(),
        reshaped_rows: norm_stats.reshaped,
        header_rows: norm_stats.headers,
        continuation_rows: row_count - records.len(),
        logical_records: records.len(),
        ..Default::default()
    };
    info!(
        "{} rows → {} records ({} headers dropped, {} continuation rows merged)",
        stats.raw_rows, stats.logical_records, stats.header_rows, stats.continuation_rows
    );
    Ok(Prepared { records, stats })
}

/// Run already-extracted rows through normalisation, merging and decoding.
///
/// The oracle is opened before the first exchange and closed after the
/// last one. A failed `open` is not fatal: every batch then falls back to
/// its original values and the run still produces a dataset.
///
/// # Errors
/// [`VoterListError::ExtractionEmpty`] when `rows` is empty or only holds
/// header rows. Converter failures never surface here.
pub async fn convert_rows(
    rows: Vec<RawRow>,
    config: &PipelineConfig,
    oracle: &mut dyn TransliterationOracle,
) -> Result<RunOutput, VoterListError> {
    let start = Instant::now();
    let Prepared { records, mut stats } = prepare(rows, config)?;

    let planned = assemble::plan_batches(&records, config.batch_size);
    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(records.len(), planned);
    }

    let decode_start = Instant::now();
    if let Err(e) = oracle.open().await {
        warn!("Converter session failed to open, values will stay undecoded: {}", e);
    }

    let (exported, batches) = {
        let mut decoder = BatchDecoder::new(oracle, config.batch_size)
            .with_progress(config.progress_callback.clone());
        let exported =
            assemble::assemble_records(records, &mut decoder, &config.id_card_placeholder).await;
        (exported, decoder.into_reports())
    };
    oracle.close().await;
    stats.decode_duration_ms = decode_start.elapsed().as_millis() as u64;

    stats.exported_records = exported.len();
    stats.purged_records = stats.logical_records - exported.len();
    stats.batches = batches.len();
    stats.fallback_batches = batches.iter().filter(|b| b.status.is_fallback()).count();
    stats.total_duration_ms = start.elapsed().as_millis() as u64;

    if stats.fallback_batches > 0 {
        warn!(
            "{}/{} batches kept their original values",
            stats.fallback_batches, stats.batches
        );
    }
    info!(
        "Run complete: {} records, {} batches, {}ms",
        stats.exported_records, stats.batches, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(stats.exported_records, stats.fallback_batches);
    }

    Ok(RunOutput {
        records: exported,
        batches,
        stats,
    })
}

/// Extract from `input_str` and decode through `oracle`.
pub async fn convert_with_oracle(
    input_str: impl AsRef<str>,
    config: &PipelineConfig,
    oracle: &mut dyn TransliterationOracle,
) -> Result<RunOutput, VoterListError> {
    let total_start = Instant::now();
    info!("Starting run: {}", input_str.as_ref());

    let rows = load_rows(input_str, config).await?;
    let extract_duration_ms = total_start.elapsed().as_millis() as u64;

    let mut output = convert_rows(rows, config, oracle).await?;
    output.stats.extract_duration_ms = extract_duration_ms;
    output.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
    Ok(output)
}

/// Convert a voter-list PDF (or extracted CSV) into decoded records.
///
/// This is the primary entry point for the library. The converter page at
/// `config.converter_url` is driven through [`HttpFormSurface`].
///
/// # Example
/// ```rust,no_run
/// use voterlist::{convert, PipelineConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = PipelineConfig::default();
/// let output = convert("S11A90P143.pdf", &config).await?;
/// println!("{} voters, {} batches fell back",
///     output.records.len(), output.stats.fallback_batches);
/// # Ok(())
/// # }
/// ```
///
/// # Errors
/// Only whole-run failures: unreadable input, no table data, or an HTTP
/// client that cannot be built.
pub async fn convert(
    input_str: impl AsRef<str>,
    config: &PipelineConfig,
) -> Result<RunOutput, VoterListError> {
    let surface = HttpFormSurface::from_config(config)?;
    let mut oracle = SurfaceOracle::new(
        surface,
        Duration::from_millis(config.settle_delay_ms),
        Duration::from_millis(config.warmup_delay_ms),
    );
    convert_with_oracle(input_str, config, &mut oracle).await
}

/// Extract and merge without decoding.
///
/// Text columns keep their encoded form. Useful for checking the table
/// extraction before spending minutes on the converter.
pub async fn preview(
    input_str: impl AsRef<str>,
    config: &PipelineConfig,
) -> Result<Vec<ExportRecord>, VoterListError> {
    let rows = load_rows(input_str, config).await?;
    let Prepared { records, .. } = prepare(rows, config)?;
    Ok(assemble::finalize(records, &config.id_card_placeholder))
}

/// Convert and write the report straight to a file.
///
/// `format` defaults to the one implied by the output extension, then HTML.
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn convert_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    format: Option<ReportFormat>,
    config: &PipelineConfig,
) -> Result<RunStats, VoterListError> {
    let title = report_title(input_str.as_ref());
    let output = convert(input_str, config).await?;
    let path = output_path.as_ref();
    let format = format
        .or_else(|| ReportFormat::from_path(path))
        .unwrap_or_default();
    write_report(&output.records, path, format, &title).await?;
    Ok(output.stats)
}

/// Render `records` and write them to `path` atomically.
pub async fn write_report(
    records: &[ExportRecord],
    path: &Path,
    format: ReportFormat,
    title: &str,
) -> Result<(), VoterListError> {
    let bytes = report::render(records, format, title)?;
    let write_failed = |e: std::io::Error| VoterListError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(write_failed)?;
        }
    }

    let tmp_path = path.with_extension(format!("{}.tmp", format.extension()));
    tokio::fs::write(&tmp_path, &bytes).await.map_err(write_failed)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_failed)?;

    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input_str: impl AsRef<str>,
    config: &PipelineConfig,
) -> Result<RunOutput, VoterListError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| VoterListError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(input_str, config))
}

/// Report title for an input: its file stem, or the input itself.
pub fn report_title(input_str: &str) -> String {
    let trimmed = input_str.trim_end_matches('/');
    let name = trimmed.rsplit(['/', '\\']).next().unwrap_or(trimmed);
    let stem = name.split(['?', '#']).next().unwrap_or(name);
    match stem.rsplit_once('.') {
        Some((base, _)) if !base.is_empty() => base.to_string(),
        _ => stem.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OracleError;
    use async_trait::async_trait;

    struct Upper {
        opened: bool,
        closed: bool,
    }

    #[async_trait]
    impl TransliterationOracle for Upper {
        async fn open(&mut self) -> Result<(), OracleError> {
            self.opened = true;
            Ok(())
        }

        async fn decode(&mut self, batch: &[String]) -> Result<Vec<String>, OracleError> {
            Ok(batch.iter().map(|v| v.to_uppercase()).collect())
        }

        async fn close(&mut self) {
            self.closed = true;
        }
    }

    fn raw(cells: &[&str]) -> RawRow {
        cells.iter().map(|c| Some(c.to_string())).collect()
    }

    #[test]
    fn report_title_cases() {
        assert_eq!(report_title("/data/S11A90P143.pdf"), "S11A90P143");
        assert_eq!(report_title("https://x.test/rolls/p1.pdf?dl=1"), "p1");
        assert_eq!(report_title("rows"), "rows");
    }

    #[tokio::test]
    async fn empty_input_is_no_data() {
        let config = PipelineConfig::default();
        let mut oracle = Upper { opened: false, closed: false };
        let err = convert_rows(vec![], &config, &mut oracle).await.unwrap_err();
        assert!(matches!(err, VoterListError::ExtractionEmpty { .. }));
        assert!(!oracle.opened);
    }

    #[tokio::test]
    async fn only_headers_is_no_data() {
        let config = PipelineConfig::default();
        let mut oracle = Upper { opened: false, closed: false };
        let rows = vec![raw(&["AC", "PART", "SL", "", "", "NAME", "", "RELATION", "", "", "ID_CARD_NO", "", "SEX", "AGE", ""])];
        let err = convert_rows(rows, &config, &mut oracle).await.unwrap_err();
        assert!(matches!(err, VoterListError::ExtractionEmpty { .. }));
    }

    #[tokio::test]
    async fn session_is_opened_and_closed() {
        let config = PipelineConfig::default();
        let mut oracle = Upper { opened: false, closed: false };
        let rows = vec![
            raw(&["90", "143", "1", "81u", "1", "ravi", "", "f", "gopi", "", "KL001", "143", "M", "40", "rose"]),
            raw(&["", "", "", "", "", "kumar"]),
        ];
        let out = convert_rows(rows, &config, &mut oracle).await.unwrap();
        assert!(oracle.opened && oracle.closed);
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].first_name, "RAVI KUMAR");
        assert_eq!(out.records[0].house_no, "81U");
        assert_eq!(out.stats.raw_rows, 2);
        assert_eq!(out.stats.reshaped_rows, 1);
        assert_eq!(out.stats.continuation_rows, 1);
        assert_eq!(out.stats.fallback_batches, 0);
    }

    #[tokio::test]
    async fn report_is_written_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.csv");
        let records = vec![ExportRecord {
            sl_no: 1,
            first_name: "രവി".into(),
            ..Default::default()
        }];
        write_report(&records, &path, ReportFormat::Csv, "t").await.unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("രവി"));
        assert!(!path.with_extension("csv.tmp").exists());
    }
}
