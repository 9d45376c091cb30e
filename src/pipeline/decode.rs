//! Batch decoding of one column through the converter.
//!
//! ## Guarantees
//!
//! [`BatchDecoder::decode_column`] returns exactly as many values as it was
//! given, in the same order. Every output value is either the converter's
//! text for that position or the original input value:
//!
//! - empty and purely numeric values are never sent and come back unchanged;
//! - a short reply is padded with `""`, a long one is truncated;
//! - a failed exchange returns the whole batch unchanged.
//!
//! Exchanges are issued one at a time; the decoder holds the only `&mut`
//! to the oracle for the whole run.

use crate::error::OracleError;
use crate::oracle::TransliterationOracle;
use crate::output::{BatchReport, BatchStatus};
use crate::pipeline::is_all_digits;
use crate::progress::ProgressCallback;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Whether `value` is sent to the converter: non-empty and not all digits
/// after trimming.
pub fn is_decodable(value: &str) -> bool {
    let trimmed = value.trim();
    !trimmed.is_empty() && !is_all_digits(trimmed)
}

/// Number of batches needed for `values` at `batch_size`.
pub fn batch_count<S: AsRef<str>>(values: &[S], batch_size: usize) -> usize {
    let selected = values.iter().filter(|v| is_decodable(v.as_ref())).count();
    selected.div_ceil(batch_size.max(1))
}

/// Value as sent to the converter: trimmed, with no embedded line breaks
/// (a newline would split one value into two output lines).
fn wire_value(value: &str) -> String {
    value.trim().replace(['\r', '\n'], " ")
}

/// Force `lines` to exactly `expected` entries.
pub fn reconcile_lines(mut lines: Vec<String>, expected: usize) -> (Vec<String>, BatchStatus) {
    let status = match lines.len() {
        n if n < expected => BatchStatus::Padded {
            missing: expected - n,
        },
        n if n > expected => BatchStatus::Truncated {
            extra: n - expected,
        },
        _ => BatchStatus::Decoded,
    };
    lines.resize(expected, String::new());
    (lines, status)
}

/// Decodes columns batch by batch over a single converter session.
pub struct BatchDecoder<'a> {
    oracle: &'a mut dyn TransliterationOracle,
    batch_size: usize,
    progress: Option<ProgressCallback>,
    reports: Vec<BatchReport>,
}

impl<'a> BatchDecoder<'a> {
    /// `batch_size` values at most per exchange (values below 1 are treated as 1).
    pub fn new(oracle: &'a mut dyn TransliterationOracle, batch_size: usize) -> Self {
        Self {
            oracle,
            batch_size: batch_size.max(1),
            progress: None,
            reports: Vec::new(),
        }
    }

    pub fn with_progress(mut self, progress: Option<ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Reports for every exchange so far, in issue order.
    pub fn reports(&self) -> &[BatchReport] {
        &self.reports
    }

    pub fn into_reports(self) -> Vec<BatchReport> {
        self.reports
    }

    /// Decode one column.
    ///
    /// `field` labels log lines and reports; it does not affect decoding.
    pub async fn decode_column(&mut self, field: &str, values: &[String]) -> Vec<String> {
        let selected: Vec<(usize, String)> = values
            .iter()
            .enumerate()
            .filter(|(_, v)| is_decodable(v))
            .map(|(i, v)| (i, wire_value(v)))
            .collect();

        let mut result = values.to_vec();
        if selected.is_empty() {
            debug!("'{}': nothing to decode ({} values)", field, values.len());
            return result;
        }

        let total = selected.len().div_ceil(self.batch_size);
        info!(
            "Decoding '{}': {} of {} values in {} batches",
            field,
            selected.len(),
            values.len(),
            total
        );
        if let Some(ref cb) = self.progress {
            cb.on_field_start(field, selected.len(), total);
        }

        for (index, chunk) in selected.chunks(self.batch_size).enumerate() {
            let batch: Vec<String> = chunk.iter().map(|(_, v)| v.clone()).collect();
            let start = Instant::now();

            let (decoded, status) = match self.oracle.decode(&batch).await {
                Ok(lines) => reconcile_lines(lines, batch.len()),
                Err(error) => {
                    warn!(
                        "'{}' batch {}/{} fell back to original values: {}",
                        field,
                        index + 1,
                        total,
                        error
                    );
                    (fallback(values, chunk), BatchStatus::Fallback { error })
                }
            };

            for ((position, _), value) in chunk.iter().zip(decoded) {
                result[*position] = value;
            }

            let report = BatchReport {
                field: field.to_string(),
                index,
                of: total,
                size: batch.len(),
                status,
                duration_ms: start.elapsed().as_millis() as u64,
            };
            debug!(
                "'{}' batch {}/{}: {:?} in {}ms",
                field,
                index + 1,
                total,
                report.status,
                report.duration_ms
            );
            if let Some(ref cb) = self.progress {
                cb.on_batch_complete(&report);
            }
            self.reports.push(report);
        }

        result
    }
}

/// The original values of a failed batch.
fn fallback(values: &[String], chunk: &[(usize, String)]) -> Vec<String> {
    chunk.iter().map(|(i, _)| values[*i].clone()).collect()
}

/// An oracle that fails every exchange; decoding with it is the identity.
///
/// Used for dry runs where the converter must not be contacted.
pub struct PassThroughOracle;

#[async_trait::async_trait]
impl TransliterationOracle for PassThroughOracle {
    async fn decode(&mut self, _batch: &[String]) -> Result<Vec<String>, OracleError> {
        Err(OracleError::SurfaceMissing {
            element: "converter (dry run)".into(),
        })
    }
}
