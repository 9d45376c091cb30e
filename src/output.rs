//! Result types returned by a run.

use crate::error::OracleError;
use crate::record::ExportRecord;
use serde::{Deserialize, Serialize};

/// How a single batch exchange ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchStatus {
    /// The converter returned exactly one line per value.
    Decoded,
    /// The converter returned too few lines; `missing` entries were padded with "".
    Padded { missing: usize },
    /// The converter returned too many lines; `extra` trailing lines were dropped.
    Truncated { extra: usize },
    /// The exchange failed; the batch kept its original values.
    Fallback { error: OracleError },
}

impl BatchStatus {
    pub fn is_fallback(&self) -> bool {
        matches!(self, BatchStatus::Fallback { .. })
    }
}

/// Outcome of one batch exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Column label the batch belongs to (e.g. "Name", "HouseSuffixes").
    pub field: String,
    /// 0-based batch index within the column.
    pub index: usize,
    /// Total batches for the column.
    pub of: usize,
    /// Number of values in the batch.
    pub size: usize,
    #[serde(flatten)]
    pub status: BatchStatus,
    pub duration_ms: u64,
}

/// Aggregate counters for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Rows produced by the extractor.
    pub raw_rows: usize,
    /// Raw rows whose width was not 15 and were truncated or padded.
    pub reshaped_rows: usize,
    /// Rows dropped as repeated table headers.
    pub header_rows: usize,
    /// Rows folded into the preceding record.
    pub continuation_rows: usize,
    /// Records after merging.
    pub logical_records: usize,
    /// Records dropped by the final placeholder filter.
    pub purged_records: usize,
    /// Records in the output.
    pub exported_records: usize,
    /// Batch exchanges attempted.
    pub batches: usize,
    /// Batch exchanges that fell back to original values.
    pub fallback_batches: usize,
    pub extract_duration_ms: u64,
    pub decode_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything a run produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutput {
    /// Export-ready records in source order.
    pub records: Vec<ExportRecord>,
    /// Every batch exchange in the order it was issued.
    pub batches: Vec<BatchReport>,
    pub stats: RunStats,
}

impl RunOutput {
    /// Whether any batch fell back to undecoded values.
    pub fn has_fallbacks(&self) -> bool {
        self.batches.iter().any(|b| b.status.is_fallback())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_report_json_is_flat() {
        let r = BatchReport {
            field: "Name".into(),
            index: 0,
            of: 2,
            size: 150,
            status: BatchStatus::Padded { missing: 3 },
            duration_ms: 812,
        };
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["status"], "padded");
        assert_eq!(v["missing"], 3);
        assert_eq!(v["field"], "Name");
    }

    #[test]
    fn fallback_detection() {
        let out = RunOutput {
            records: vec![],
            batches: vec![BatchReport {
                field: "RelType".into(),
                index: 0,
                of: 1,
                size: 1,
                status: BatchStatus::Fallback {
                    error: OracleError::Timeout { secs: 30 },
                },
                duration_ms: 30_000,
            }],
            stats: RunStats::default(),
        };
        assert!(out.has_fallbacks());
    }
}
