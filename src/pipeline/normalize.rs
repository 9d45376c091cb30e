//! Row normalisation: raw extractor rows → 15-field [`VoterRow`]s.
//!
//! Extractors return ragged rows (a merged cell eats a column, a stray
//! ruling line adds one) with line breaks inside cells, and repeat the
//! table header on every page. This stage fixes width, cleans cells and
//! drops the headers. It never fails.

use crate::config::HeaderPolicy;
use crate::record::{RawRow, VoterRow, COLUMN_COUNT};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static RE_LINE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r\n|\r|\n").unwrap());

/// Counters from a normalisation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeStats {
    /// Rows that were not exactly 15 cells wide.
    pub reshaped: usize,
    /// Rows dropped as headers.
    pub headers: usize,
}

/// Clean one cell: each line break becomes a space, then trim.
pub fn clean_cell(cell: Option<&str>) -> String {
    match cell {
        Some(text) => RE_LINE_BREAK.replace_all(text, " ").trim().to_string(),
        None => String::new(),
    }
}

/// Truncate or right-pad `raw` to exactly [`COLUMN_COUNT`] cleaned cells.
pub fn reconcile_width(raw: &RawRow) -> [String; COLUMN_COUNT] {
    std::array::from_fn(|i| clean_cell(raw.get(i).and_then(|c| c.as_deref())))
}

/// Whether a row of cleaned cells is a repeated table header.
///
/// Looks only at the cell contents, never at where the row sits.
pub fn is_header_row<S: AsRef<str>>(cells: &[S], policy: HeaderPolicy) -> bool {
    let joined: String = cells.iter().map(|c| c.as_ref()).collect();
    policy.matches(&joined.to_uppercase())
}

/// Normalise one raw row, or `None` if it is a header.
pub fn normalize_row(raw: &RawRow, policy: HeaderPolicy) -> Option<VoterRow> {
    let cells = reconcile_width(raw);
    if is_header_row(&cells, policy) {
        return None;
    }
    Some(VoterRow::from_cells(cells))
}

/// Normalise a sequence of raw rows, keeping order.
pub fn normalize_rows<'a, I>(rows: I, policy: HeaderPolicy) -> (Vec<VoterRow>, NormalizeStats)
where
    I: IntoIterator<Item = &'a RawRow>,
{
    let mut stats = NormalizeStats::default();
    let mut out = Vec::new();

    for raw in rows {
        if raw.len() != COLUMN_COUNT {
            stats.reshaped += 1;
        }
        match normalize_row(raw, policy) {
            Some(row) => out.push(row),
            None => stats.headers += 1,
        }
    }

    debug!(
        "Normalised {} rows ({} reshaped, {} headers dropped)",
        out.len(),
        stats.reshaped,
        stats.headers
    );
    (out, stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(cells: &[&str]) -> RawRow {
        cells.iter().map(|c| Some(c.to_string())).collect()
    }

    #[test]
    fn short_rows_are_padded() {
        let row = normalize_row(&raw(&["90", "143", "1"]), HeaderPolicy::AllOf).unwrap();
        assert_eq!(row.ac, "90");
        assert_eq!(row.sl, "1");
        assert_eq!(row.house_name, "");
        assert_eq!(row.cells().len(), COLUMN_COUNT);
    }

    #[test]
    fn long_rows_are_truncated() {
        let cells: Vec<String> = (0..20).map(|i| i.to_string()).collect();
        let r: RawRow = cells.into_iter().map(Some).collect();
        let row = normalize_row(&r, HeaderPolicy::AllOf).unwrap();
        assert_eq!(row.house_name, "14");
    }

    #[test]
    fn every_width_yields_fifteen_cells() {
        for width in 0..40 {
            let r: RawRow = (0..width).map(|i| Some(format!("v{i}"))).collect();
            let cells = reconcile_width(&r);
            assert_eq!(cells.len(), COLUMN_COUNT);
        }
    }

    #[test]
    fn missing_cells_become_empty() {
        let r: RawRow = vec![Some("90".into()), None, Some(" 3 ".into())];
        let cells = reconcile_width(&r);
        assert_eq!(cells[1], "");
        assert_eq!(cells[2], "3");
    }

    #[test]
    fn line_breaks_become_single_spaces() {
        assert_eq!(clean_cell(Some(" Ravi\nKumar ")), "Ravi Kumar");
        assert_eq!(clean_cell(Some("a\r\nb\rc")), "a b c");
        assert_eq!(clean_cell(None), "");
    }

    #[test]
    fn header_rows_are_dropped() {
        let header = raw(&[
            "AC", "PART", "SL", "HOUSE", "SECN", "NAME", "LAST", "RELATION\nTYPE", "", "", "ID_CARD_NO", "LINK",
            "SEX", "AGE", "HOUSE NAME",
        ]);
        assert!(normalize_row(&header, HeaderPolicy::AllOf).is_none());
        assert!(normalize_row(&header, HeaderPolicy::AnyOf).is_none());
    }

    #[test]
    fn header_detection_is_case_insensitive() {
        assert!(is_header_row(&["relation", "sex"], HeaderPolicy::AllOf));
    }

    #[test]
    fn all_of_keeps_rows_with_one_marker() {
        let r = raw(&["90", "143", "7", "", "", "Sexton"]);
        assert!(normalize_row(&r, HeaderPolicy::AllOf).is_some());
        assert!(normalize_row(&r, HeaderPolicy::AnyOf).is_none());
    }

    #[test]
    fn header_detection_ignores_position() {
        let header = raw(&["RELATION", "SEX"]);
        let data = raw(&["90", "143", "1", "", "", "Ravi"]);
        let rows = vec![data.clone(), header.clone(), data, header];
        let (out, stats) = normalize_rows(&rows, HeaderPolicy::AllOf);
        assert_eq!(out.len(), 2);
        assert_eq!(stats.headers, 2);
        assert_eq!(stats.reshaped, 4);
    }
}
