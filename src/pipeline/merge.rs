//! Continuation-row merging: normalised rows → one record per voter.
//!
//! A long name or address wraps onto the next physical line, and the
//! extractor reports that line as a row of its own with most cells empty.
//! A row that shows no sign of being a new voter is folded into the
//! previous record. Single pass, no lookahead.

use crate::config::NewRecordPolicy;
use crate::pipeline::is_all_digits;
use crate::record::{Field, LogicalRecord, VoterRow};
use tracing::debug;

/// Substring of the ID-card header cell; never a real ID card.
const ID_CARD_MARKER: &str = "ID_CARD";

impl NewRecordPolicy {
    /// Whether `row` starts a new voter under this policy.
    pub fn is_new_record(&self, row: &VoterRow) -> bool {
        if self.sl_digits && is_all_digits(row.sl.trim()) {
            return true;
        }

        if self.id_card {
            let id = row.id_card.trim();
            if id.chars().count() > 3 && !id.contains(ID_CARD_MARKER) {
                return true;
            }
        }

        if let Some(min_age) = self.min_age {
            let age = row.age.trim();
            if is_all_digits(age) && age_exceeds(age, min_age) {
                return true;
            }
        }

        false
    }
}

/// `age` is all digits; any length is allowed.
fn age_exceeds(age: &str, min_age: u32) -> bool {
    let digits = age.trim_start_matches('0');
    // u32::MAX has ten digits.
    digits.len() > 10 || digits.parse::<u64>().is_ok_and(|a| a > u64::from(min_age))
}

/// Append the wrapped text of `continuation` to `record`.
///
/// Only the name, relation-name and house-name columns carry wrapped text;
/// every other cell of a continuation row is discarded.
pub fn absorb_continuation(record: &mut LogicalRecord, continuation: &VoterRow) {
    for field in Field::CONTINUED {
        let extra = continuation.get(field);
        if !extra.is_empty() {
            let target = record.get_mut(field);
            target.push(' ');
            target.push_str(extra);
        }
    }
}

/// Fold continuation rows into the record before them.
///
/// The first row always starts record zero, even if it looks like a
/// continuation. The output is never empty for non-empty input and never
/// longer than the input.
pub fn merge_rows<I>(rows: I, policy: &NewRecordPolicy) -> Vec<LogicalRecord>
where
    I: IntoIterator<Item = VoterRow>,
{
    let mut records: Vec<LogicalRecord> = Vec::new();
    let mut continuations = 0usize;

    for row in rows {
        if records.is_empty() || policy.is_new_record(&row) {
            records.push(row);
        } else if let Some(previous) = records.last_mut() {
            absorb_continuation(previous, &row);
            continuations += 1;
        }
    }

    debug!(
        "Merged into {} records ({} continuation rows)",
        records.len(),
        continuations
    );
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(sl: &str, name: &str, id_card: &str, age: &str) -> VoterRow {
        VoterRow {
            sl: sl.into(),
            name: name.into(),
            id_card: id_card.into(),
            age: age.into(),
            ..Default::default()
        }
    }

    #[test]
    fn wrapped_name_is_joined() {
        let rows = vec![row("1", "Ravi", "KL/01/001", "40"), row("", "Kumar", "", "")];
        let merged = merge_rows(rows, &NewRecordPolicy::default());
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].name, "Ravi Kumar");
    }

    #[test]
    fn numeric_sl_always_starts_a_record() {
        let rows = vec![row("1", "A", "", ""), row("5", "B", "", "")];
        assert_eq!(merge_rows(rows, &NewRecordPolicy::default()).len(), 2);
        let strict = NewRecordPolicy {
            sl_digits: true,
            id_card: false,
            min_age: Some(17),
        };
        assert!(strict.is_new_record(&row("5", "", "", "")));
    }

    #[test]
    fn blank_sl_id_and_age_is_always_continuation() {
        let policies = [
            NewRecordPolicy::default(),
            NewRecordPolicy {
                min_age: Some(17),
                ..Default::default()
            },
        ];
        for p in policies {
            assert!(!p.is_new_record(&row("", "Kumar", "", "")));
        }
    }

    #[test]
    fn id_card_test() {
        let p = NewRecordPolicy::default();
        assert!(p.is_new_record(&row("", "", "ABC1234", "")));
        assert!(!p.is_new_record(&row("", "", "AB1", "")));
        assert!(!p.is_new_record(&row("", "", "ID_CARD_NO", "")));
    }

    #[test]
    fn age_test_only_when_enabled() {
        let r = row("", "", "", "45");
        assert!(!NewRecordPolicy::default().is_new_record(&r));
        let p = NewRecordPolicy {
            min_age: Some(17),
            ..Default::default()
        };
        assert!(p.is_new_record(&r));
        assert!(!p.is_new_record(&row("", "", "", "17")));
        assert!(!p.is_new_record(&row("", "", "", "4a")));
    }

    #[test]
    fn age_test_has_no_width_limit() {
        let p = NewRecordPolicy {
            sl_digits: false,
            id_card: false,
            min_age: Some(17),
        };
        assert!(p.is_new_record(&row("", "", "", "123456789012345678901234")));
        assert!(p.is_new_record(&row("", "", "", "0045")));
        assert!(!p.is_new_record(&row("", "", "", "00000000000000000000000017")));
    }

    #[test]
    fn continuation_fills_only_wrapped_columns() {
        let first = VoterRow {
            sl: "1".into(),
            name: "Ravi".into(),
            rel_name: "Gopi".into(),
            rel_last: "".into(),
            house_name: "Rose".into(),
            sex: "M".into(),
            ..Default::default()
        };
        let cont = VoterRow {
            name: "Kumar".into(),
            rel_name: "Nath".into(),
            rel_last: "K".into(),
            house_name: "Villa".into(),
            sex: "F".into(),
            last: "ignored".into(),
            ..Default::default()
        };
        let merged = merge_rows(vec![first, cont], &NewRecordPolicy::default());
        let r = &merged[0];
        assert_eq!(r.name, "Ravi Kumar");
        assert_eq!(r.rel_name, "Gopi Nath");
        assert_eq!(r.rel_last, " K");
        assert_eq!(r.house_name, "Rose Villa");
        assert_eq!(r.sex, "M");
        assert_eq!(r.last, "");
    }

    #[test]
    fn first_row_seeds_even_if_continuation_like() {
        let rows = vec![row("", "Orphan", "", ""), row("", "Tail", "", "")];
        let merged = merge_rows(rows, &NewRecordPolicy::default());
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].name, "Orphan Tail");
    }

    #[test]
    fn count_bounds() {
        assert!(merge_rows(Vec::new(), &NewRecordPolicy::default()).is_empty());
        let rows: Vec<VoterRow> = (0..10)
            .map(|i| {
                if i % 3 == 0 {
                    row(&i.to_string(), "n", "", "")
                } else {
                    row("", "w", "", "")
                }
            })
            .collect();
        let merged = merge_rows(rows, &NewRecordPolicy::default());
        assert_eq!(merged.len(), 4);
    }
}
