//! Record assembly: decode the text columns and relabel into the export schema.
//!
//! Columns are decoded whole: one decode call per column across every
//! record, so batches fill up instead of carrying one voter's fields each.

use crate::pipeline::decode::{batch_count, BatchDecoder};
use crate::pipeline::house_no::{self, split_house_number};
use crate::record::{ExportRecord, Field, LogicalRecord};
use tracing::{debug, info};

/// Exchanges needed to decode `records` at `batch_size`, house-number
/// suffixes included.
pub fn plan_batches(records: &[LogicalRecord], batch_size: usize) -> usize {
    let columns: usize = Field::DECODED
        .iter()
        .map(|&field| {
            let column: Vec<&str> = records.iter().map(|r| r.get(field)).collect();
            batch_count(&column, batch_size)
        })
        .sum();

    let suffixes: Vec<&str> = records
        .iter()
        .filter_map(|r| split_house_number(&r.house_no).map(|(_, suffix)| suffix))
        .collect();

    columns + batch_count(&suffixes, batch_size)
}

/// Decode every text column plus the house numbers, in place.
pub async fn decode_records(records: &mut [LogicalRecord], decoder: &mut BatchDecoder<'_>) {
    for field in Field::DECODED {
        let column: Vec<String> = records.iter().map(|r| r.get(field).to_string()).collect();
        let decoded = decoder.decode_column(field.label(), &column).await;
        for (record, value) in records.iter_mut().zip(decoded) {
            *record.get_mut(field) = value;
        }
    }

    let house_numbers: Vec<String> = records.iter().map(|r| r.house_no.clone()).collect();
    let decoded = house_no::decode_house_numbers(decoder, &house_numbers).await;
    for (record, value) in records.iter_mut().zip(decoded) {
        record.house_no = value;
    }
}

/// Relabel records into the export schema.
///
/// Records whose ID card equals `placeholder` are header rows that slipped
/// through and are dropped. `SL NO` is the 1-based position after that
/// filter.
pub fn finalize(records: Vec<LogicalRecord>, placeholder: &str) -> Vec<ExportRecord> {
    let before = records.len();
    let exported: Vec<ExportRecord> = records
        .into_iter()
        .filter(|r| r.id_card != placeholder)
        .enumerate()
        .map(|(i, r)| ExportRecord {
            ac_code: r.ac,
            part_code: r.part,
            sl_no: i + 1,
            house_no: r.house_no,
            secn_code: r.secn,
            first_name: r.name,
            last_name: r.last,
            relation_type: r.rel_type,
            relation_first_name: r.rel_name,
            relation_last_name: r.rel_last,
            id_card_no: r.id_card,
            part_link_no: r.link,
            sex: r.sex,
            age: r.age,
            house_name: r.house_name,
        })
        .collect();

    if exported.len() < before {
        debug!(
            "Dropped {} records carrying the '{}' placeholder",
            before - exported.len(),
            placeholder
        );
    }
    exported
}

/// Decode and relabel `records`.
pub async fn assemble_records(
    mut records: Vec<LogicalRecord>,
    decoder: &mut BatchDecoder<'_>,
    placeholder: &str,
) -> Vec<ExportRecord> {
    decode_records(&mut records, decoder).await;
    let exported = finalize(records, placeholder);
    info!("Assembled {} export records", exported.len());
    exported
}
