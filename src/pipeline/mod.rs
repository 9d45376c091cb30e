//! Pipeline stages for rebuilding a voter list.
//!
//! Each submodule implements exactly one transformation step, so every
//! stage can be tested on its own and the decoding stages can run against
//! a fake converter.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ normalize ──▶ merge ──▶ decode / house_no ──▶ assemble
//! (path/URL) (rows)     (15 cells)    (voters)  (converter batches)   (export)
//! ```
//!
//! 1. [`input`]    : canonicalise the user-supplied path or URL to a local file
//! 2. [`extract`]  : read raw table rows from a PDF (pdfium) or a CSV file
//! 3. [`normalize`]: force 15 cells per row, clean cells, drop header rows
//! 4. [`merge`]    : fold wrapped continuation rows into the previous voter
//! 5. [`decode`]   : batch text values through the converter, order-preserving
//! 6. [`house_no`] : decode only the textual suffix of composite house numbers
//! 7. [`assemble`] : decode the text columns, relabel, purge, number

pub mod assemble;
pub mod decode;
pub mod extract;
pub mod house_no;
pub mod input;
pub mod merge;
pub mod normalize;

/// Whether `s` is non-empty and made only of ASCII digits.
pub(crate) fn is_all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}
