//! # voterlist
//!
//! Rebuild a clean voter dataset from electoral-roll PDFs whose text is
//! printed in a legacy font encoding.
//!
//! ## Why this crate?
//!
//! The rolls are a fixed 15-column table, but a table extractor sees them
//! as a mess: long names wrap onto extra physical lines that come out as
//! rows of their own, the header repeats on every page, and every name is
//! in an ASCII transliteration that only an external converter page can
//! turn back into Malayalam. This crate stitches the wrapped rows back into
//! one record per voter, pushes the text columns through the converter in
//! large batches, and keeps every value in its row even when a batch fails.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF / CSV
//!  │
//!  ├─ 1. Input      resolve local file or download from URL
//!  ├─ 2. Extract    pdfium text runs → table rows (spawn_blocking)
//!  ├─ 3. Normalize  exactly 15 clean cells, header rows dropped
//!  ├─ 4. Merge      continuation rows folded into the previous voter
//!  ├─ 5. Decode     column-wise batches through the converter, with fallback
//!  ├─ 6. House no.  decode only the suffix of values like `81U`
//!  └─ 7. Assemble   relabel, purge stray headers, number 1..n
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use voterlist::{convert, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::builder().batch_size(100).build()?;
//!     let output = convert("S11A90P143.pdf", &config).await?;
//!     for voter in &output.records {
//!         println!("{} {}", voter.sl_no, voter.first_name);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Bringing your own converter
//!
//! Anything that can turn a batch of encoded lines into decoded lines can
//! drive the pipeline: implement [`TransliterationOracle`] directly, or
//! implement [`ConversionSurface`] for an interactive page and wrap it in a
//! [`SurfaceOracle`]. Pass it to [`convert_with_oracle`].
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `voterlist` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! voterlist = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod oracle;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod record;
pub mod report;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{HeaderPolicy, NewRecordPolicy, PageSelection, PipelineConfig, PipelineConfigBuilder};
pub use convert::{
    convert, convert_rows, convert_sync, convert_to_file, convert_with_oracle, load_rows, preview,
    write_report,
};
pub use error::{OracleError, VoterListError};
pub use oracle::{ConversionSurface, HttpFormSurface, SurfaceOracle, TransliterationOracle};
pub use output::{BatchReport, BatchStatus, RunOutput, RunStats};
pub use progress::{DecodeProgressCallback, NoopProgressCallback, ProgressCallback};
pub use record::{ExportRecord, Field, LogicalRecord, RawRow, VoterRow};
pub use report::ReportFormat;
