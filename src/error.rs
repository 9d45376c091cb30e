//! Error types for the voterlist library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`VoterListError`]: **Fatal**: the run cannot produce a dataset at all
//!   (bad input file, wrong password, nothing extracted). Returned as
//!   `Err(VoterListError)` from the top-level `convert*` functions.
//!
//! * [`OracleError`]: **Non-fatal**: a single batch exchange with the
//!   conversion service failed. The batch falls back to its original values
//!   and the failure is recorded in a [`crate::output::BatchReport`]; it is
//!   never propagated.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the voterlist library.
#[derive(Debug, Error)]
pub enum VoterListError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// Selected page numbers exceed the actual page count.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// pdfium failed while reading the text layer of a page.
    #[error("Table extraction failed on page {page}: {detail}")]
    ExtractionFailed { page: usize, detail: String },

    /// The extractor produced no rows, or every row was a header.
    #[error("No data: {detail}")]
    ExtractionEmpty { detail: String },

    /// A pre-extracted CSV table could not be read.
    #[error("Failed to read table CSV: {0}")]
    CsvFailed(#[from] csv::Error),

    // ── Oracle errors ─────────────────────────────────────────────────────
    /// The conversion session could not be created at all.
    ///
    /// Individual batch failures are never reported here; see [`OracleError`].
    #[error("Could not open converter session at '{url}': {detail}")]
    OracleSetupFailed { url: String, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the report file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide.\n\
Tables extracted elsewhere can be passed as CSV instead."
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single batch exchange.
///
/// Produced by [`crate::oracle::TransliterationOracle::decode`] and absorbed
/// by the batch decoder, which substitutes the batch's original values.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum OracleError {
    /// The converter could not be reached (connection refused, DNS, TLS).
    #[error("converter unreachable: {detail}")]
    Unreachable { detail: String },

    /// The converter answered with a non-success HTTP status.
    #[error("converter returned HTTP {status}")]
    HttpStatus { status: u16 },

    /// The response did not contain a readable output block.
    #[error("malformed converter response: {detail}")]
    MalformedResponse { detail: String },

    /// The interactive surface is missing an element the exchange needs
    /// (no input box, nothing to trigger, nothing to read).
    #[error("conversion surface missing {element}")]
    SurfaceMissing { element: String },

    /// The exchange did not complete in time.
    #[error("converter timed out after {secs}s")]
    Timeout { secs: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_empty_display() {
        let e = VoterListError::ExtractionEmpty {
            detail: "0 rows on 3 pages".into(),
        };
        let msg = e.to_string();
        assert!(msg.starts_with("No data"), "got: {msg}");
        assert!(msg.contains("3 pages"));
    }

    #[test]
    fn oracle_setup_display() {
        let e = VoterListError::OracleSetupFailed {
            url: "https://converter.test/".into(),
            detail: "tls init".into(),
        };
        assert!(e.to_string().contains("converter.test"));
        assert!(e.to_string().contains("tls init"));
    }

    #[test]
    fn oracle_error_http_display() {
        let e = OracleError::HttpStatus { status: 503 };
        assert_eq!(e.to_string(), "converter returned HTTP 503");
    }

    #[test]
    fn oracle_error_round_trips_through_json() {
        let e = OracleError::SurfaceMissing {
            element: "output textarea".into(),
        };
        let json = serde_json::to_string(&e).unwrap();
        let back: OracleError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
    }
}
