//! The external text converter, seen as a narrow batch capability.
//!
//! The batch decoder only needs `decode(batch) -> batch`. How that call is
//! carried out (driving an interactive page, posting a form, calling a
//! library) is an adapter concern:
//!
//! ```text
//! BatchDecoder ──▶ dyn TransliterationOracle
//!                       ▲
//!                  SurfaceOracle<S>  (join, set input, trigger, settle, read, split)
//!                       ▲
//!                  S: ConversionSurface  (HttpFormSurface, test doubles)
//! ```
//!
//! The converter is stateful: it has one input box and one output box. All
//! methods take `&mut self`, so a session can never have two batches in
//! flight.

pub mod http;
pub mod surface;

use crate::error::OracleError;
use async_trait::async_trait;

pub use http::HttpFormSurface;
pub use surface::{split_output_block, ConversionSurface, SurfaceOracle};

/// A session with the external converter.
///
/// `open` is called once before the first batch and `close` once after the
/// last, whatever happened in between.
#[async_trait]
pub trait TransliterationOracle: Send {
    /// Prepare the session. A failure here is logged; batches still run and
    /// fall back individually.
    async fn open(&mut self) -> Result<(), OracleError> {
        Ok(())
    }

    /// Convert one batch. The returned vector may be shorter or longer than
    /// `batch`; the caller reconciles lengths.
    async fn decode(&mut self, batch: &[String]) -> Result<Vec<String>, OracleError>;

    /// Release the session.
    async fn close(&mut self) {}
}
