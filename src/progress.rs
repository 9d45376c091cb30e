//! Progress-callback trait for decode events.
//!
//! Inject an [`Arc<dyn DecodeProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to observe a
//! run as it walks the decoded columns batch by batch. Exchanges with the
//! converter take most of a run's wall-clock time, so this is where a
//! progress bar belongs.
//!
//! # Example
//!
//! ```rust
//! use voterlist::{BatchReport, DecodeProgressCallback, PipelineConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct FallbackCounter {
//!     fallbacks: AtomicUsize,
//! }
//!
//! impl DecodeProgressCallback for FallbackCounter {
//!     fn on_batch_complete(&self, report: &BatchReport) {
//!         if report.status.is_fallback() {
//!             self.fallbacks.fetch_add(1, Ordering::SeqCst);
//!         }
//!     }
//! }
//!
//! let counter = Arc::new(FallbackCounter { fallbacks: AtomicUsize::new(0) });
//! let config = PipelineConfig::builder()
//!     .progress_callback(counter as Arc<dyn DecodeProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::BatchReport;
use std::sync::Arc;

/// Called by the pipeline as it decodes records.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Events arrive in order from a single task.
pub trait DecodeProgressCallback: Send + Sync {
    /// Called once after merging, before the first exchange.
    ///
    /// # Arguments
    /// * `records`: logical records that will be decoded
    /// * `batches`: total batch exchanges planned across all columns
    ///   (house-number suffixes included)
    fn on_run_start(&self, records: usize, batches: usize) {
        let _ = (records, batches);
    }

    /// Called before the first batch of a column is sent.
    ///
    /// # Arguments
    /// * `field`   : column label
    /// * `selected`: values that will be sent (non-empty, non-numeric)
    /// * `batches` : batches needed for those values
    fn on_field_start(&self, field: &str, selected: usize, batches: usize) {
        let _ = (field, selected, batches);
    }

    /// Called after every batch exchange, successful or not.
    fn on_batch_complete(&self, report: &BatchReport) {
        let _ = report;
    }

    /// Called once after assembly.
    ///
    /// # Arguments
    /// * `records`  : exported records
    /// * `fallbacks`: batches that kept their original values
    fn on_run_complete(&self, records: usize, fallbacks: usize) {
        let _ = (records, fallbacks);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl DecodeProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn DecodeProgressCallback>;
